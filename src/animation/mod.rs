//! Skeletal animation.
//!
//! Static data ([`Skeleton`], [`AnimationClip`]) is produced by the mesh
//! loader and shared read-only. Playback state lives in
//! [`AnimationInstance`], owned by whichever object plays the clip.

mod values;
pub mod clip;
pub mod instance;
pub mod skeleton;

pub use clip::{AnimationClip, DEFAULT_TICKS_PER_SECOND, JointPose, Keyframe, SkeletonPose};
pub use instance::AnimationInstance;
pub use skeleton::{Joint, MAX_JOINTS, ROOT_JOINT, Skeleton};
pub use values::Interpolatable;
