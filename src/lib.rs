#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Umbra: the per-frame runtime core of a small real-time 3D renderer.
//!
//! Each frame flows through three subsystems:
//!
//! 1. [`animation`]: turns playback time into per-joint skinning matrices.
//! 2. [`renderer::shadow`]: fits a light-space orthographic volume around
//!    the camera frustum.
//! 3. [`renderer::scheduler`]: batches, sorts and dispatches draw commands
//!    while eliding redundant GPU state changes.
//!
//! [`scene`] is the glue that walks objects and feeds the scheduler.

pub mod animation;
pub mod errors;
pub mod renderer;
pub mod scene;

pub use animation::{AnimationClip, AnimationInstance, Joint, JointPose, Keyframe, Skeleton, SkeletonPose};
pub use errors::{GpuError, Result, UmbraError};
pub use renderer::{
    DrawCommand, FrameStats, GeometryId, HeadlessBackend, PassId, RenderBackend, RenderScheduler,
    RendererSettings, ShaderId, ShadowFrustumFitter, TextureId, UniformSlot, UniformValue,
};
pub use scene::{Camera, Light, Material, ObjectKey, Scene, Transform};
