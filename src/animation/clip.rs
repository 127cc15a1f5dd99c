use std::cmp::Ordering;

use glam::{Mat4, Quat, Vec3};

use crate::animation::values::Interpolatable;
use crate::errors::{Result, UmbraError};

/// Ticks per second used when a clip does not declare a speed.
pub const DEFAULT_TICKS_PER_SECOND: f32 = 25.0;

/// Local transform of one joint at one keyframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl JointPose {
    /// Blends translation and scale linearly and rotation spherically.
    #[must_use]
    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            translation: Vec3::interpolate_linear(self.translation, other.translation, t),
            rotation: Quat::interpolate_linear(self.rotation, other.rotation, t),
            scale: Vec3::interpolate_linear(self.scale, other.scale, t),
        }
    }

    /// `Translate · Rotate · Scale`
    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// One transform per joint, indexed like the skeleton's joints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonPose {
    pub joints: Vec<JointPose>,
}

impl SkeletonPose {
    #[must_use]
    pub fn new(joints: Vec<JointPose>) -> Self {
        Self { joints }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    /// Time in ticks.
    pub timestamp: f32,
    pub pose: SkeletonPose,
}

impl Keyframe {
    #[must_use]
    pub fn new(timestamp: f32, pose: SkeletonPose) -> Self {
        Self { timestamp, pose }
    }
}

/// Keyframed skeleton animation.
///
/// Durations and timestamps are in ticks; `speed` converts real seconds into
/// ticks. Playback always loops.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    duration: f32,
    speed: f32,
    keyframes: Vec<Keyframe>,
}

impl AnimationClip {
    /// Validates and builds a clip.
    ///
    /// A `speed` of `None` or `0.0` falls back to
    /// [`DEFAULT_TICKS_PER_SECOND`].
    pub fn new(
        name: &str,
        duration: f32,
        speed: Option<f32>,
        keyframes: Vec<Keyframe>,
    ) -> Result<Self> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(UmbraError::InvalidClip(format!(
                "clip '{name}' has non-positive duration {duration}"
            )));
        }

        let speed = match speed.filter(|s| s.abs() > 0.0) {
            None => DEFAULT_TICKS_PER_SECOND,
            Some(s) if s.is_finite() && s > 0.0 => s,
            Some(s) => {
                return Err(UmbraError::InvalidClip(format!(
                    "clip '{name}' has invalid speed {s}"
                )));
            }
        };

        if keyframes.len() < 2 {
            return Err(UmbraError::InvalidClip(format!(
                "clip '{name}' needs at least two keyframes, got {}",
                keyframes.len()
            )));
        }

        if keyframes
            .windows(2)
            .any(|pair| pair[0].timestamp.partial_cmp(&pair[1].timestamp) != Some(Ordering::Less))
        {
            return Err(UmbraError::InvalidClip(format!(
                "clip '{name}' keyframe timestamps are not strictly ascending"
            )));
        }

        let joint_count = keyframes[0].pose.joints.len();
        if joint_count == 0 || keyframes.iter().any(|k| k.pose.joints.len() != joint_count) {
            return Err(UmbraError::InvalidClip(format!(
                "clip '{name}' poses do not share a non-zero joint count"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            duration,
            speed,
            keyframes,
        })
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Ticks per real second.
    #[inline]
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    #[must_use]
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.keyframes[0].pose.joints.len()
    }

    /// Returns `(key0, key1)` with `timestamps[key0] <= time < timestamps[key1]`.
    ///
    /// Times before the first keyframe resolve to the first pair, times at or
    /// past the last keyframe to the last pair; the caller clamps the blend
    /// factor.
    #[must_use]
    pub fn bracketing_keyframes(&self, time: f32) -> (usize, usize) {
        // first index whose timestamp is strictly greater than `time`
        let next = self.keyframes.partition_point(|k| k.timestamp <= time);
        let key0 = next.max(1).min(self.keyframes.len() - 1) - 1;
        (key0, key0 + 1)
    }
}
