//! Animation playback.
//!
//! [`AnimationInstance::advance`] turns a playback time into skinning
//! matrices:
//!
//! 1. `ticks = elapsed * speed`, wrapped into `[0, duration)`.
//! 2. Bracketing keyframes and a clamped blend factor are found.
//! 3. Each joint's local transform is blended (lerp / slerp / lerp).
//! 4. World transforms are composed parent-first with a per-frame
//!    `computed` flag, so every joint is evaluated exactly once no matter how
//!    many descendants reference it.
//! 5. Skin matrix = `world · inverse_bind_pose`.

use std::sync::Arc;

use glam::Mat4;

use crate::animation::clip::{AnimationClip, SkeletonPose};
use crate::animation::skeleton::Skeleton;
use crate::errors::{Result, UmbraError};

#[derive(Debug, Clone)]
pub struct AnimationInstance {
    clip: Arc<AnimationClip>,
    skeleton: Arc<Skeleton>,

    elapsed: f32,
    local_time: f32,
    pose_time: f32,
    keys: (usize, usize),

    world: Vec<Mat4>,
    computed: Vec<bool>,
    worklist: Vec<usize>,
    local_evaluations: usize,

    // Rebuilt every advance; draw commands hold clones for the frame.
    skin: Arc<[Mat4]>,
}

impl AnimationInstance {
    pub fn new(clip: Arc<AnimationClip>, skeleton: Arc<Skeleton>) -> Result<Self> {
        let joint_count = skeleton.joint_count();
        if clip.joint_count() != joint_count {
            return Err(UmbraError::SkeletonMismatch {
                clip_joints: clip.joint_count(),
                skeleton_joints: joint_count,
            });
        }

        Ok(Self {
            clip,
            skeleton,
            elapsed: 0.0,
            local_time: 0.0,
            pose_time: 0.0,
            keys: (0, 1),
            world: vec![Mat4::IDENTITY; joint_count],
            computed: vec![false; joint_count],
            worklist: Vec::with_capacity(joint_count),
            local_evaluations: 0,
            skin: vec![Mat4::IDENTITY; joint_count].into(),
        })
    }

    /// Advances playback by `dt` seconds and recomputes every joint.
    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() {
            self.elapsed += dt;
        } else {
            log::warn!("AnimationInstance '{}': ignoring non-finite dt {dt}", self.clip.name);
        }

        let ticks = self.elapsed * self.clip.speed();
        self.local_time = ticks.rem_euclid(self.clip.duration());

        let (key0, key1) = self.clip.bracketing_keyframes(self.local_time);
        let keyframes = self.clip.keyframes();
        let t0 = keyframes[key0].timestamp;
        let t1 = keyframes[key1].timestamp;
        self.keys = (key0, key1);
        self.pose_time = ((self.local_time - t0) / (t1 - t0)).clamp(0.0, 1.0);

        self.computed.fill(false);
        self.local_evaluations = 0;

        let clip = Arc::clone(&self.clip);
        let p0 = &clip.keyframes()[key0].pose;
        let p1 = &clip.keyframes()[key1].pose;
        for joint in 0..self.world.len() {
            if !self.computed[joint] {
                self.resolve(joint, p0, p1);
            }
        }

        self.skin = self
            .world
            .iter()
            .zip(self.skeleton.joints())
            .map(|(world, joint)| *world * joint.inverse_bind_pose)
            .collect();
    }

    // Walks up to the nearest computed ancestor (or a root), then composes
    // back down. Parent links are acyclic, checked when the skeleton was built.
    fn resolve(&mut self, joint: usize, p0: &SkeletonPose, p1: &SkeletonPose) {
        self.worklist.clear();
        let mut cursor = Some(joint);
        while let Some(index) = cursor {
            if self.computed[index] {
                break;
            }
            self.worklist.push(index);
            cursor = self.skeleton.parent(index);
        }

        while let Some(index) = self.worklist.pop() {
            let local = p0.joints[index]
                .interpolate(&p1.joints[index], self.pose_time)
                .local_matrix();
            self.local_evaluations += 1;

            self.world[index] = match self.skeleton.parent(index) {
                Some(parent) => self.world[parent] * local,
                None => local,
            };
            self.computed[index] = true;
        }
    }

    /// Rewinds to the start of the clip without recomputing joints.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.local_time = 0.0;
        self.pose_time = 0.0;
        self.keys = (0, 1);
    }

    #[inline]
    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Accumulated playback time in seconds.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Wrapped clip time in ticks from the last advance.
    #[inline]
    #[must_use]
    pub fn local_time(&self) -> f32 {
        self.local_time
    }

    /// Blend factor between the bracketing keyframes, in `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn pose_time(&self) -> f32 {
        self.pose_time
    }

    #[inline]
    #[must_use]
    pub fn keyframe_indices(&self) -> (usize, usize) {
        self.keys
    }

    #[inline]
    #[must_use]
    pub fn world_transforms(&self) -> &[Mat4] {
        &self.world
    }

    #[inline]
    #[must_use]
    pub fn joint_world(&self, joint: usize) -> Option<Mat4> {
        self.world.get(joint).copied()
    }

    #[inline]
    #[must_use]
    pub fn computed(&self) -> &[bool] {
        &self.computed
    }

    /// Number of local transforms blended during the last advance.
    #[inline]
    #[must_use]
    pub fn local_evaluations(&self) -> usize {
        self.local_evaluations
    }

    /// Skinning palette in the column-major layout WGSL expects; glam's
    /// storage order already matches, so no transpose is applied.
    #[inline]
    #[must_use]
    pub fn skin_matrices(&self) -> &Arc<[Mat4]> {
        &self.skin
    }

    #[inline]
    #[must_use]
    pub fn skin_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.skin[..])
    }
}
