//! Error Types
//!
//! This module defines the error types used throughout the engine core.
//!
//! # Overview
//!
//! The main error type [`UmbraError`] covers every failure mode of the frame
//! pipeline:
//! - Render queue backpressure ([`UmbraError::QueueFull`])
//! - GPU failures reported by a [`RenderBackend`](crate::renderer::RenderBackend)
//! - Shadow fitting on a degenerate light or camera
//! - Malformed skeleton / animation data handed over by the loader
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, UmbraError>`.
//!
//! ```rust,ignore
//! use umbra::errors::{UmbraError, Result};
//!
//! fn frame(scheduler: &mut RenderScheduler, backend: &mut HeadlessBackend) -> Result<()> {
//!     scheduler.present(backend)?;
//!     Ok(())
//! }
//! ```

use glam::Vec3;
use thiserror::Error;

use crate::renderer::pass::PassId;

/// Failure reported by a GPU backend.
///
/// Backends never retry; the scheduler aborts the frame on the first
/// `GpuError` it sees.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GpuError {
    /// Uploading a uniform value failed.
    #[error("uniform upload failed for slot {slot}: {reason}")]
    UniformUpload {
        /// Raw uniform slot index
        slot: u16,
        /// Backend-provided description
        reason: String,
    },

    /// Binding vertex/index state failed.
    #[error("geometry bind failed for geometry {geometry}: {reason}")]
    GeometryBind {
        /// Raw geometry id
        geometry: u32,
        /// Backend-provided description
        reason: String,
    },

    /// The draw call itself failed.
    #[error("draw call failed: {0}")]
    Draw(String),

    /// Entering or leaving a pass failed (framebuffer bind, viewport, blend state).
    #[error("pass transition failed: {0}")]
    PassTransition(String),

    /// Binding a shader / pipeline failed.
    #[error("shader bind failed: {0}")]
    ShaderBind(String),

    /// Binding a texture failed.
    #[error("texture bind failed: {0}")]
    TextureBind(String),

    /// Frame submission failed.
    #[error("frame submission failed: {0}")]
    Submit(String),

    /// A resource id does not refer to anything the backend knows about.
    #[error("unknown {kind} resource: {id}")]
    UnknownResource {
        /// Resource category ("geometry", "shader", ...)
        kind: &'static str,
        /// Raw id
        id: u32,
    },
}

/// The main error type for the engine core.
#[derive(Error, Debug)]
pub enum UmbraError {
    // ========================================================================
    // Render Scheduling Errors
    // ========================================================================
    /// The fixed-capacity render queue cannot take another command.
    #[error("render queue full (capacity {capacity})")]
    QueueFull {
        /// Capacity of the queue that rejected the command
        capacity: usize,
    },

    /// A command referenced a pass the registry does not contain.
    #[error("unknown render pass: {0:?}")]
    UnknownPass(PassId),

    // ========================================================================
    // GPU Errors
    // ========================================================================
    /// GPU failure surfaced while presenting a frame.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    // ========================================================================
    // Shadow Fitting Errors
    // ========================================================================
    /// The light direction cannot span a light-space basis.
    #[error("degenerate light basis for direction {direction:?}")]
    DegenerateLightBasis {
        /// The offending light direction
        direction: Vec3,
    },

    /// The camera's view-projection matrix is not invertible.
    #[error("camera view-projection matrix is singular")]
    SingularCameraMatrix,

    // ========================================================================
    // Animation Data Errors
    // ========================================================================
    /// Skeleton hierarchy is malformed.
    #[error("invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// Animation clip data is malformed.
    #[error("invalid animation clip: {0}")]
    InvalidClip(String),

    /// A clip's poses do not match the skeleton it is played on.
    #[error("clip poses have {clip_joints} joints but skeleton has {skeleton_joints}")]
    SkeletonMismatch {
        /// Joints per pose in the clip
        clip_joints: usize,
        /// Joints in the skeleton
        skeleton_joints: usize,
    },

    // ========================================================================
    // Scene Errors
    // ========================================================================
    /// The object key does not refer to a live scene object.
    #[error("scene object not found")]
    ObjectNotFound,
}

/// Alias for `Result<T, UmbraError>`.
pub type Result<T> = std::result::Result<T, UmbraError>;
