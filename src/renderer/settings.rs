//! Renderer Settings
//!
//! Configuration consumed once when the scheduler, pass registry, shadow
//! fitter and GPU backend are created.
//!
//! ```rust,ignore
//! use umbra::renderer::{RendererSettings, RenderScheduler, ShadowFrustumFitter};
//!
//! let settings = RendererSettings {
//!     queue_capacity: 4096,
//!     shadow_map_size: 2048,
//!     ..Default::default()
//! };
//!
//! let mut scheduler = RenderScheduler::new(&settings);
//! let fitter = ShadowFrustumFitter::new(&settings);
//! ```

use glam::Vec3;

// ---------------------------------------------------------------------------
// NdcDepthRange
// ---------------------------------------------------------------------------

/// Depth convention of the camera projection.
///
/// The shadow fitter unprojects the corners of the canonical clip volume;
/// the depth coordinate of those corners has to match the projection that
/// produced the camera matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NdcDepthRange {
    /// `z ∈ [0, 1]`: wgpu, and glam's `*_rh` / `*_lh` projections.
    #[default]
    ZeroToOne,
    /// `z ∈ [-1, 1]`: OpenGL style projections (`*_rh_gl`).
    NegOneToOne,
}

impl NdcDepthRange {
    /// NDC depth of the near and far planes.
    #[inline]
    #[must_use]
    pub fn near_far(self) -> (f32, f32) {
        match self {
            Self::ZeroToOne => (0.0, 1.0),
            Self::NegOneToOne => (-1.0, 1.0),
        }
    }
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global configuration for the frame pipeline.
///
/// | Field             | Description                                         | Default        |
/// |-------------------|-----------------------------------------------------|----------------|
/// | `queue_capacity`  | Fixed number of draw commands per frame             | 1000           |
/// | `shadow_map_size` | Edge length of the square shadow depth target       | 1024           |
/// | `depth_range`     | NDC depth convention of camera projections          | `ZeroToOne`    |
/// | `world_up`        | Up vector for the light-space basis                 | +Y             |
/// | `fallback_up`     | Substitute up when the light is parallel to `world_up` | +X          |
/// | `basis_epsilon`   | Length below which the basis cross product is degenerate | 1e-4      |
/// | `clear_color`     | Colour cleared by the lit-opaque pass               | Black          |
/// | `depth_format`    | Format of the main and shadow depth targets         | `Depth32Float` |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    // === Scheduling ===
    /// Capacity of the render queue. Submitting past it fails with
    /// [`QueueFull`](crate::errors::UmbraError::QueueFull); the queue never grows.
    pub queue_capacity: usize,

    // === Shadows ===
    pub shadow_map_size: u32,
    pub depth_range: NdcDepthRange,
    pub world_up: Vec3,
    pub fallback_up: Vec3,
    pub basis_epsilon: f32,

    // === GPU Defaults ===
    pub clear_color: wgpu::Color,
    pub depth_format: wgpu::TextureFormat,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            shadow_map_size: 1024,
            depth_range: NdcDepthRange::default(),
            world_up: Vec3::Y,
            fallback_up: Vec3::X,
            basis_epsilon: 1e-4,
            clear_color: wgpu::Color::BLACK,
            depth_format: wgpu::TextureFormat::Depth32Float,
        }
    }
}
