//! GPU backends
//!
//! The scheduler never touches a graphics API directly; it drives a
//! [`RenderBackend`]. Two implementations ship with the crate:
//!
//! - [`HeadlessBackend`]: records every call, used for tests and tooling.
//! - [`WgpuBackend`]: maps the contract onto wgpu render passes, pipelines
//!   and dynamic-offset uniform buffers.

mod headless;
mod wgpu_backend;

pub use headless::{BackendEvent, HeadlessBackend};
pub use wgpu_backend::{GpuGeometry, WgpuBackend};

use crate::errors::GpuError;
use crate::renderer::command::{GeometryId, ShaderId, TextureId};
use crate::renderer::pass::PassState;
use crate::renderer::uniforms::{UniformSlot, UniformValue};

/// Everything the frame pipeline needs from a GPU.
///
/// Calls arrive in this order per frame:
/// `begin_frame`, then per pass `begin_pass`, `bind_shader` and any number of
/// `set_uniform` / `bind_geometry` / `bind_texture` / `draw`, then `end_pass`;
/// finally `end_frame`, or `abort_frame` after a failure.
pub trait RenderBackend {
    fn begin_frame(&mut self) -> Result<(), GpuError>;

    fn begin_pass(&mut self, state: &PassState) -> Result<(), GpuError>;

    /// Restores whatever the matching `begin_pass` changed.
    fn end_pass(&mut self) -> Result<(), GpuError>;

    fn bind_shader(&mut self, shader: ShaderId) -> Result<(), GpuError>;

    fn set_uniform(&mut self, slot: UniformSlot, value: &UniformValue) -> Result<(), GpuError>;

    fn bind_geometry(&mut self, geometry: GeometryId) -> Result<(), GpuError>;

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), GpuError>;

    fn draw(&mut self, geometry: GeometryId) -> Result<(), GpuError>;

    fn end_frame(&mut self) -> Result<(), GpuError>;

    /// Drops any partially recorded work.
    fn abort_frame(&mut self) {}
}
