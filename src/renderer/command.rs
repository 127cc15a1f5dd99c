//! Draw commands
//!
//! A [`DrawCommand`] is everything the scheduler needs to issue one draw:
//! target pass, geometry, uniform bindings and optional hooks that run
//! around the draw call with the command's userdata.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::errors::GpuError;
use crate::renderer::backend::RenderBackend;
use crate::renderer::pass::PassId;
use crate::renderer::uniforms::{UniformBinding, UniformSlot, UniformValue};

/// Vertex/index state registered with a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryId(pub u32);

impl GeometryId {
    /// Shared unit quad used by every quad overlay.
    pub const UNIT_QUAD: Self = Self(u32::MAX);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaderId(pub u32);

/// Opaque per-command data handed to the hooks.
pub type HookData = Arc<dyn Any + Send + Sync>;

/// Runs immediately before or after the draw call of its command.
pub type DrawHook = fn(&mut dyn RenderBackend, Option<&HookData>) -> Result<(), GpuError>;

/// Most commands fit inline; lit meshes with light and skinning spill.
pub type UniformList = SmallVec<[UniformBinding; 16]>;

#[derive(Clone)]
pub struct DrawCommand {
    pub pass: PassId,
    pub geometry: GeometryId,
    pub uniforms: UniformList,
    pub pre_draw: Option<DrawHook>,
    pub post_draw: Option<DrawHook>,
    pub userdata: Option<HookData>,
}

impl DrawCommand {
    #[must_use]
    pub fn new(pass: PassId, geometry: GeometryId) -> Self {
        Self {
            pass,
            geometry,
            uniforms: SmallVec::new(),
            pre_draw: None,
            post_draw: None,
            userdata: None,
        }
    }

    #[must_use]
    pub fn with_uniform(mut self, slot: UniformSlot, value: UniformValue) -> Self {
        self.push_uniform(slot, value);
        self
    }

    pub fn push_uniform(&mut self, slot: UniformSlot, value: UniformValue) {
        self.uniforms.push(UniformBinding::new(slot, value));
    }

    #[must_use]
    pub fn with_pre_draw(mut self, hook: DrawHook) -> Self {
        self.pre_draw = Some(hook);
        self
    }

    #[must_use]
    pub fn with_post_draw(mut self, hook: DrawHook) -> Self {
        self.post_draw = Some(hook);
        self
    }

    #[must_use]
    pub fn with_userdata(mut self, data: HookData) -> Self {
        self.userdata = Some(data);
        self
    }

    /// Key the queue sorts by.
    #[inline]
    #[must_use]
    pub fn sort_key(&self) -> (PassId, GeometryId) {
        (self.pass, self.geometry)
    }
}

impl fmt::Debug for DrawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawCommand")
            .field("pass", &self.pass)
            .field("geometry", &self.geometry)
            .field("uniforms", &self.uniforms.len())
            .field("pre_draw", &self.pre_draw.is_some())
            .field("post_draw", &self.post_draw.is_some())
            .field("userdata", &self.userdata.is_some())
            .finish()
    }
}
