//! Frame rendering: shadow fitting, draw scheduling and GPU backends.

pub mod backend;
pub mod command;
pub mod pass;
pub mod queue;
pub mod scheduler;
pub mod settings;
pub mod shadow;
pub mod uniforms;

pub use backend::{BackendEvent, GpuGeometry, HeadlessBackend, RenderBackend, WgpuBackend};
pub use command::{DrawCommand, DrawHook, GeometryId, HookData, ShaderId, TextureId};
pub use pass::{BlendMode, PassId, PassRegistry, PassState, RenderPass, RenderPassKind, RenderTarget};
pub use queue::RenderQueue;
pub use scheduler::{FrameStats, RenderScheduler};
pub use settings::{NdcDepthRange, RendererSettings};
pub use shadow::{LightSpaceBounds, ShadowFrustumFitter};
pub use uniforms::{UniformBinding, UniformCache, UniformSlot, UniformValue};
