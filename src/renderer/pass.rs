//! Render passes
//!
//! Passes are fixed and ordered by id. Entering a pass sets up its target,
//! viewport, clear and blend state on the backend; exiting it restores what
//! the pass changed.

use crate::errors::GpuError;
use crate::renderer::backend::RenderBackend;
use crate::renderer::command::ShaderId;
use crate::renderer::settings::RendererSettings;

/// Ordering key of a pass. Lower ids are presented first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassId(pub u8);

impl PassId {
    pub const SHADOW: Self = Self(0);
    pub const LIT_OPAQUE: Self = Self(1);
    pub const TEXT: Self = Self(2);
    pub const QUAD: Self = Self(3);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Main colour + depth target of the frame.
    Screen,
    /// Depth-only shadow map.
    ShadowMap,
}

/// `src_alpha, one_minus_src_alpha` is the only blend mode overlays use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Alpha,
}

/// What a backend has to establish when a pass is entered.
#[derive(Debug, Clone, PartialEq)]
pub struct PassState {
    pub label: &'static str,
    pub target: RenderTarget,
    /// Viewport override; the previous viewport is restored on exit.
    pub viewport: Option<(u32, u32)>,
    pub clear_color: Option<wgpu::Color>,
    pub clear_depth: Option<f32>,
    pub blend: Option<BlendMode>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPassKind {
    Shadow { map_size: u32 },
    LitOpaque { clear_color: wgpu::Color },
    TextOverlay,
    QuadOverlay,
}

#[derive(Debug, Clone)]
pub struct RenderPass {
    id: PassId,
    kind: RenderPassKind,
    shader: ShaderId,
}

impl RenderPass {
    #[must_use]
    pub fn new(id: PassId, kind: RenderPassKind, shader: ShaderId) -> Self {
        Self { id, kind, shader }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> PassId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> RenderPassKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.kind {
            RenderPassKind::Shadow { .. } => "Shadow Pass",
            RenderPassKind::LitOpaque { .. } => "Lit Opaque Pass",
            RenderPassKind::TextOverlay => "Text Pass",
            RenderPassKind::QuadOverlay => "Quad Pass",
        }
    }

    #[must_use]
    pub fn state(&self) -> PassState {
        let label = self.name();
        match self.kind {
            RenderPassKind::Shadow { map_size } => PassState {
                label,
                target: RenderTarget::ShadowMap,
                viewport: Some((map_size, map_size)),
                clear_color: None,
                clear_depth: Some(1.0),
                blend: None,
            },
            RenderPassKind::LitOpaque { clear_color } => PassState {
                label,
                target: RenderTarget::Screen,
                viewport: None,
                clear_color: Some(clear_color),
                clear_depth: Some(1.0),
                blend: None,
            },
            RenderPassKind::TextOverlay | RenderPassKind::QuadOverlay => PassState {
                label,
                target: RenderTarget::Screen,
                viewport: None,
                clear_color: None,
                clear_depth: None,
                blend: Some(BlendMode::Alpha),
            },
        }
    }

    pub fn enter(&self, backend: &mut dyn RenderBackend) -> Result<(), GpuError> {
        log::debug!("Entering {}", self.name());
        backend.begin_pass(&self.state())
    }

    pub fn exit(&self, backend: &mut dyn RenderBackend) -> Result<(), GpuError> {
        log::debug!("Leaving {}", self.name());
        backend.end_pass()
    }
}

/// The fixed set of passes, indexed by [`PassId`].
#[derive(Debug, Clone)]
pub struct PassRegistry {
    passes: Vec<RenderPass>,
}

impl PassRegistry {
    #[must_use]
    pub fn new(settings: &RendererSettings) -> Self {
        let passes = vec![
            RenderPass::new(
                PassId::SHADOW,
                RenderPassKind::Shadow { map_size: settings.shadow_map_size },
                ShaderId(0),
            ),
            RenderPass::new(
                PassId::LIT_OPAQUE,
                RenderPassKind::LitOpaque { clear_color: settings.clear_color },
                ShaderId(1),
            ),
            RenderPass::new(PassId::TEXT, RenderPassKind::TextOverlay, ShaderId(2)),
            RenderPass::new(PassId::QUAD, RenderPassKind::QuadOverlay, ShaderId(3)),
        ];
        Self { passes }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: PassId) -> Option<&RenderPass> {
        self.passes.get(id.0 as usize)
    }

    /// Swaps the shader a pass binds on entry. Returns `false` for unknown ids.
    pub fn set_shader(&mut self, id: PassId, shader: ShaderId) -> bool {
        match self.passes.get_mut(id.0 as usize) {
            Some(pass) => {
                pass.shader = shader;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderPass> {
        self.passes.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}
