use rustc_hash::FxHashMap;

use crate::errors::GpuError;
use crate::renderer::backend::RenderBackend;
use crate::renderer::command::{GeometryId, ShaderId, TextureId};
use crate::renderer::pass::{BlendMode, PassState, RenderTarget};
use crate::renderer::uniforms::{UniformSlot, UniformValue};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    BeginFrame,
    BeginPass(&'static str),
    EndPass(&'static str),
    BindShader(ShaderId),
    SetUniform(UniformSlot),
    BindGeometry(GeometryId),
    BindTexture { unit: u32, texture: TextureId },
    Draw(GeometryId),
    EndFrame,
    AbortFrame,
}

/// A backend without a GPU.
///
/// Tracks the state a real backend would hold (target, viewport stack,
/// blending) and records every call so tests can assert on exact sequences.
/// Failures can be injected per call kind.
#[derive(Debug)]
pub struct HeadlessBackend {
    events: Vec<BackendEvent>,
    uniform_uploads: FxHashMap<UniformSlot, usize>,
    uniform_values: FxHashMap<UniformSlot, UniformValue>,
    draws: usize,
    frames: usize,

    default_viewport: (u32, u32),
    viewport: (u32, u32),
    viewport_stack: Vec<(u32, u32)>,
    target: RenderTarget,
    blend: Option<BlendMode>,
    active_pass: Option<&'static str>,
    in_frame: bool,

    fail_draw_at: Option<usize>,
    fail_uniform: Option<UniformSlot>,
    fail_geometry: Option<GeometryId>,
    fail_pass: Option<&'static str>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl HeadlessBackend {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            events: Vec::new(),
            uniform_uploads: FxHashMap::default(),
            uniform_values: FxHashMap::default(),
            draws: 0,
            frames: 0,
            default_viewport: (width, height),
            viewport: (width, height),
            viewport_stack: Vec::new(),
            target: RenderTarget::Screen,
            blend: None,
            active_pass: None,
            in_frame: false,
            fail_draw_at: None,
            fail_uniform: None,
            fail_geometry: None,
            fail_pass: None,
        }
    }

    // === Failure Injection ===

    /// Fails the `n`-th draw (zero based, counted across frames).
    pub fn fail_on_draw(&mut self, n: usize) {
        self.fail_draw_at = Some(n);
    }

    pub fn fail_on_uniform(&mut self, slot: UniformSlot) {
        self.fail_uniform = Some(slot);
    }

    pub fn fail_on_geometry(&mut self, geometry: GeometryId) {
        self.fail_geometry = Some(geometry);
    }

    pub fn fail_on_pass(&mut self, label: &'static str) {
        self.fail_pass = Some(label);
    }

    pub fn clear_failures(&mut self) {
        self.fail_draw_at = None;
        self.fail_uniform = None;
        self.fail_geometry = None;
        self.fail_pass = None;
    }

    // === Inspection ===

    #[must_use]
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    #[must_use]
    pub fn uniform_upload_count(&self, slot: UniformSlot) -> usize {
        self.uniform_uploads.get(&slot).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_uniform_uploads(&self) -> usize {
        self.uniform_uploads.values().sum()
    }

    /// Last value uploaded to `slot`.
    #[must_use]
    pub fn uniform_value(&self, slot: UniformSlot) -> Option<&UniformValue> {
        self.uniform_values.get(&slot)
    }

    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.draws
    }

    #[must_use]
    pub fn frames_completed(&self) -> usize {
        self.frames
    }

    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    #[must_use]
    pub fn target(&self) -> RenderTarget {
        self.target
    }

    #[must_use]
    pub fn blend(&self) -> Option<BlendMode> {
        self.blend
    }

    #[must_use]
    pub fn active_pass(&self) -> Option<&'static str> {
        self.active_pass
    }

    /// `true` between `begin_frame` and `end_frame` / `abort_frame`.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }
}

impl RenderBackend for HeadlessBackend {
    fn begin_frame(&mut self) -> Result<(), GpuError> {
        self.in_frame = true;
        self.events.push(BackendEvent::BeginFrame);
        Ok(())
    }

    fn begin_pass(&mut self, state: &PassState) -> Result<(), GpuError> {
        if self.fail_pass == Some(state.label) {
            return Err(GpuError::PassTransition(format!(
                "injected failure entering '{}'",
                state.label
            )));
        }
        if let Some(active) = self.active_pass {
            return Err(GpuError::PassTransition(format!(
                "'{}' entered while '{active}' is still active",
                state.label
            )));
        }

        self.viewport_stack.push(self.viewport);
        if let Some(viewport) = state.viewport {
            self.viewport = viewport;
        }
        self.target = state.target;
        self.blend = state.blend;
        self.active_pass = Some(state.label);
        self.events.push(BackendEvent::BeginPass(state.label));
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), GpuError> {
        let Some(label) = self.active_pass.take() else {
            return Err(GpuError::PassTransition("end_pass without an active pass".into()));
        };
        self.viewport = self.viewport_stack.pop().unwrap_or(self.default_viewport);
        self.target = RenderTarget::Screen;
        self.blend = None;
        self.events.push(BackendEvent::EndPass(label));
        Ok(())
    }

    fn bind_shader(&mut self, shader: ShaderId) -> Result<(), GpuError> {
        self.events.push(BackendEvent::BindShader(shader));
        Ok(())
    }

    fn set_uniform(&mut self, slot: UniformSlot, value: &UniformValue) -> Result<(), GpuError> {
        if self.fail_uniform == Some(slot) {
            return Err(GpuError::UniformUpload {
                slot: slot.0,
                reason: "injected failure".into(),
            });
        }
        *self.uniform_uploads.entry(slot).or_insert(0) += 1;
        self.uniform_values.insert(slot, value.clone());
        self.events.push(BackendEvent::SetUniform(slot));
        Ok(())
    }

    fn bind_geometry(&mut self, geometry: GeometryId) -> Result<(), GpuError> {
        if self.fail_geometry == Some(geometry) {
            return Err(GpuError::GeometryBind {
                geometry: geometry.0,
                reason: "injected failure".into(),
            });
        }
        self.events.push(BackendEvent::BindGeometry(geometry));
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), GpuError> {
        self.events.push(BackendEvent::BindTexture { unit, texture });
        Ok(())
    }

    fn draw(&mut self, geometry: GeometryId) -> Result<(), GpuError> {
        if self.fail_draw_at == Some(self.draws) {
            return Err(GpuError::Draw(format!("injected failure on draw {}", self.draws)));
        }
        self.draws += 1;
        self.events.push(BackendEvent::Draw(geometry));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        if self.active_pass.is_some() {
            return Err(GpuError::Submit("frame ended inside a pass".into()));
        }
        self.in_frame = false;
        self.frames += 1;
        self.events.push(BackendEvent::EndFrame);
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.in_frame = false;
        self.events.push(BackendEvent::AbortFrame);
    }
}
