//! Render Scheduler Tests
//!
//! Tests for:
//! - Fixed-capacity queue backpressure
//! - Sorting by (pass, geometry)
//! - Per-pass uniform upload elision
//! - Geometry rebind elision
//! - Pass enter/exit bookkeeping (viewport, target, blending)
//! - Failure handling (abort, queue cleanup, pass exit)

use std::sync::Arc;

use glam::{Mat4, Vec3};

use umbra::errors::{GpuError, UmbraError};
use umbra::renderer::{
    BackendEvent, BlendMode, DrawCommand, GeometryId, HeadlessBackend, HookData, PassId, RenderBackend,
    RenderScheduler, RenderTarget, RendererSettings, ShaderId, TextureId, UniformSlot, UniformValue,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scheduler_with_capacity(capacity: usize) -> RenderScheduler {
    RenderScheduler::new(&RendererSettings {
        queue_capacity: capacity,
        ..Default::default()
    })
}

fn opaque(geometry: u32) -> DrawCommand {
    DrawCommand::new(PassId::LIT_OPAQUE, GeometryId(geometry))
}

fn perspective() -> Mat4 {
    Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0)
}

fn draws(backend: &HeadlessBackend) -> Vec<GeometryId> {
    backend
        .events()
        .iter()
        .filter_map(|e| match e {
            BackendEvent::Draw(g) => Some(*g),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Queue Capacity
// ============================================================================

#[test]
fn submit_up_to_capacity_succeeds() {
    let mut scheduler = scheduler_with_capacity(8);
    for i in 0..8 {
        scheduler.submit(opaque(i)).unwrap();
    }
    assert_eq!(scheduler.queue_len(), 8);
}

#[test]
fn submit_past_capacity_is_queue_full() {
    init_logger();
    let mut scheduler = scheduler_with_capacity(8);
    for i in 0..8 {
        scheduler.submit(opaque(i)).unwrap();
    }

    let result = scheduler.submit(opaque(99));

    assert!(matches!(result, Err(UmbraError::QueueFull { capacity: 8 })));
    assert_eq!(scheduler.queue_len(), 8);
}

#[test]
fn default_capacity_is_one_thousand() {
    let mut scheduler = RenderScheduler::new(&RendererSettings::default());
    for _ in 0..1000 {
        scheduler.submit(opaque(0)).unwrap();
    }
    assert!(scheduler.submit(opaque(0)).is_err());
    assert_eq!(scheduler.queue_capacity(), 1000);
}

#[test]
fn queue_is_reusable_after_present() {
    let mut scheduler = scheduler_with_capacity(2);
    let mut backend = HeadlessBackend::default();

    scheduler.submit(opaque(0)).unwrap();
    scheduler.submit(opaque(1)).unwrap();
    scheduler.present(&mut backend).unwrap();

    scheduler.submit(opaque(2)).unwrap();
    scheduler.submit(opaque(3)).unwrap();
    assert_eq!(scheduler.queue_len(), 2);
}

// ============================================================================
// Present: Basics
// ============================================================================

#[test]
fn empty_queue_presents_nothing() {
    let mut scheduler = scheduler_with_capacity(4);
    let mut backend = HeadlessBackend::default();

    let stats = scheduler.present(&mut backend).unwrap();

    assert_eq!(stats.draws, 0);
    assert_eq!(backend.draw_count(), 0);
    assert!(backend.events().is_empty());
}

#[test]
fn present_sorts_by_pass_then_geometry() {
    let mut scheduler = scheduler_with_capacity(16);
    let mut backend = HeadlessBackend::default();

    scheduler.submit(DrawCommand::new(PassId::QUAD, GeometryId(1))).unwrap();
    scheduler.submit(opaque(7)).unwrap();
    scheduler.submit(DrawCommand::new(PassId::SHADOW, GeometryId(7))).unwrap();
    scheduler.submit(opaque(3)).unwrap();
    scheduler.submit(DrawCommand::new(PassId::TEXT, GeometryId(0))).unwrap();
    scheduler.submit(opaque(7)).unwrap();

    scheduler.present(&mut backend).unwrap();

    assert_eq!(
        draws(&backend),
        vec![
            GeometryId(7),
            GeometryId(3),
            GeometryId(7),
            GeometryId(7),
            GeometryId(0),
            GeometryId(1)
        ]
    );
}

#[test]
fn passes_enter_and_exit_in_order() {
    let mut scheduler = scheduler_with_capacity(8);
    let mut backend = HeadlessBackend::default();

    scheduler.submit(DrawCommand::new(PassId::TEXT, GeometryId(4))).unwrap();
    scheduler.submit(DrawCommand::new(PassId::SHADOW, GeometryId(1))).unwrap();
    scheduler.submit(opaque(1)).unwrap();

    let stats = scheduler.present(&mut backend).unwrap();

    let expected = vec![
        BackendEvent::BeginFrame,
        BackendEvent::BeginPass("Shadow Pass"),
        BackendEvent::BindShader(ShaderId(0)),
        BackendEvent::BindGeometry(GeometryId(1)),
        BackendEvent::Draw(GeometryId(1)),
        BackendEvent::EndPass("Shadow Pass"),
        BackendEvent::BeginPass("Lit Opaque Pass"),
        BackendEvent::BindShader(ShaderId(1)),
        BackendEvent::BindGeometry(GeometryId(1)),
        BackendEvent::Draw(GeometryId(1)),
        BackendEvent::EndPass("Lit Opaque Pass"),
        BackendEvent::BeginPass("Text Pass"),
        BackendEvent::BindShader(ShaderId(2)),
        BackendEvent::BindGeometry(GeometryId(4)),
        BackendEvent::Draw(GeometryId(4)),
        BackendEvent::EndPass("Text Pass"),
        BackendEvent::EndFrame,
    ];
    assert_eq!(backend.events(), expected.as_slice());
    assert_eq!(stats.pass_switches, 3);
    assert_eq!(stats.draws, 3);
}

#[test]
fn replaced_pass_shader_is_bound() {
    let mut scheduler = scheduler_with_capacity(2);
    let mut backend = HeadlessBackend::default();
    assert!(scheduler.passes_mut().set_shader(PassId::LIT_OPAQUE, ShaderId(42)));

    scheduler.submit(opaque(0)).unwrap();
    scheduler.present(&mut backend).unwrap();

    assert!(backend.events().contains(&BackendEvent::BindShader(ShaderId(42))));
}

// ============================================================================
// Uniform Cache
// ============================================================================

#[test]
fn shared_projection_uploads_once() {
    let mut scheduler = scheduler_with_capacity(8);
    let mut backend = HeadlessBackend::default();

    for i in 0..3 {
        let command = opaque(i)
            .with_uniform(UniformSlot::PROJECTION, UniformValue::Mat4(perspective()))
            .with_uniform(
                UniformSlot::MODEL,
                UniformValue::Mat4(Mat4::from_translation(Vec3::X * i as f32)),
            );
        scheduler.submit(command).unwrap();
    }

    let stats = scheduler.present(&mut backend).unwrap();

    assert_eq!(backend.uniform_upload_count(UniformSlot::PROJECTION), 1);
    assert_eq!(backend.uniform_upload_count(UniformSlot::MODEL), 3);
    assert_eq!(stats.uniform_uploads, 4);
    assert_eq!(backend.total_uniform_uploads(), 4);
    assert_eq!(stats.uniform_uploads_skipped, 2);
}

#[test]
fn changed_value_is_uploaded_again() {
    let mut scheduler = scheduler_with_capacity(8);
    let mut backend = HeadlessBackend::default();

    for opacity in [0.5, 0.5, 1.0, 1.0, 0.5] {
        scheduler
            .submit(opaque(0).with_uniform(UniformSlot::OPACITY, UniformValue::Float(opacity)))
            .unwrap();
    }
    scheduler.present(&mut backend).unwrap();

    assert_eq!(backend.uniform_upload_count(UniformSlot::OPACITY), 3);
    assert!(matches!(
        backend.uniform_value(UniformSlot::OPACITY),
        Some(UniformValue::Float(v)) if (*v - 0.5).abs() < f32::EPSILON
    ));
}

#[test]
fn cache_resets_on_pass_change() {
    let mut scheduler = scheduler_with_capacity(8);
    let mut backend = HeadlessBackend::default();
    let projection = UniformValue::Mat4(perspective());

    scheduler
        .submit(DrawCommand::new(PassId::SHADOW, GeometryId(0)).with_uniform(UniformSlot::PROJECTION, projection.clone()))
        .unwrap();
    scheduler
        .submit(opaque(0).with_uniform(UniformSlot::PROJECTION, projection.clone()))
        .unwrap();
    scheduler
        .submit(opaque(1).with_uniform(UniformSlot::PROJECTION, projection))
        .unwrap();

    scheduler.present(&mut backend).unwrap();

    // Once per pass activation
    assert_eq!(backend.uniform_upload_count(UniformSlot::PROJECTION), 2);
}

#[test]
fn cache_does_not_survive_frames() {
    let mut scheduler = scheduler_with_capacity(4);
    let mut backend = HeadlessBackend::default();

    for _ in 0..2 {
        scheduler
            .submit(opaque(0).with_uniform(UniformSlot::VIEW, UniformValue::Mat4(Mat4::IDENTITY)))
            .unwrap();
        scheduler.present(&mut backend).unwrap();
    }

    assert_eq!(backend.uniform_upload_count(UniformSlot::VIEW), 2);
}

#[test]
fn shared_skin_palette_uploads_once() {
    let mut scheduler = scheduler_with_capacity(4);
    let mut backend = HeadlessBackend::default();
    let palette: Arc<[Mat4]> = vec![Mat4::IDENTITY; 12].into();
    let copy: Arc<[Mat4]> = palette.to_vec().into();

    for value in [palette.clone(), palette, copy] {
        scheduler
            .submit(opaque(0).with_uniform(UniformSlot::SKIN_TRANSFORMS, UniformValue::Mat4Array(value)))
            .unwrap();
    }
    scheduler.present(&mut backend).unwrap();

    // Equal contents in a different allocation still count as a new palette
    assert_eq!(backend.uniform_upload_count(UniformSlot::SKIN_TRANSFORMS), 2);
}

// ============================================================================
// Geometry Binding
// ============================================================================

#[test]
fn geometry_bound_once_per_run() {
    let mut scheduler = scheduler_with_capacity(8);
    let mut backend = HeadlessBackend::default();

    for geometry in [2, 5, 2, 5, 2] {
        scheduler.submit(opaque(geometry)).unwrap();
    }
    let stats = scheduler.present(&mut backend).unwrap();

    let binds: Vec<_> = backend
        .events()
        .iter()
        .filter(|e| matches!(e, BackendEvent::BindGeometry(_)))
        .collect();
    assert_eq!(binds.len(), 2);
    assert_eq!(stats.geometry_binds, 2);
    assert_eq!(stats.draws, 5);
}

#[test]
fn geometry_rebound_after_pass_change() {
    let mut scheduler = scheduler_with_capacity(4);
    let mut backend = HeadlessBackend::default();

    scheduler.submit(DrawCommand::new(PassId::SHADOW, GeometryId(9))).unwrap();
    scheduler.submit(opaque(9)).unwrap();
    let stats = scheduler.present(&mut backend).unwrap();

    assert_eq!(stats.geometry_binds, 2);
}

// ============================================================================
// Pass State
// ============================================================================

fn record_state(backend: &mut dyn RenderBackend, _: Option<&HookData>) -> Result<(), GpuError> {
    backend.bind_texture(7, TextureId(7))
}

#[test]
fn shadow_pass_uses_shadow_target_and_restores_viewport() {
    let settings = RendererSettings {
        shadow_map_size: 2048,
        ..Default::default()
    };
    let mut scheduler = RenderScheduler::new(&settings);
    let mut backend = HeadlessBackend::new(640, 480);

    scheduler.submit(DrawCommand::new(PassId::SHADOW, GeometryId(0))).unwrap();
    scheduler.present(&mut backend).unwrap();

    assert_eq!(backend.viewport(), (640, 480));
    assert_eq!(backend.target(), RenderTarget::Screen);
    assert_eq!(backend.active_pass(), None);
    assert_eq!(
        scheduler.passes().get(PassId::SHADOW).unwrap().state().viewport,
        Some((2048, 2048))
    );
}

#[test]
fn overlay_passes_enable_and_disable_blending() {
    let scheduler = scheduler_with_capacity(1);
    let passes = scheduler.passes();

    assert_eq!(passes.get(PassId::TEXT).unwrap().state().blend, Some(BlendMode::Alpha));
    assert_eq!(passes.get(PassId::QUAD).unwrap().state().blend, Some(BlendMode::Alpha));
    assert_eq!(passes.get(PassId::LIT_OPAQUE).unwrap().state().blend, None);

    let mut backend = HeadlessBackend::default();
    let mut scheduler = scheduler_with_capacity(1);
    scheduler.submit(DrawCommand::new(PassId::QUAD, GeometryId::UNIT_QUAD)).unwrap();
    scheduler.present(&mut backend).unwrap();
    assert_eq!(backend.blend(), None);
}

#[test]
fn hooks_run_around_the_draw() {
    let mut scheduler = scheduler_with_capacity(2);
    let mut backend = HeadlessBackend::default();

    scheduler
        .submit(
            opaque(3)
                .with_pre_draw(record_state)
                .with_post_draw(record_state),
        )
        .unwrap();
    scheduler.present(&mut backend).unwrap();

    let events = backend.events();
    let draw = events.iter().position(|e| *e == BackendEvent::Draw(GeometryId(3))).unwrap();
    let texture = BackendEvent::BindTexture {
        unit: 7,
        texture: TextureId(7),
    };
    assert_eq!(events[draw - 1], texture);
    assert_eq!(events[draw + 1], texture);
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn draw_failure_aborts_and_clears_queue() {
    init_logger();
    let mut scheduler = scheduler_with_capacity(8);
    let mut backend = HeadlessBackend::default();
    backend.fail_on_draw(1);

    for i in 0..4 {
        scheduler.submit(opaque(i)).unwrap();
    }
    let result = scheduler.present(&mut backend);

    assert!(matches!(result, Err(UmbraError::Gpu(GpuError::Draw(_)))));
    assert_eq!(scheduler.queue_len(), 0);
    assert_eq!(backend.draw_count(), 1);
    assert_eq!(backend.active_pass(), None, "last pass must still be exited");
    assert_eq!(backend.events().last(), Some(&BackendEvent::AbortFrame));
    assert!(!backend.in_frame());
}

#[test]
fn uniform_failure_is_reported() {
    let mut scheduler = scheduler_with_capacity(4);
    let mut backend = HeadlessBackend::default();
    backend.fail_on_uniform(UniformSlot::MODEL);

    scheduler
        .submit(opaque(0).with_uniform(UniformSlot::MODEL, UniformValue::Mat4(Mat4::IDENTITY)))
        .unwrap();
    let result = scheduler.present(&mut backend);

    assert!(matches!(
        result,
        Err(UmbraError::Gpu(GpuError::UniformUpload { slot: 0, .. }))
    ));
    assert_eq!(scheduler.queue_len(), 0);
    assert_eq!(backend.draw_count(), 0);
}

#[test]
fn geometry_failure_is_reported() {
    let mut scheduler = scheduler_with_capacity(4);
    let mut backend = HeadlessBackend::default();
    backend.fail_on_geometry(GeometryId(5));

    scheduler.submit(opaque(5)).unwrap();
    let result = scheduler.present(&mut backend);

    assert!(matches!(
        result,
        Err(UmbraError::Gpu(GpuError::GeometryBind { geometry: 5, .. }))
    ));
    assert_eq!(scheduler.queue_len(), 0);
}

#[test]
fn pass_failure_stops_later_passes() {
    let mut scheduler = scheduler_with_capacity(4);
    let mut backend = HeadlessBackend::default();
    backend.fail_on_pass("Lit Opaque Pass");

    scheduler.submit(DrawCommand::new(PassId::SHADOW, GeometryId(0))).unwrap();
    scheduler.submit(opaque(0)).unwrap();
    scheduler.submit(DrawCommand::new(PassId::TEXT, GeometryId(0))).unwrap();
    let result = scheduler.present(&mut backend);

    assert!(matches!(result, Err(UmbraError::Gpu(GpuError::PassTransition(_)))));
    assert_eq!(backend.draw_count(), 1);
    assert!(!backend.events().contains(&BackendEvent::BeginPass("Text Pass")));
    assert_eq!(scheduler.queue_len(), 0);
}

#[test]
fn next_frame_succeeds_after_failure() {
    let mut scheduler = scheduler_with_capacity(4);
    let mut backend = HeadlessBackend::default();
    backend.fail_on_draw(0);

    scheduler.submit(opaque(0)).unwrap();
    assert!(scheduler.present(&mut backend).is_err());

    backend.clear_failures();
    scheduler.submit(opaque(0)).unwrap();
    let stats = scheduler.present(&mut backend).unwrap();

    assert_eq!(stats.draws, 1);
    assert_eq!(backend.frames_completed(), 1);
}

#[test]
fn unknown_pass_is_rejected() {
    let mut scheduler = scheduler_with_capacity(2);
    let mut backend = HeadlessBackend::default();

    scheduler.submit(DrawCommand::new(PassId(9), GeometryId(0))).unwrap();
    let result = scheduler.present(&mut backend);

    assert!(matches!(result, Err(UmbraError::UnknownPass(PassId(9)))));
    assert_eq!(scheduler.queue_len(), 0);
}
