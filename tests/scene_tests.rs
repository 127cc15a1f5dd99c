//! Scene Traversal Tests
//!
//! Tests for:
//! - Object storage (add / remove / lookup)
//! - World matrix updates
//! - Draw command emission per object kind
//! - Shadow pass emission with and without a light
//! - Skinned meshes feeding the skin palette
//! - End-to-end frame through the headless backend

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3, Vec4};

use umbra::animation::{AnimationClip, AnimationInstance, Joint, JointPose, Keyframe, Skeleton, SkeletonPose};
use umbra::errors::UmbraError;
use umbra::renderer::{
    BackendEvent, GeometryId, HeadlessBackend, RenderScheduler, RendererSettings, ShadowFrustumFitter, TextureId,
    UniformSlot, UniformValue,
};
use umbra::scene::{Camera, Light, Material, Renderable, Scene};

fn camera() -> Camera {
    let mut camera = Camera::perspective(1.0, 1.0, 0.1, 50.0);
    camera.set_position(Vec3::new(0.0, 2.0, 8.0));
    camera.look_at(Vec3::ZERO, Vec3::Y);
    camera
}

fn frame_parts() -> (RenderScheduler, HeadlessBackend, ShadowFrustumFitter) {
    let settings = RendererSettings::default();
    (
        RenderScheduler::new(&settings),
        HeadlessBackend::default(),
        ShadowFrustumFitter::new(&settings),
    )
}

fn walking_instance() -> AnimationInstance {
    let skeleton = Skeleton::new(
        "legs",
        vec![Joint::root(Mat4::IDENTITY), Joint::child(0, Mat4::IDENTITY)],
    )
    .unwrap();
    let pose = |y: f32| {
        SkeletonPose::new(vec![
            JointPose::default(),
            JointPose {
                translation: Vec3::new(0.0, y, 0.0),
                ..Default::default()
            },
        ])
    };
    let clip = AnimationClip::new(
        "walk",
        1.0,
        Some(1.0),
        vec![Keyframe::new(0.0, pose(0.0)), Keyframe::new(1.0, pose(1.0))],
    )
    .unwrap();
    AnimationInstance::new(Arc::new(clip), Arc::new(skeleton)).unwrap()
}

// ============================================================================
// Object Storage
// ============================================================================

#[test]
fn add_and_remove_objects() {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(GeometryId(1), Material::default());
    let text = scene.add_text(GeometryId(2), Vec3::ONE);
    let quad = scene.add_quad(100.0, 20.0, Vec3::ONE);
    assert_eq!(scene.len(), 3);

    assert!(scene.remove(text).is_some());
    assert!(scene.get(text).is_none());
    assert!(scene.get(mesh).is_some());
    assert!(matches!(scene.get(quad).unwrap().renderable, Renderable::Quad(_)));
    assert_eq!(scene.len(), 2);
}

#[test]
fn animation_only_attaches_to_meshes() {
    let mut scene = Scene::new();
    let text = scene.add_text(GeometryId(0), Vec3::ONE);
    let mesh = scene.add_mesh(GeometryId(0), Material::default());

    assert!(matches!(
        scene.set_animation(text, walking_instance()),
        Err(UmbraError::ObjectNotFound)
    ));
    scene.set_animation(mesh, walking_instance()).unwrap();
    assert!(scene.get(mesh).unwrap().as_mesh().unwrap().animation.is_some());
}

#[test]
fn update_applies_transforms() {
    let mut scene = Scene::new();
    let key = scene.add_mesh(GeometryId(0), Material::default());

    let object = scene.get_mut(key).unwrap();
    object.transform.position = Vec3::new(1.0, 2.0, 3.0);
    object.transform.rotation = Quat::from_rotation_z(0.5);
    object.transform.scale = Vec3::splat(2.0);
    scene.update(0.0);

    let expected = Mat4::from_scale_rotation_translation(Vec3::splat(2.0), Quat::from_rotation_z(0.5), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(scene.get(key).unwrap().world_matrix(), expected);
}

// ============================================================================
// Command Emission
// ============================================================================

#[test]
fn empty_scene_presents_successfully() {
    let (mut scheduler, mut backend, fitter) = frame_parts();
    let scene = Scene::new();
    let mut light = Light::default();

    scene.render(&mut scheduler, &camera(), Some(&mut light), &fitter).unwrap();
    let stats = scheduler.present(&mut backend).unwrap();

    assert_eq!(stats.draws, 0);
    assert_eq!(backend.draw_count(), 0);
}

#[test]
fn lit_meshes_emit_shadow_and_opaque_commands() {
    let (mut scheduler, mut backend, fitter) = frame_parts();
    let mut scene = Scene::new();
    scene.add_mesh(GeometryId(1), Material::default());
    scene.add_mesh(GeometryId(2), Material::default());
    let mut light = Light::directional(Vec3::new(-1.0, -1.0, 0.0), Vec3::ONE);

    scene.render(&mut scheduler, &camera(), Some(&mut light), &fitter).unwrap();
    assert_eq!(scheduler.queue_len(), 4);

    let stats = scheduler.present(&mut backend).unwrap();
    assert_eq!(stats.pass_switches, 2);
    assert!(backend.events().contains(&BackendEvent::BeginPass("Shadow Pass")));
    assert!(matches!(
        backend.uniform_value(UniformSlot::LIGHT_SPACE),
        Some(UniformValue::Mat4(m)) if *m == light.light_space_transform()
    ));
}

#[test]
fn light_intensities_reach_lit_pass() {
    let (mut scheduler, mut backend, fitter) = frame_parts();
    let mut scene = Scene::new();
    scene.add_mesh(GeometryId(1), Material::default());
    let mut light = Light::directional(Vec3::new(0.0, -1.0, -1.0), Vec3::ONE).with_intensities(0.35, 0.65);

    scene.render(&mut scheduler, &camera(), Some(&mut light), &fitter).unwrap();
    scheduler.present(&mut backend).unwrap();

    assert!(matches!(
        backend.uniform_value(UniformSlot::AMBIENT_INTENSITY),
        Some(UniformValue::Float(v)) if (*v - 0.35).abs() < f32::EPSILON
    ));
    assert!(matches!(
        backend.uniform_value(UniformSlot::DIFFUSE_INTENSITY),
        Some(UniformValue::Float(v)) if (*v - 0.65).abs() < f32::EPSILON
    ));
}

#[test]
fn three_meshes_share_one_projection_upload() {
    let (mut scheduler, mut backend, fitter) = frame_parts();
    let mut scene = Scene::new();
    for i in 0..3 {
        let key = scene.add_mesh(GeometryId(i), Material::default());
        scene.get_mut(key).unwrap().transform.position = Vec3::X * i as f32;
    }
    scene.update(0.016);

    scene.render(&mut scheduler, &camera(), None, &fitter).unwrap();
    scheduler.present(&mut backend).unwrap();

    assert_eq!(backend.uniform_upload_count(UniformSlot::PROJECTION), 1);
    assert_eq!(backend.uniform_upload_count(UniformSlot::MODEL), 3);
}

#[test]
fn no_light_means_no_shadow_pass() {
    let (mut scheduler, mut backend, fitter) = frame_parts();
    let mut scene = Scene::new();
    scene.add_mesh(GeometryId(1), Material::default());

    scene.render(&mut scheduler, &camera(), None, &fitter).unwrap();
    scheduler.present(&mut backend).unwrap();

    assert!(!backend.events().contains(&BackendEvent::BeginPass("Shadow Pass")));
    assert_eq!(backend.draw_count(), 1);
}

#[test]
fn non_casters_skip_shadow_pass() {
    let (mut scheduler, _, fitter) = frame_parts();
    let mut scene = Scene::new();
    let key = scene.add_mesh(GeometryId(1), Material::default());
    scene.get_mut(key).unwrap().as_mesh_mut().unwrap().cast_shadows = false;
    let mut light = Light::default();

    scene.render(&mut scheduler, &camera(), Some(&mut light), &fitter).unwrap();

    assert_eq!(scheduler.queue_len(), 1);
}

#[test]
fn invisible_objects_are_skipped() {
    let (mut scheduler, _, fitter) = frame_parts();
    let mut scene = Scene::new();
    let key = scene.add_text(GeometryId(3), Vec3::ONE);
    scene.add_quad(10.0, 10.0, Vec3::ONE);
    scene.get_mut(key).unwrap().visible = false;

    scene.render(&mut scheduler, &camera(), None, &fitter).unwrap();

    assert_eq!(scheduler.queue_len(), 1);
}

#[test]
fn quads_use_unit_quad_and_size() {
    let (mut scheduler, mut backend, fitter) = frame_parts();
    let mut scene = Scene::new();
    scene.add_quad(64.0, 32.0, Vec3::new(1.0, 0.0, 0.0));

    scene.render(&mut scheduler, &camera(), None, &fitter).unwrap();
    scheduler.present(&mut backend).unwrap();

    assert!(backend.events().contains(&BackendEvent::Draw(GeometryId::UNIT_QUAD)));
    assert!(matches!(
        backend.uniform_value(UniformSlot::SIZE),
        Some(UniformValue::Vec4(v)) if *v == Vec4::new(64.0, 32.0, 0.0, 0.0)
    ));
    assert_eq!(backend.blend(), None);
}

#[test]
fn textured_mesh_binds_texture_before_draw() {
    let (mut scheduler, mut backend, fitter) = frame_parts();
    let mut scene = Scene::new();
    scene.add_mesh(GeometryId(4), Material::with_texture(TextureId(11)));

    scene.render(&mut scheduler, &camera(), None, &fitter).unwrap();
    scheduler.present(&mut backend).unwrap();

    let events = backend.events();
    let draw = events.iter().position(|e| *e == BackendEvent::Draw(GeometryId(4))).unwrap();
    assert_eq!(
        events[draw - 1],
        BackendEvent::BindTexture {
            unit: 0,
            texture: TextureId(11)
        }
    );
    assert!(matches!(
        backend.uniform_value(UniformSlot::ENABLE_TEXTURE),
        Some(UniformValue::Bool(true))
    ));
}

// ============================================================================
// Skinning
// ============================================================================

#[test]
fn skinned_mesh_uploads_current_palette() {
    let (mut scheduler, mut backend, fitter) = frame_parts();
    let mut scene = Scene::new();
    let key = scene.add_mesh(GeometryId(5), Material::default());
    scene.set_animation(key, walking_instance()).unwrap();
    scene.update(0.5);

    scene.render(&mut scheduler, &camera(), None, &fitter).unwrap();
    scheduler.present(&mut backend).unwrap();

    let Some(UniformValue::Mat4Array(palette)) = backend.uniform_value(UniformSlot::SKIN_TRANSFORMS) else {
        panic!("skin palette was not uploaded");
    };
    let instance = scene.get(key).unwrap().as_mesh().unwrap().animation.as_ref().unwrap();
    assert!(Arc::ptr_eq(palette, instance.skin_matrices()));
    assert!((palette[1].w_axis.y - 0.5).abs() < 1e-5);
}

// ============================================================================
// Failure Propagation
// ============================================================================

#[test]
fn full_queue_stops_traversal() {
    let settings = RendererSettings {
        queue_capacity: 2,
        ..Default::default()
    };
    let mut scheduler = RenderScheduler::new(&settings);
    let fitter = ShadowFrustumFitter::new(&settings);
    let mut scene = Scene::new();
    for i in 0..3 {
        scene.add_text(GeometryId(i), Vec3::ONE);
    }

    let result = scene.render(&mut scheduler, &camera(), None, &fitter);

    assert!(matches!(result, Err(UmbraError::QueueFull { capacity: 2 })));
    assert_eq!(scheduler.queue_len(), 2);
}

#[test]
fn degenerate_light_fails_before_submitting() {
    let (mut scheduler, _, fitter) = frame_parts();
    let mut scene = Scene::new();
    scene.add_mesh(GeometryId(0), Material::default());
    let mut light = Light::directional(Vec3::ZERO, Vec3::ONE);

    let result = scene.render(&mut scheduler, &camera(), Some(&mut light), &fitter);

    assert!(matches!(result, Err(UmbraError::DegenerateLightBasis { .. })));
    assert_eq!(scheduler.queue_len(), 0);
}
