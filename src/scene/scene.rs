use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use slotmap::SlotMap;

use crate::animation::AnimationInstance;
use crate::errors::{GpuError, Result, UmbraError};
use crate::renderer::backend::RenderBackend;
use crate::renderer::command::{DrawCommand, GeometryId, HookData, TextureId};
use crate::renderer::pass::PassId;
use crate::renderer::scheduler::RenderScheduler;
use crate::renderer::shadow::ShadowFrustumFitter;
use crate::renderer::uniforms::{UniformSlot, UniformValue};
use crate::scene::ObjectKey;
use crate::scene::camera::Camera;
use crate::scene::light::Light;
use crate::scene::material::Material;
use crate::scene::transform::Transform;

/// Texture unit the shadow map is bound to in lit shaders.
const SHADOW_MAP_UNIT: i32 = 1;
/// Texture unit material textures are bound to.
const MATERIAL_TEXTURE_UNIT: u32 = 0;

#[derive(Debug, Clone)]
pub struct MeshObject {
    pub geometry: GeometryId,
    /// Applied before the object transform, e.g. to bring loader units into
    /// world units.
    pub intrinsic: Mat4,
    pub material: Material,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub animation: Option<AnimationInstance>,
}

#[derive(Debug, Clone)]
pub struct TextObject {
    pub geometry: GeometryId,
    pub color: Vec3,
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub struct QuadObject {
    pub width: f32,
    pub height: f32,
    pub color: Vec3,
    pub texture: Option<TextureId>,
    /// Border widths: left, right, top, bottom.
    pub border: Vec4,
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub enum Renderable {
    Mesh(MeshObject),
    Text(TextObject),
    Quad(QuadObject),
}

#[derive(Debug, Clone)]
pub struct Object {
    pub transform: Transform,
    pub visible: bool,
    pub renderable: Renderable,
}

impl Object {
    fn new(renderable: Renderable) -> Self {
        let mut transform = Transform::new();
        transform.update_matrix();
        Self {
            transform,
            visible: true,
            renderable,
        }
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    #[must_use]
    pub fn as_mesh(&self) -> Option<&MeshObject> {
        match &self.renderable {
            Renderable::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshObject> {
        match &mut self.renderable {
            Renderable::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

// Pre-draw hook for textured commands; userdata carries the TextureId.
fn bind_texture_hook(backend: &mut dyn RenderBackend, data: Option<&HookData>) -> std::result::Result<(), GpuError> {
    match data.and_then(|d| d.downcast_ref::<TextureId>()) {
        Some(texture) => backend.bind_texture(MATERIAL_TEXTURE_UNIT, *texture),
        None => Ok(()),
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    objects: SlotMap<ObjectKey, Object>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Objects ===

    pub fn add_mesh(&mut self, geometry: GeometryId, material: Material) -> ObjectKey {
        self.objects.insert(Object::new(Renderable::Mesh(MeshObject {
            geometry,
            intrinsic: Mat4::IDENTITY,
            material,
            cast_shadows: true,
            receive_shadows: true,
            animation: None,
        })))
    }

    pub fn add_text(&mut self, geometry: GeometryId, color: Vec3) -> ObjectKey {
        self.objects.insert(Object::new(Renderable::Text(TextObject {
            geometry,
            color,
            opacity: 1.0,
        })))
    }

    pub fn add_quad(&mut self, width: f32, height: f32, color: Vec3) -> ObjectKey {
        self.objects.insert(Object::new(Renderable::Quad(QuadObject {
            width,
            height,
            color,
            texture: None,
            border: Vec4::ZERO,
            opacity: 1.0,
        })))
    }

    /// Attaches a playing animation to a mesh object.
    pub fn set_animation(&mut self, key: ObjectKey, animation: AnimationInstance) -> Result<()> {
        let mesh = self
            .objects
            .get_mut(key)
            .and_then(Object::as_mesh_mut)
            .ok_or(UmbraError::ObjectNotFound)?;
        mesh.animation = Some(animation);
        Ok(())
    }

    pub fn remove(&mut self, key: ObjectKey) -> Option<Object> {
        self.objects.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: ObjectKey) -> Option<&Object> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut Object> {
        self.objects.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectKey, &Object)> {
        self.objects.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // === Frame ===

    /// Refreshes world matrices and advances every animation by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for object in self.objects.values_mut() {
            object.transform.update_matrix();
            if let Renderable::Mesh(MeshObject {
                animation: Some(animation),
                ..
            }) = &mut object.renderable
            {
                animation.advance(dt);
            }
        }
    }

    /// Fits the shadow volume (when a light is given) and submits draw
    /// commands for every visible object.
    ///
    /// Without a light, meshes are drawn unlit and no shadow pass is queued.
    /// Traversal stops at the first failure; commands already submitted stay
    /// queued for the caller to present or drop.
    pub fn render(
        &self,
        scheduler: &mut RenderScheduler,
        camera: &Camera,
        light: Option<&mut Light>,
        fitter: &ShadowFrustumFitter,
    ) -> Result<()> {
        let light: Option<&Light> = match light {
            Some(light) => {
                fitter.fit(light, camera)?;
                Some(&*light)
            }
            None => None,
        };

        for object in self.objects.values().filter(|o| o.visible) {
            let world = object.world_matrix();
            match &object.renderable {
                Renderable::Mesh(mesh) => {
                    let model = world * mesh.intrinsic;
                    if let Some(light) = light
                        && mesh.cast_shadows
                    {
                        scheduler.submit(Self::shadow_command(mesh, model, light))?;
                    }
                    scheduler.submit(Self::mesh_command(mesh, model, camera, light))?;
                }
                Renderable::Text(text) => {
                    scheduler.submit(Self::text_command(text, world, camera))?;
                }
                Renderable::Quad(quad) => {
                    scheduler.submit(Self::quad_command(quad, world, camera))?;
                }
            }
        }

        Ok(())
    }

    fn push_skinning(command: &mut DrawCommand, mesh: &MeshObject) {
        match &mesh.animation {
            Some(animation) => {
                command.push_uniform(UniformSlot::ENABLE_SKINNING, UniformValue::Bool(true));
                command.push_uniform(
                    UniformSlot::SKIN_TRANSFORMS,
                    UniformValue::Mat4Array(Arc::clone(animation.skin_matrices())),
                );
            }
            None => command.push_uniform(UniformSlot::ENABLE_SKINNING, UniformValue::Bool(false)),
        }
    }

    fn shadow_command(mesh: &MeshObject, model: Mat4, light: &Light) -> DrawCommand {
        let mut command = DrawCommand::new(PassId::SHADOW, mesh.geometry)
            .with_uniform(UniformSlot::MODEL, UniformValue::Mat4(model))
            .with_uniform(
                UniformSlot::LIGHT_SPACE,
                UniformValue::Mat4(light.light_space_transform()),
            );
        Self::push_skinning(&mut command, mesh);
        command
    }

    fn mesh_command(mesh: &MeshObject, model: Mat4, camera: &Camera, light: Option<&Light>) -> DrawCommand {
        let material = &mesh.material;
        let mut command = DrawCommand::new(PassId::LIT_OPAQUE, mesh.geometry)
            .with_uniform(UniformSlot::MODEL, UniformValue::Mat4(model))
            .with_uniform(UniformSlot::VIEW, UniformValue::Mat4(camera.view()))
            .with_uniform(UniformSlot::PROJECTION, UniformValue::Mat4(camera.projection()))
            .with_uniform(UniformSlot::EYE, UniformValue::Vec3(camera.position()));

        match light {
            Some(light) => {
                command.push_uniform(
                    UniformSlot::LIGHT_SPACE,
                    UniformValue::Mat4(light.light_space_transform()),
                );
                command.push_uniform(UniformSlot::LIGHT_DIRECTION, UniformValue::Vec3(light.direction));
                command.push_uniform(UniformSlot::LIGHT_COLOR, UniformValue::Vec3(light.color));
                command.push_uniform(
                    UniformSlot::AMBIENT_INTENSITY,
                    UniformValue::Float(light.ambient_intensity),
                );
                command.push_uniform(
                    UniformSlot::DIFFUSE_INTENSITY,
                    UniformValue::Float(light.diffuse_intensity),
                );
                command.push_uniform(UniformSlot::RECEIVE_SHADOWS, UniformValue::Bool(mesh.receive_shadows));
                command.push_uniform(UniformSlot::SHADOW_MAP, UniformValue::Int(SHADOW_MAP_UNIT));
                command.push_uniform(UniformSlot::RECEIVE_LIGHT, UniformValue::Bool(material.receive_light));
            }
            None => {
                command.push_uniform(UniformSlot::RECEIVE_SHADOWS, UniformValue::Bool(false));
                command.push_uniform(UniformSlot::RECEIVE_LIGHT, UniformValue::Bool(false));
            }
        }

        Self::push_skinning(&mut command, mesh);

        command.push_uniform(UniformSlot::COLOR, UniformValue::Vec3(material.color));
        command.push_uniform(
            UniformSlot::SPECULAR_INTENSITY,
            UniformValue::Float(material.specular_intensity),
        );
        command.push_uniform(UniformSlot::SPECULAR_POWER, UniformValue::Float(material.specular_power));
        Self::push_texture(command, material.texture)
    }

    fn text_command(text: &TextObject, world: Mat4, camera: &Camera) -> DrawCommand {
        DrawCommand::new(PassId::TEXT, text.geometry)
            .with_uniform(UniformSlot::MODEL, UniformValue::Mat4(world))
            .with_uniform(UniformSlot::VIEW, UniformValue::Mat4(camera.view()))
            .with_uniform(UniformSlot::PROJECTION, UniformValue::Mat4(camera.projection()))
            .with_uniform(UniformSlot::COLOR, UniformValue::Vec3(text.color))
            .with_uniform(UniformSlot::OPACITY, UniformValue::Float(text.opacity))
    }

    fn quad_command(quad: &QuadObject, world: Mat4, camera: &Camera) -> DrawCommand {
        let mvp = camera.view_projection() * world * Mat4::from_scale(Vec3::new(quad.width, quad.height, 1.0));
        let command = DrawCommand::new(PassId::QUAD, GeometryId::UNIT_QUAD)
            .with_uniform(UniformSlot::MVP, UniformValue::Mat4(mvp))
            .with_uniform(
                UniformSlot::SIZE,
                UniformValue::Vec4(Vec4::new(quad.width, quad.height, 0.0, 0.0)),
            )
            .with_uniform(UniformSlot::BORDER, UniformValue::Vec4(quad.border))
            .with_uniform(UniformSlot::COLOR, UniformValue::Vec3(quad.color))
            .with_uniform(UniformSlot::OPACITY, UniformValue::Float(quad.opacity));
        Self::push_texture(command, quad.texture)
    }

    fn push_texture(command: DrawCommand, texture: Option<TextureId>) -> DrawCommand {
        match texture {
            Some(texture) => command
                .with_uniform(UniformSlot::ENABLE_TEXTURE, UniformValue::Bool(true))
                .with_uniform(
                    UniformSlot::TEXTURE_SAMPLER,
                    UniformValue::Int(MATERIAL_TEXTURE_UNIT as i32),
                )
                .with_pre_draw(bind_texture_hook)
                .with_userdata(Arc::new(texture)),
            None => command.with_uniform(UniformSlot::ENABLE_TEXTURE, UniformValue::Bool(false)),
        }
    }
}
