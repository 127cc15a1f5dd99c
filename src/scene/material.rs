use glam::Vec3;

use crate::renderer::command::TextureId;

/// Surface parameters of a lit mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub texture: Option<TextureId>,
    pub color: Vec3,
    /// Unlit meshes skip diffuse and specular terms.
    pub receive_light: bool,
    pub specular_intensity: f32,
    pub specular_power: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            texture: None,
            color: Vec3::ONE,
            receive_light: true,
            specular_intensity: 0.5,
            specular_power: 32.0,
        }
    }
}

impl Material {
    #[must_use]
    pub fn with_color(color: Vec3) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_texture(texture: TextureId) -> Self {
        Self {
            texture: Some(texture),
            ..Default::default()
        }
    }
}
