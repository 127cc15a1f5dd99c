use glam::{Mat4, Vec3};

/// Directional light.
///
/// `light_space_transform` is written by
/// [`ShadowFrustumFitter::fit`](crate::renderer::ShadowFrustumFitter::fit)
/// each frame and read back when shading and rendering the shadow pass.
#[derive(Debug, Clone)]
pub struct Light {
    /// Direction the light travels in. Need not be normalized.
    pub direction: Vec3,
    pub color: Vec3,
    pub ambient_intensity: f32,
    pub diffuse_intensity: f32,

    pub(crate) light_space_transform: Mat4,
}

impl Light {
    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            direction,
            color,
            ambient_intensity: 0.2,
            diffuse_intensity: 0.8,
            light_space_transform: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_intensities(mut self, ambient: f32, diffuse: f32) -> Self {
        self.ambient_intensity = ambient;
        self.diffuse_intensity = diffuse;
        self
    }

    /// World space to the shadow map's clip volume, from the last fit.
    #[inline]
    #[must_use]
    pub fn light_space_transform(&self) -> Mat4 {
        self.light_space_transform
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::directional(Vec3::new(-1.0, -1.0, -1.0), Vec3::ONE)
    }
}
