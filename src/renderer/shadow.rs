//! Shadow Frustum Fitting
//!
//! Fits a directional light's orthographic shadow volume tightly around the
//! camera's view frustum, every frame:
//!
//! 1. Build an orthonormal light basis from the light direction and the
//!    world up vector (falling back to a second up vector when the two are
//!    parallel).
//! 2. Unproject the 8 corners of the canonical clip volume through the
//!    inverse camera view-projection.
//! 3. Move the corners into light space and take their AABB.
//! 4. `light_space_transform = ortho(aabb) · world_to_light`.
//!
//! Results depend only on the current camera and light, so repeated fits
//! with unchanged inputs are bit-identical.

use glam::{Mat4, Vec3, Vec4};

use crate::errors::{Result, UmbraError};
use crate::renderer::settings::{NdcDepthRange, RendererSettings};
use crate::scene::camera::Camera;
use crate::scene::light::Light;

/// Light-space AABB of the camera frustum from the last fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpaceBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl LightSpaceBounds {
    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        Self { min, max }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, point: Vec3, tolerance: f32) -> bool {
        point.cmpge(self.min - tolerance).all() && point.cmple(self.max + tolerance).all()
    }

    /// Orthographic projection mapping the box onto the clip volume
    /// (`x, y ∈ [-1, 1]`, `z ∈ [0, 1]`).
    #[must_use]
    pub fn orthographic(&self) -> Mat4 {
        Mat4::orthographic_lh(
            self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z,
        )
    }
}

#[derive(Debug, Clone)]
pub struct ShadowFrustumFitter {
    pub world_up: Vec3,
    pub fallback_up: Vec3,
    pub basis_epsilon: f32,
    pub depth_range: NdcDepthRange,
}

impl Default for ShadowFrustumFitter {
    fn default() -> Self {
        Self::new(&RendererSettings::default())
    }
}

impl ShadowFrustumFitter {
    #[must_use]
    pub fn new(settings: &RendererSettings) -> Self {
        Self {
            world_up: settings.world_up,
            fallback_up: settings.fallback_up,
            basis_epsilon: settings.basis_epsilon,
            depth_range: settings.depth_range,
        }
    }

    /// Light-to-world rotation with columns `(x, y, z)`, `z` along the light.
    ///
    /// When the light is parallel to `world_up` the cross product vanishes and
    /// `fallback_up` is used instead. A zero or non-finite direction, or one
    /// parallel to both up vectors, is an error.
    pub fn light_basis(&self, direction: Vec3) -> Result<Mat4> {
        let degenerate = || UmbraError::DegenerateLightBasis { direction };

        if !direction.is_finite() || direction.length() < self.basis_epsilon {
            return Err(degenerate());
        }
        let z = direction.normalize();

        let mut x = z.cross(self.world_up);
        if x.length() < self.basis_epsilon {
            log::debug!(
                "Light direction {direction:?} parallel to world up, using fallback {:?}",
                self.fallback_up
            );
            x = z.cross(self.fallback_up);
            if x.length() < self.basis_epsilon {
                return Err(degenerate());
            }
        }
        let x = x.normalize();
        let y = x.cross(z);

        Ok(Mat4::from_cols(
            x.extend(0.0),
            y.extend(0.0),
            z.extend(0.0),
            Vec4::W,
        ))
    }

    /// World-space corners of the camera frustum, near face first.
    pub fn frustum_corners_world(&self, camera: &Camera) -> Result<[Vec3; 8]> {
        let view_proj = camera.view_projection();
        // Singular matrices show up as a non-finite inverse or corner.
        let inv_view_proj = view_proj.inverse();
        if !view_proj.is_finite() || !inv_view_proj.is_finite() {
            return Err(UmbraError::SingularCameraMatrix);
        }

        let (near, far) = self.depth_range.near_far();
        let mut corners = [Vec3::ZERO; 8];
        let mut i = 0;
        for z in [near, far] {
            for y in [-1.0, 1.0] {
                for x in [-1.0, 1.0] {
                    let clip = inv_view_proj * Vec4::new(x, y, z, 1.0);
                    corners[i] = clip.truncate() / clip.w;
                    i += 1;
                }
            }
        }

        if corners.iter().any(|c| !c.is_finite()) {
            return Err(UmbraError::SingularCameraMatrix);
        }
        Ok(corners)
    }

    /// Recomputes `light`'s light-space transform for `camera`.
    ///
    /// On error the light is left unchanged.
    pub fn fit(&self, light: &mut Light, camera: &Camera) -> Result<LightSpaceBounds> {
        let light_to_world = self.light_basis(light.direction)?;
        let world_to_light = light_to_world.inverse();

        let corners = self.frustum_corners_world(camera)?;
        let light_corners = corners.map(|c| world_to_light.transform_point3(c));
        let bounds = LightSpaceBounds::from_points(&light_corners);

        light.light_space_transform = bounds.orthographic() * world_to_light;
        Ok(bounds)
    }
}
