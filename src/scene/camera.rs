use glam::{Mat3, Mat4, Quat, Vec3};

/// Viewer position, orientation and projection.
///
/// The view matrix is cached and recomputed whenever position or orientation
/// change. Projections follow wgpu's `[0, 1]` depth convention unless one is
/// installed with [`Camera::set_projection`].
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    orientation: Quat,
    view: Mat4,
    projection: Mat4,
}

impl Camera {
    /// `fovy` in radians.
    #[must_use]
    pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Mat4::perspective_rh(fovy, aspect, near, far))
    }

    #[must_use]
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Mat4::orthographic_rh(left, right, bottom, top, near, far))
    }

    #[must_use]
    pub fn with_projection(projection: Mat4) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            view: Mat4::IDENTITY,
            projection,
        }
    }

    fn update_view(&mut self) {
        // View = inverse of the camera's world transform
        self.view = Mat4::from_rotation_translation(self.orientation, self.position).inverse();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
        self.update_view();
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// Turns the camera to face `target`. Does nothing when `target` is the
    /// camera position or lies along `up`.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        if forward.cross(up).length_squared() < 1e-4 {
            return;
        }

        let right = forward.cross(up).normalize();
        let new_up = right.cross(forward).normalize();

        // Camera looks down -Z
        let rotation = Mat3::from_cols(right, new_up, -forward);
        self.set_orientation(Quat::from_mat3(&rotation));
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    #[inline]
    #[must_use]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    #[inline]
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// `projection · view`
    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}
