use flecs_ecs::macros::Component;
use glam::Mat4;

#[derive(Component, Clone, Debug)]
pub struct Camera {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 45.0f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Computes the "Projection Matrix" (World -> Screen).
    /// Aspect comes from the surface so resizes don't stretch the image.
    pub fn compute_projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
    }
}
