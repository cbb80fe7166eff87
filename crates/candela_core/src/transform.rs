use flecs_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};

#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Makes the transform look at a target position.
    /// Mat4::look_at_rh builds a view matrix (inverse transform), so we invert
    /// it to get the object rotation that points -Z towards the target.
    pub fn looking_at(mut self, target: Vec3, up: Vec3) -> Self {
        let mat = Mat4::look_at_rh(self.translation, target, up);
        self.rotation = Quat::from_mat4(&mat.inverse());
        self
    }

    /// Creates the Model Matrix (Local -> World)
    pub fn compute_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Returns the "Forward" direction (-Z) relative to current rotation
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }
}

/// World-space matrix, refreshed from Transform every frame in PostUpdate.
#[derive(Component, Debug, Clone, Copy)]
pub struct GlobalTransform(pub Mat4);

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

pub fn register_transform_systems(world: &World) {
    world
        .system_named::<(&Transform, &mut GlobalTransform)>("propagate transforms")
        .kind(flecs::pipeline::PostUpdate)
        .each(|(transform, global)| {
            global.0 = transform.compute_matrix();
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looking_at_points_forward_towards_target() {
        let transform = Transform::from_xyz(0.0, 0.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y);
        let forward = transform.forward();
        assert!((forward - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn compute_matrix_applies_translation() {
        let transform = Transform::from_xyz(1.0, 2.0, 3.0);
        let world_pos = transform.compute_matrix().transform_point3(Vec3::ZERO);
        assert!((world_pos - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }
}
