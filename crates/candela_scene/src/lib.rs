//! Procedural scene content: mesh/material descriptions the renderer turns
//! into GPU resources, plus the orbit camera used by the demo app.

use candela_core::{App, Plugin, camera::Camera, time::Time, transform::Transform};
use flecs_ecs::prelude::*;
use glam::Vec3;

pub mod shapes;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<SceneVertex>,
    pub indices: Vec<u32>,
}

/// CPU-side mesh description. The renderer picks these up and attaches
/// GPU buffers next to them.
#[derive(Component, Clone, Debug)]
pub struct MeshSource(pub MeshData);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialSettings {
    pub base_color: [f32; 4],
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[derive(Component, Clone, Copy, Debug)]
pub struct MaterialSource(pub MaterialSettings);

/// Circles the camera around the world origin at a fixed height.
#[derive(Component, Clone, Copy, Debug)]
pub struct OrbitCamera {
    pub radius: f32,
    pub height: f32,
    pub speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            radius: 18.0,
            height: 8.0,
            speed: 0.15,
        }
    }
}

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.world
            .system_named::<(&OrbitCamera, &mut Transform, &Time)>("orbit camera")
            .with(Camera::id())
            .kind(flecs::pipeline::OnUpdate)
            .each(|(orbit, transform, time)| {
                let angle = time.elapsed_seconds() * orbit.speed;
                transform.translation = Vec3::new(
                    angle.sin() * orbit.radius,
                    orbit.height,
                    angle.cos() * orbit.radius,
                );
                *transform = transform.looking_at(Vec3::ZERO, Vec3::Y);
            });
    }
}
