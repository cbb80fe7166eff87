//! Clustered light culling renderer.
//!
//! A compute pass bins point lights into a 3D partition of the view frustum
//! every frame; a forward pipeline and a deferred pipeline both consume the
//! resulting per-cluster light lists in their fragment stages.

use candela_core::{App, Plugin};
use flecs_ecs::prelude::*;

pub mod cluster;
pub mod error;
pub mod lights;
pub mod settings;

mod global_resources;
mod material;
mod mesh;
mod programs;
mod render;
mod shader_defs;
mod texture;

pub use error::{RenderInitError, SettingsError, ShaderDefError, SnapshotError};
pub use lights::{GpuLight, LightSet};
pub use render::{RenderContext, RenderTarget};
pub use settings::{PipelineMode, RenderSettings};

pub struct RenderPlugin {
    pub settings: RenderSettings,
}

impl RenderPlugin {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }
}

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.world
            .component::<RenderSettings>()
            .add_trait::<flecs::Singleton>();
        app.world.set(self.settings.clone());

        render::register_renderings(app);
        mesh::register_mesh_handlers(&app.world);
        material::register_material_handlers(&app.world);
    }
}
