use flecs_ecs::prelude::*;

pub mod camera;
pub mod pipeline;
pub mod time;
pub mod transform;

use crate::{pipeline::define_pipeline_stages, time::Time, transform::register_transform_systems};

/// The Plugin Trait
/// Every module (Renderer, Window, Scene) must implement this.
pub trait Plugin {
    fn build(&self, app: &mut App);
}

/// The Engine Application
/// Holds the ECS world and orchestrates the loop.
pub struct App {
    pub world: World,
}

impl App {
    pub fn new() -> Self {
        let world = World::new();

        define_pipeline_stages(&world);

        world.component::<Time>().add_trait::<flecs::Singleton>();
        world.set(Time::default());

        register_transform_systems(&world);

        Self { world }
    }

    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        plugin.build(self);
        self
    }

    /// Processes ONE frame. The windowing system decides WHEN to run it.
    pub fn update(&mut self) {
        self.world.get::<&mut Time>(|time| time.update());
        self.world.progress();
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
