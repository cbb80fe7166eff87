use candela_core::{App, camera::Camera, transform::{GlobalTransform, Transform}};
use candela_renderer::{RenderPlugin, RenderSettings};
use candela_scene::{MaterialSettings, MaterialSource, MeshSource, OrbitCamera, ScenePlugin, shapes};
use candela_window::{WindowPlugin, run_candela_app};
use flecs_ecs::prelude::*;
use glam::Vec3;

const SETTINGS_PATH: &str = "candela.json";

fn main() {
    env_logger::init();

    let settings = load_settings();
    log::info!(
        "starting in {:?} mode, {} clusters",
        settings.mode,
        settings.cluster_count()
    );

    let mut app = App::new();
    app.add_plugin(WindowPlugin);
    app.add_plugin(ScenePlugin);
    app.add_plugin(RenderPlugin::new(settings));

    setup_scene(&app.world);

    run_candela_app(app);
}

fn load_settings() -> RenderSettings {
    match std::fs::read_to_string(SETTINGS_PATH) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(error) => {
                log::warn!("invalid {SETTINGS_PATH}, using defaults: {error}");
                RenderSettings::default()
            }
        },
        Err(_) => RenderSettings::default(),
    }
}

fn setup_scene(world: &World) {
    world
        .entity_named("main camera")
        .set(Camera::default())
        .set(OrbitCamera::default())
        .set(Transform::from_xyz(0.0, 8.0, 18.0).looking_at(Vec3::ZERO, Vec3::Y))
        .set(GlobalTransform::default());

    // Floor
    world
        .entity_named("floor")
        .set(MeshSource(shapes::plane(14.0)))
        .set(MaterialSource(MaterialSettings {
            base_color: [0.6, 0.6, 0.6, 1.0],
        }))
        .set(Transform::default())
        .set(GlobalTransform::default());

    // A grid of boxes for the lights to wander between.
    for row in 0..6 {
        for col in 0..6 {
            let x = (col as f32 - 2.5) * 4.0;
            let z = (row as f32 - 2.5) * 4.0;
            let height = 1.0 + ((row * 6 + col) % 4) as f32;

            world
                .entity()
                .set(MeshSource(shapes::cuboid(Vec3::new(1.0, height, 1.0))))
                .set(MaterialSource(MaterialSettings {
                    base_color: [0.8, 0.75, 0.7, 1.0],
                }))
                .set(Transform::from_xyz(x, height, z))
                .set(GlobalTransform::default());
        }
    }
}
