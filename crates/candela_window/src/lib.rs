use candela_core::{App, Plugin};
use flecs_ecs::prelude::*;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ControlFlow, EventLoop},
    window::Window,
};

#[derive(Component)]
pub struct MainWindow(pub Window);

pub struct WindowPlugin;

impl Plugin for WindowPlugin {
    fn build(&self, app: &mut App) {
        app.world
            .component::<MainWindow>()
            .add_trait::<flecs::Singleton>();
    }
}

// The state machine that holds the App while waiting for the OS
struct CandelaRunner {
    app: App,
}

impl ApplicationHandler for CandelaRunner {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        let window = event_loop
            .create_window(Window::default_attributes().with_title("Candela"))
            .expect("failed to create the main window");

        self.app.world.set(MainWindow(window));
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested, stopping");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                // 1. Run the systems (the renderer hangs off pipeline phases)
                self.app.update();

                // 2. Request next frame
                self.app.world.get::<&MainWindow>(|window| {
                    window.0.request_redraw();
                });
            }
            _ => (),
        }
    }
}

pub fn run_candela_app(app: App) {
    let event_loop = EventLoop::new().expect("failed to create the event loop");

    // ControlFlow::Poll continuously runs the event loop, even if the OS hasn't
    // dispatched any events. This is ideal for games and similar applications.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = CandelaRunner { app };

    event_loop
        .run_app(&mut runner)
        .expect("event loop terminated with an error");
}
