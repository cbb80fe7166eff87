use candela_core::{
    App,
    camera::Camera,
    pipeline::{PhasePresent, PhaseRender3D},
    time::Time,
    transform::GlobalTransform,
};
use candela_window::MainWindow;
use flecs_ecs::prelude::*;
use glam::{Mat4, Vec3};
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};

use crate::{
    cluster::ClusterStage,
    error::RenderInitError,
    global_resources::{CameraUniform, GlobalResources},
    lights::LightSet,
    material::GpuMaterial,
    mesh::{GpuGeometry, MeshInstance},
    programs::{self, ForwardProgram, GBufferProgram, GpuProgram, ResolveProgram},
    settings::{PipelineMode, RenderSettings},
    texture::TextureHelper,
};

/// The consumer half of the renderer: either one clustered forward pass or
/// the G-buffer/resolve pair. Both read the same cluster buffer.
pub enum ScenePipeline {
    Forward(ForwardProgram),
    Deferred {
        gbuffer: GBufferProgram,
        resolve: ResolveProgram,
    },
}

impl ScenePipeline {
    fn material_layout(&self) -> &wgpu::BindGroupLayout {
        match self {
            ScenePipeline::Forward(program) => &program.material_layout,
            ScenePipeline::Deferred { gbuffer, .. } => &gbuffer.material_layout,
        }
    }

    fn mesh_layout(&self) -> &wgpu::BindGroupLayout {
        match self {
            ScenePipeline::Forward(program) => &program.mesh_layout,
            ScenePipeline::Deferred { gbuffer, .. } => &gbuffer.mesh_layout,
        }
    }
}

#[derive(Component)]
pub struct RenderContext {
    pub device: Device,
    pub queue: Queue,
    pub surface: Surface<'static>,
    pub config: SurfaceConfiguration,
    pub depth_texture: wgpu::TextureView,

    pub global_resources: GlobalResources,
    pub lights: LightSet,
    pub clusters: ClusterStage,
    pub pipeline: ScenePipeline,

    settings: RenderSettings,
}

#[derive(Component, Default)]
pub struct RenderTarget {
    pub view: Option<wgpu::TextureView>,
    pub texture: Option<wgpu::SurfaceTexture>,
}

#[derive(Component)]
pub struct MaterialLayout(pub wgpu::BindGroupLayout);

#[derive(Component)]
pub struct MeshLayout(pub wgpu::BindGroupLayout);

pub fn register_renderings(app: &mut App) {
    app.world
        .component::<RenderTarget>()
        .add_trait::<flecs::Singleton>()
        .set(RenderTarget::default());
    app.world
        .component::<RenderContext>()
        .add_trait::<flecs::Singleton>();
    app.world
        .component::<MaterialLayout>()
        .add_trait::<flecs::Singleton>();
    app.world
        .component::<MeshLayout>()
        .add_trait::<flecs::Singleton>();

    app.world
        .system_named::<(&MainWindow, &RenderSettings)>("init renderer")
        .kind(flecs::pipeline::OnStart)
        .write(MainWindow::id())
        .run(|mut iter| {
            let world = iter.world();
            while iter.next() {
                let windows = iter.field::<MainWindow>(0);
                let settings_field = iter.field::<RenderSettings>(1);
                let (Some(window), Some(settings)) = (windows.get(0), settings_field.get(0))
                else {
                    continue;
                };

                log::info!("initializing GPU context");
                let context = init_render_context(&window.0, settings).unwrap_or_else(|error| {
                    panic!("renderer initialization failed: {error}");
                });
                log::info!(
                    "pipelines compiled ({} clusters, {} active lights)",
                    context.clusters_total(),
                    context.lights.active_count()
                );

                world.set(MaterialLayout(context.pipeline.material_layout().clone()));
                world.set(MeshLayout(context.pipeline.mesh_layout().clone()));
                world.set(context);
            }
        });

    app.world
        .system_named::<(&RenderContext, &mut RenderTarget)>("start frame")
        .kind(flecs::pipeline::PreStore)
        .each(|(context, target)| {
            // A failed acquire (e.g. mid-resize) just skips this frame.
            if let Ok(frame) = context.surface.get_current_texture() {
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());

                target.texture = Some(frame);
                target.view = Some(view);
            }
        });

    let mesh_query = app
        .world
        .query::<(&MeshInstance, &GpuGeometry, &GpuMaterial)>()
        .set_cached()
        .build();

    app.world
        .system::<(
            &Camera,
            &GlobalTransform,
            &mut RenderContext,
            &mut RenderTarget,
            &Time,
        )>()
        .named("Render Frame")
        .kind(PhaseRender3D)
        .each(move |(cam, cam_t, context, target, time)| {
            let Some(surface_view) = target.view.as_ref() else {
                return;
            };

            // View matrix: move the world opposite to the camera.
            let eye = cam_t.0.transform_point3(Vec3::ZERO);
            let forward = -cam_t.0.z_axis.truncate();
            let up = cam_t.0.y_axis.truncate();
            let view = Mat4::look_at_rh(eye, eye + forward, up);

            let aspect = context.config.width as f32 / context.config.height as f32;
            let proj = cam.compute_projection_matrix(aspect);

            let uniform = CameraUniform::new(
                view,
                proj,
                eye,
                [context.config.width as f32, context.config.height as f32],
                cam.near,
                cam.far,
            );
            context.global_resources.update_camera(&context.queue, &uniform);

            let mut encoder = context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

            // Compute first: light motion, then the cluster assignment both
            // consumer paths read.
            let dt = time.delta_seconds();
            let RenderContext {
                queue,
                lights,
                clusters,
                pipeline,
                global_resources,
                depth_texture,
                ..
            } = context;
            lights.advance(queue, &mut encoder, dt);
            clusters.encode(&mut encoder);

            match pipeline {
                ScenePipeline::Forward(program) => {
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Forward Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: surface_view,
                            resolve_target: None,
                            depth_slice: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: depth_texture,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        ..Default::default()
                    });

                    program.record(
                        &mut render_pass,
                        (&global_resources.bind_group, &mesh_query),
                    );
                }
                ScenePipeline::Deferred { gbuffer, resolve } => {
                    {
                        let attachment = |view| {
                            Some(wgpu::RenderPassColorAttachment {
                                view,
                                resolve_target: None,
                                depth_slice: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                                    store: wgpu::StoreOp::Store,
                                },
                            })
                        };
                        let mut gbuffer_pass =
                            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                                label: Some("GBuffer Pass"),
                                color_attachments: &[
                                    attachment(&gbuffer.targets.position),
                                    attachment(&gbuffer.targets.normal),
                                    attachment(&gbuffer.targets.albedo),
                                ],
                                depth_stencil_attachment: Some(
                                    wgpu::RenderPassDepthStencilAttachment {
                                        view: depth_texture,
                                        depth_ops: Some(wgpu::Operations {
                                            load: wgpu::LoadOp::Clear(1.0),
                                            store: wgpu::StoreOp::Store,
                                        }),
                                        stencil_ops: None,
                                    },
                                ),
                                ..Default::default()
                            });

                        gbuffer.record(
                            &mut gbuffer_pass,
                            (&global_resources.bind_group, &mesh_query),
                        );
                    }

                    let mut resolve_pass =
                        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("Resolve Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: surface_view,
                                resolve_target: None,
                                depth_slice: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        });

                    resolve.record(&mut resolve_pass, &global_resources.bind_group);
                }
            }

            if context.settings.capture_cluster_snapshot {
                context.clusters.copy_snapshot(&mut encoder);
            }

            context.queue.submit(std::iter::once(encoder.finish()));

            if context.settings.capture_cluster_snapshot {
                let RenderContext {
                    device, clusters, ..
                } = context;
                match clusters.map_snapshot(device) {
                    Ok(snapshot) => {
                        let populated = snapshot
                            .clusters
                            .iter()
                            .filter(|cluster| cluster.light_count > 0)
                            .count();
                        log::debug!(
                            "cluster snapshot: {} clusters, {populated} populated",
                            snapshot.cluster_count
                        );
                    }
                    Err(error) => log::warn!("cluster snapshot failed: {error}"),
                }
                clusters.unmap_snapshot();
            }
        });

    app.world
        .system_named::<&mut RenderTarget>("end frame")
        .kind(PhasePresent)
        .each(|target| {
            if let Some(frame) = target.texture.take() {
                frame.present();
            }
            target.view = None;
        });
}

impl RenderContext {
    fn clusters_total(&self) -> u32 {
        self.settings.cluster_count()
    }
}

fn init_render_context(
    window: &winit::window::Window,
    settings: &RenderSettings,
) -> Result<RenderContext, RenderInitError> {
    settings.validate()?;

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

    // UNSAFE: the window outlives the surface; the runner keeps it alive for
    // the whole session.
    let surface = unsafe {
        instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::from_window(window)?)
    }?;

    // 'pollster' blocks on the async adapter/device futures inside this
    // sync system.
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))?;

    let (device, queue) =
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))?;

    let size = window.inner_size();
    let caps = surface.get_capabilities(&adapter);
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: caps.formats[0],
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::Fifo, // VSync On
        desired_maximum_frame_latency: 2,
        alpha_mode: caps.alpha_modes[0],
        view_formats: vec![],
    };
    surface.configure(&device, &config);

    let depth_texture = TextureHelper::create_depth_texture(&device, &config, "Depth Texture");

    // The camera buffer feeds both the clustering kernel and the render
    // passes, so it is created before either side.
    let camera_buffer = GlobalResources::create_camera_buffer(&device);
    let lights = LightSet::new(&device, &queue, settings)?;
    let clusters = ClusterStage::new(&device, &queue, settings, &camera_buffer, lights.buffer())?;
    let global_resources =
        GlobalResources::new(&device, camera_buffer, lights.buffer(), clusters.buffer());

    let program_context = programs::GpuProgramRenderContext {
        device: &device,
        queue: &queue,
        config: &config,
        settings,
    };

    let pipeline = match settings.mode {
        PipelineMode::Forward => {
            ScenePipeline::Forward(ForwardProgram::new(&program_context, &global_resources.layout)?)
        }
        PipelineMode::Deferred => {
            let gbuffer = GBufferProgram::new(&program_context, &global_resources.layout)?;
            let resolve = ResolveProgram::new(
                &program_context,
                &(global_resources.layout.clone(), gbuffer.targets.clone()),
            )?;
            ScenePipeline::Deferred { gbuffer, resolve }
        }
    };

    Ok(RenderContext {
        device,
        queue,
        surface,
        config,
        depth_texture,
        global_resources,
        lights,
        clusters,
        pipeline,
        settings: settings.clone(),
    })
}
