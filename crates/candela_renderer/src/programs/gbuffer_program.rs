use flecs_ecs::prelude::*;
use wgpu::RenderPipeline;

use crate::{
    error::RenderInitError,
    material::GpuMaterial,
    mesh::{GpuGeometry, MeshInstance, Vertex},
    programs::{
        GpuProgram, GpuProgramRenderContext,
        forward_program::{create_material_layout, create_mesh_layout, record_geometry},
    },
    shader_defs,
    texture::TextureHelper,
};

const COMMON_SRC: &str = include_str!("../shaders/common.wgsl");
const GBUFFER_SRC: &str = include_str!("../shaders/gbuffer.wgsl");

/// The three attachments pass 1 writes and pass 2 samples.
#[derive(Clone)]
pub struct GBufferTargets {
    pub position: wgpu::TextureView,
    pub normal: wgpu::TextureView,
    pub albedo: wgpu::TextureView,
}

impl GBufferTargets {
    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        Self {
            position: TextureHelper::create_target(
                device,
                config,
                TextureHelper::GBUFFER_VEC_FORMAT,
                "GBuffer Position",
            ),
            normal: TextureHelper::create_target(
                device,
                config,
                TextureHelper::GBUFFER_VEC_FORMAT,
                "GBuffer Normal",
            ),
            albedo: TextureHelper::create_target(
                device,
                config,
                TextureHelper::GBUFFER_ALBEDO_FORMAT,
                "GBuffer Albedo",
            ),
        }
    }
}

/// Deferred pass 1: geometry attributes only, no lighting.
pub struct GBufferProgram {
    pipeline: RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub mesh_layout: wgpu::BindGroupLayout,
    pub targets: GBufferTargets,
}

impl GpuProgram for GBufferProgram {
    type InitData = wgpu::BindGroupLayout;
    type DrawData<'a> = (
        &'a wgpu::BindGroup,
        &'a Query<(&'a MeshInstance, &'a GpuGeometry, &'a GpuMaterial)>,
    );

    fn new(
        ctx: &GpuProgramRenderContext,
        global_layout: &Self::InitData,
    ) -> Result<Self, RenderInitError> {
        let source =
            shader_defs::compose(&[COMMON_SRC, GBUFFER_SRC], &ctx.settings.shader_defs())?;
        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("GBuffer Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let material_layout = create_material_layout(ctx.device);
        let mesh_layout = create_mesh_layout(ctx.device);

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("GBuffer Pipeline Layout"),
                bind_group_layouts: &[global_layout, &material_layout, &mesh_layout],
                push_constant_ranges: &[],
            });

        let color_target = |format| {
            Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })
        };

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                cache: None,
                label: Some("GBuffer Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::desc()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[
                        color_target(TextureHelper::GBUFFER_VEC_FORMAT),
                        color_target(TextureHelper::GBUFFER_VEC_FORMAT),
                        color_target(TextureHelper::GBUFFER_ALBEDO_FORMAT),
                    ],
                }),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: TextureHelper::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        Ok(Self {
            pipeline,
            material_layout,
            mesh_layout,
            targets: GBufferTargets::new(ctx.device, ctx.config),
        })
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        let (global_bind_group, mesh_query) = data;

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, global_bind_group, &[]);

        record_geometry(render_pass, mesh_query);
    }
}
