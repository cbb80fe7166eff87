use wgpu::RenderPipeline;

use crate::{
    error::RenderInitError,
    programs::{GpuProgram, GpuProgramRenderContext, gbuffer_program::GBufferTargets},
    shader_defs,
};

const COMMON_SRC: &str = include_str!("../shaders/common.wgsl");
const SHADING_SRC: &str = include_str!("../shaders/shading.wgsl");
const RESOLVE_SRC: &str = include_str!("../shaders/resolve.wgsl");

/// Deferred pass 2: fullscreen triangle reading the G-buffer and running the
/// clustered shading loop against the surface.
pub struct ResolveProgram {
    pipeline: RenderPipeline,
    gbuffer_bind_group: wgpu::BindGroup,
}

impl GpuProgram for ResolveProgram {
    type InitData = (wgpu::BindGroupLayout, GBufferTargets);
    type DrawData<'a> = &'a wgpu::BindGroup; // Global - Group 0

    fn new(
        ctx: &GpuProgramRenderContext,
        (global_layout, targets): &Self::InitData,
    ) -> Result<Self, RenderInitError> {
        let source = shader_defs::compose(
            &[COMMON_SRC, SHADING_SRC, RESOLVE_SRC],
            &ctx.settings.shader_defs(),
        )?;
        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Resolve Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        // textureLoad only, so no sampler and no filterability requirement.
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
            },
            count: None,
        };

        let gbuffer_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("GBuffer Bind Group Layout"),
                entries: &[texture_entry(0), texture_entry(1), texture_entry(2)],
            });

        let gbuffer_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("GBuffer Bind Group"),
            layout: &gbuffer_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.position),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.normal),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&targets.albedo),
                },
            ],
        });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Resolve Pipeline Layout"),
                bind_group_layouts: &[global_layout, &gbuffer_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                cache: None,
                label: Some("Resolve Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                depth_stencil: None,
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        Ok(Self {
            pipeline,
            gbuffer_bind_group,
        })
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, data, &[]);
        render_pass.set_bind_group(1, &self.gbuffer_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}
