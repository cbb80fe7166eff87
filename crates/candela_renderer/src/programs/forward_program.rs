use flecs_ecs::prelude::*;
use wgpu::RenderPipeline;

use crate::{
    error::RenderInitError,
    material::GpuMaterial,
    mesh::{GpuGeometry, MeshInstance, Vertex},
    programs::{GpuProgram, GpuProgramRenderContext},
    shader_defs,
    texture::TextureHelper,
};

const COMMON_SRC: &str = include_str!("../shaders/common.wgsl");
const SHADING_SRC: &str = include_str!("../shaders/shading.wgsl");
const FORWARD_SRC: &str = include_str!("../shaders/forward.wgsl");

/// Single-pass clustered shading straight to the surface.
pub struct ForwardProgram {
    pipeline: RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub mesh_layout: wgpu::BindGroupLayout,
}

impl GpuProgram for ForwardProgram {
    type InitData = wgpu::BindGroupLayout;
    type DrawData<'a> = (
        &'a wgpu::BindGroup, // Global (Camera/Lights/Clusters) - Group 0
        &'a Query<(&'a MeshInstance, &'a GpuGeometry, &'a GpuMaterial)>,
    );

    fn new(
        ctx: &GpuProgramRenderContext,
        global_layout: &Self::InitData,
    ) -> Result<Self, RenderInitError> {
        let source = shader_defs::compose(
            &[COMMON_SRC, SHADING_SRC, FORWARD_SRC],
            &ctx.settings.shader_defs(),
        )?;
        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Forward Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let material_layout = create_material_layout(ctx.device);
        let mesh_layout = create_mesh_layout(ctx.device);

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Forward Pipeline Layout"),
                bind_group_layouts: &[global_layout, &material_layout, &mesh_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                cache: None,
                label: Some("Forward Pipeline"),
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
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
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
        })
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        let (global_bind_group, mesh_query) = data;

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, global_bind_group, &[]);

        record_geometry(render_pass, mesh_query);
    }
}

/// Draw loop shared with the G-buffer pass: same bind group slots, same
/// vertex layout.
pub fn record_geometry(
    render_pass: &mut wgpu::RenderPass<'_>,
    mesh_query: &Query<(&MeshInstance, &GpuGeometry, &GpuMaterial)>,
) {
    mesh_query.run(|mut iter| {
        while iter.next() {
            let instances = iter.field::<MeshInstance>(0);
            let geometries = iter.field::<GpuGeometry>(1);
            let materials = iter.field::<GpuMaterial>(2);

            for i in iter.iter() {
                render_pass.set_bind_group(1, &materials[i].bind_group, &[]);
                render_pass.set_bind_group(2, &instances[i].bind_group, &[]);
                render_pass.set_vertex_buffer(0, geometries[i].vertex_buffer.slice(..));
                render_pass.set_index_buffer(
                    geometries[i].index_buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                render_pass.draw_indexed(0..geometries[i].index_count, 0, 0..1);
            }
        }
    });
}

pub fn create_material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material Bind Group Layout"),
        entries: &[
            // --- BINDING 0: Material Settings ---
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

pub fn create_mesh_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Mesh Bind Group Layout"),
        entries: &[
            // --- BINDING 0: Model + normal matrices ---
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}
