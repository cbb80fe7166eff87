use flecs_ecs::prelude::*;
use std::mem;

use bytemuck::{Pod, Zeroable};
use candela_core::transform::GlobalTransform;
use candela_scene::MeshSource;
use wgpu::util::DeviceExt;

use crate::render::{MeshLayout, RenderContext};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    // Transpose(Inverse(Model)); keeps normals correct under non-uniform scale.
    pub normal_matrix: [[f32; 4]; 4],
}

impl MeshUniform {
    pub fn from_transform(global: &GlobalTransform) -> Self {
        let model_matrix = global.0;
        let normal_matrix = model_matrix.inverse().transpose();

        Self {
            model: model_matrix.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3, // position
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3, // normal
                },
                wgpu::VertexAttribute {
                    offset: (mem::size_of::<[f32; 3]>() * 2) as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2, // uv
                },
            ],
        }
    }
}

/// Per-entity model uniform and its bind group (group 2).
#[derive(Component)]
pub struct MeshInstance {
    pub bind_group: wgpu::BindGroup,
    pub buffer: wgpu::Buffer,
}

#[derive(Component)]
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

pub fn register_mesh_handlers(world: &World) {
    // Upload vertex/index data for entities that don't have GPU buffers yet.
    world
        .system_named::<(&MeshSource, &RenderContext)>("Init Mesh GPU buffers")
        .without(GpuGeometry::id())
        .kind(flecs::pipeline::OnStore)
        .each_entity(|entity, (mesh_source, context)| {
            let (v_buf, i_buf, count) = create_gpu_buffer(&context.device, mesh_source);

            entity.set(GpuGeometry {
                vertex_buffer: v_buf,
                index_buffer: i_buf,
                index_count: count,
            });
        });

    // Allocate the per-entity uniform once.
    world
        .system_named::<(&GlobalTransform, &RenderContext, &MeshLayout)>("Setup Meshes in GPU")
        .with(MeshSource::id())
        .without(MeshInstance::id())
        .kind(flecs::pipeline::OnUpdate)
        .each_entity(|entity, (global_transform, context, mesh_layout)| {
            let uniform = MeshUniform::from_transform(global_transform);

            let buffer = context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Uniform Buffer"),
                    contents: bytemuck::cast_slice(&[uniform]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });

            let bind_group = context
                .device
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Mesh Bind Group"),
                    layout: &mesh_layout.0,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });

            entity.set(MeshInstance { bind_group, buffer });
        });

    // Moved entities only need the cheap upload.
    world
        .system_named::<(&GlobalTransform, &MeshInstance, &RenderContext)>(
            "Setup Mesh in GPU on change",
        )
        .kind(flecs::pipeline::PostUpdate)
        .detect_changes()
        .each(|(global_transform, gpu_mesh, context)| {
            let uniform = MeshUniform::from_transform(global_transform);

            context
                .queue
                .write_buffer(&gpu_mesh.buffer, 0, bytemuck::cast_slice(&[uniform]));
        });
}

fn create_gpu_buffer(
    device: &wgpu::Device,
    source: &MeshSource,
) -> (wgpu::Buffer, wgpu::Buffer, u32) {
    let data = &source.0;
    let vertices: Vec<Vertex> = data
        .vertices
        .iter()
        .map(|v| Vertex {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        })
        .collect();

    let v_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh Vertex Buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let i_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh Index Buffer"),
        contents: bytemuck::cast_slice(&data.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    (v_buffer, i_buffer, data.indices.len() as u32)
}
