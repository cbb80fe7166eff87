use candela_scene::{MaterialSettings, MaterialSource};
use flecs_ecs::prelude::*;
use wgpu::util::DeviceExt;

use crate::render::{MaterialLayout, RenderContext};

#[derive(Component)]
pub struct GpuMaterial {
    pub bind_group: wgpu::BindGroup,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuMaterialUniform {
    pub base_color: [f32; 4],
}

impl From<MaterialSettings> for GpuMaterialUniform {
    fn from(s: MaterialSettings) -> Self {
        Self {
            base_color: s.base_color,
        }
    }
}

pub fn register_material_handlers(world: &World) {
    world
        .system_named::<(&MaterialSource, &RenderContext, &MaterialLayout)>(
            "Init Material GPU buffers",
        )
        .without(GpuMaterial::id())
        .kind(flecs::pipeline::OnStore)
        .each_entity(|entity, (source, context, mat_layout)| {
            let bind_group = create_material_bind_group(context, mat_layout, source);
            entity.set(GpuMaterial { bind_group });
        });
}

fn create_material_bind_group(
    context: &RenderContext,
    layout: &MaterialLayout,
    source: &MaterialSource,
) -> wgpu::BindGroup {
    let gpu_uniform = GpuMaterialUniform::from(source.0);
    let uniform_buffer = context
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Uniforms"),
            contents: bytemuck::cast_slice(&[gpu_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

    context
        .device
        .create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &layout.0,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        })
}
