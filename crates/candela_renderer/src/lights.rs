//! The shared light array: a storage buffer holding a 16-byte header
//! (`active_count`) followed by `max_lights` records, plus the compute pass
//! that animates the active prefix every frame.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::{
    error::RenderInitError,
    settings::RenderSettings,
    shader_defs,
};

const COMMON_SRC: &str = include_str!("shaders/common.wgsl");
const MOVE_LIGHTS_SRC: &str = include_str!("shaders/move_lights.wgsl");

pub const LIGHT_HEADER_SIZE: u64 = 16;
const TAU: f32 = std::f32::consts::TAU;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 4], // xyz used
    pub color: [f32; 4],    // xyz used
}

pub struct LightSet {
    active_count: u32,
    move_workgroup_size: u32,
    time: f32,
    buffer: wgpu::Buffer,
    time_buffer: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

impl LightSet {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        settings: &RenderSettings,
    ) -> Result<Self, RenderInitError> {
        let active_count = settings.active_light_count();
        let size = LIGHT_HEADER_SIZE + settings.max_lights as u64 * size_of::<GpuLight>() as u64;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Colors are fixed at creation; positions come entirely from the
        // motion kernel.
        let records: Vec<GpuLight> = (0..settings.max_lights)
            .map(|index| {
                let color = hue_to_rgb(hash01(index)) * settings.light_intensity;
                GpuLight {
                    position: [0.0, 0.0, 0.0, 1.0],
                    color: [color.x, color.y, color.z, 0.0],
                }
            })
            .collect();
        queue.write_buffer(&buffer, 0, &active_count.to_le_bytes());
        queue.write_buffer(&buffer, LIGHT_HEADER_SIZE, bytemuck::cast_slice(&records));

        let time_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Time Buffer"),
            size: 4,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let source =
            shader_defs::compose(&[COMMON_SRC, MOVE_LIGHTS_SRC], &settings.shader_defs())?;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Move Lights Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Move Lights Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Move Lights Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: time_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Move Lights Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Move Lights Pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            active_count,
            move_workgroup_size: settings.move_workgroup_size,
            time: 0.0,
            buffer,
            time_buffer,
            pipeline,
            bind_group,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn active_count(&self) -> u32 {
        self.active_count
    }

    /// Advances simulation time and encodes the motion pass over the active
    /// prefix. Embarrassingly parallel; nothing here can fail.
    pub fn advance(&mut self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, dt: f32) {
        self.time += dt;
        queue.write_buffer(&self.time_buffer, 0, &self.time.to_le_bytes());

        let groups = self.active_count.div_ceil(self.move_workgroup_size);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Move Lights Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(groups.max(1), 1, 1);
    }
}

/// Same hash the WGSL side uses; keeps light placement predictable from the
/// host.
pub fn hash01(index: u32) -> f32 {
    let x = (index as f32 * 12.9898).sin() * 43758.5453;
    // x - floor(x), like WGSL fract(); Rust's f32::fract keeps the sign.
    x - x.floor()
}

/// Hue wheel sample lerped toward white, matching the creation-time palette.
pub fn hue_to_rgb(hue: f32) -> Vec3 {
    let f = |n: f32| {
        let k = (n + hue * 6.0) % 6.0;
        1.0 - k.min(4.0 - k).clamp(0.0, 1.0)
    };
    Vec3::ONE.lerp(Vec3::new(f(5.0), f(3.0), f(1.0)), 0.8)
}

/// CPU mirror of the motion kernel in `move_lights.wgsl`.
pub fn light_position(index: u32, time: f32, settings: &RenderSettings) -> Vec3 {
    let min = Vec3::from_array(settings.light_bounds_min);
    let max = Vec3::from_array(settings.light_bounds_max);
    let extent = max - min;

    let anchor_x = hash01(index * 3);
    let phase = hash01(index * 3 + 1) * TAU;
    let anchor_z = hash01(index * 3 + 2);

    let bob = 0.5 + 0.5 * (time * settings.light_speed * TAU + phase).sin();

    Vec3::new(
        min.x + anchor_x * extent.x,
        min.y + bob * extent.y,
        min.z + anchor_z * extent.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash01_stays_in_unit_interval() {
        for index in 0..10_000 {
            let h = hash01(index);
            assert!((0.0..1.0).contains(&h), "hash01({index}) = {h}");
        }
    }

    #[test]
    fn hue_wheel_stays_in_unit_cube() {
        for step in 0..=100 {
            let color = hue_to_rgb(step as f32 / 100.0);
            for channel in [color.x, color.y, color.z] {
                assert!((0.0..=1.0).contains(&channel));
            }
        }
    }

    #[test]
    fn hue_extremes_are_reddish() {
        // Hue 0 and hue 1 are the same point on the wheel.
        let a = hue_to_rgb(0.0);
        let b = hue_to_rgb(1.0);
        assert!((a - b).length() < 1e-5);
        assert!(a.x > a.y && a.x > a.z);
    }

    #[test]
    fn light_positions_stay_inside_bounds() {
        let settings = RenderSettings::default();
        let min = Vec3::from_array(settings.light_bounds_min);
        let max = Vec3::from_array(settings.light_bounds_max);

        for index in 0..256 {
            for time in [0.0, 0.37, 2.5, 1000.0] {
                let p = light_position(index, time, &settings);
                assert!(p.cmpge(min - 1e-3).all(), "light {index} at {time}: {p}");
                assert!(p.cmple(max + 1e-3).all(), "light {index} at {time}: {p}");
            }
        }
    }

    #[test]
    fn anchors_differ_between_lights() {
        let settings = RenderSettings::default();
        let a = light_position(0, 0.0, &settings);
        let b = light_position(1, 0.0, &settings);
        assert!((a.x - b.x).abs() > 1e-3 || (a.z - b.z).abs() > 1e-3);
    }
}
