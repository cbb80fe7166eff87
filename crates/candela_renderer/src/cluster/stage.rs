//! GPU side of the clustering pass: the storage buffer, the compute pipeline
//! and the per-frame dispatch.

use crate::{
    cluster::{
        grid::ClusterGrid,
        layout::{ClusterSnapshot, cluster_buffer_size},
        readback::ClusterReadback,
    },
    error::{RenderInitError, SnapshotError},
    settings::RenderSettings,
    shader_defs,
};

const COMMON_SRC: &str = include_str!("../shaders/common.wgsl");
const CLUSTERING_SRC: &str = include_str!("../shaders/clustering.wgsl");

pub struct ClusterStage {
    grid: ClusterGrid,
    workgroup_size: u32,
    buffer: wgpu::Buffer,
    readback: ClusterReadback,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

impl ClusterStage {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        settings: &RenderSettings,
        camera_buffer: &wgpu::Buffer,
        light_buffer: &wgpu::Buffer,
    ) -> Result<Self, RenderInitError> {
        let grid = ClusterGrid::new(settings.grid_dims);
        let size = cluster_buffer_size(grid.cluster_count(), settings.cluster_capacity);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cluster Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Header: the cluster count never changes at runtime, so the host
        // writes it once here. The kernel only touches the records.
        queue.write_buffer(&buffer, 0, &grid.cluster_count().to_le_bytes());

        let readback = ClusterReadback::new(device, size, settings.cluster_capacity);

        let source = shader_defs::compose(&[COMMON_SRC, CLUSTERING_SRC], &settings.shader_defs())?;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Clustering Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Clustering Bind Group Layout"),
            entries: &[
                // --- BINDING 0: Lights (read) ---
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // --- BINDING 1: Clusters (read/write) ---
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // --- BINDING 2: Camera ---
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
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
            label: Some("Clustering Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: camera_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Clustering Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Clustering Pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            grid,
            workgroup_size: settings.cluster_workgroup_size,
            buffer,
            readback,
            pipeline,
            bind_group,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// One thread per cluster; the buffer is fully overwritten each dispatch.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
        let wg = self.workgroup_size;
        let groups = [
            self.grid.dims[0].div_ceil(wg),
            self.grid.dims[1].div_ceil(wg),
            self.grid.dims[2].div_ceil(wg),
        ];

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Clustering Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
    }

    pub fn copy_snapshot(&self, encoder: &mut wgpu::CommandEncoder) {
        self.readback.copy_result(encoder, &self.buffer);
    }

    pub fn map_snapshot(&mut self, device: &wgpu::Device) -> Result<ClusterSnapshot, SnapshotError> {
        self.readback.map_result(device)
    }

    pub fn unmap_snapshot(&mut self) {
        self.readback.unmap();
    }
}
