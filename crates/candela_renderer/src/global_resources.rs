use glam::{Mat4, Vec3};

/// Per-frame camera data. One buffer feeds the clustering kernel and every
/// render pass, so the cluster lookup and the rasterizer can never disagree.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
    pub screen_size: [f32; 2],
    pub near: f32,
    pub far: f32,
}

impl CameraUniform {
    pub fn new(
        view: Mat4,
        proj: Mat4,
        eye: Vec3,
        screen_size: [f32; 2],
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            view_proj: (proj * view).to_cols_array_2d(),
            position: [eye.x, eye.y, eye.z, 1.0],
            screen_size,
            near,
            far,
        }
    }
}

/// Group 0 for every render pass: camera uniform plus the light and cluster
/// storage buffers, read-only in the fragment stage.
pub struct GlobalResources {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    cam_buffer: wgpu::Buffer,
}

impl GlobalResources {
    /// The camera buffer is created before the rest because the clustering
    /// stage binds it separately; see `ClusterStage::new`.
    pub fn create_camera_buffer(device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn new(
        device: &wgpu::Device,
        cam_buffer: wgpu::Buffer,
        light_buffer: &wgpu::Buffer,
        cluster_buffer: &wgpu::Buffer,
    ) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Global Bind Group Layout"),
            entries: &[
                // --- BINDING 0: Camera ---
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // --- BINDING 1: Lights ---
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // --- BINDING 2: Clusters ---
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: cam_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: cluster_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            layout,
            bind_group,
            cam_buffer,
        }
    }

    pub fn camera_buffer(&self) -> &wgpu::Buffer {
        &self.cam_buffer
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, uniform: &CameraUniform) {
        queue.write_buffer(&self.cam_buffer, 0, bytemuck::bytes_of(uniform));
    }
}
