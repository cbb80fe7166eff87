use wgpu::{
    Device, Extent3d, SurfaceConfiguration, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages,
};

pub struct TextureHelper;

impl TextureHelper {
    pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float; // Standard depth format

    /// G-buffer attachments carry world-space positions and normals, so they
    /// need the extra range of a float format.
    pub const GBUFFER_VEC_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
    pub const GBUFFER_ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

    pub fn create_depth_texture(
        device: &Device,
        config: &SurfaceConfiguration,
        label: &str,
    ) -> wgpu::TextureView {
        Self::create_target(device, config, Self::DEPTH_FORMAT, label)
    }

    /// Render target that can also be sampled in a later pass.
    pub fn create_target(
        device: &Device,
        config: &SurfaceConfiguration,
        format: TextureFormat,
        label: &str,
    ) -> wgpu::TextureView {
        let size = Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };

        let desc = TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        };

        let texture = device.create_texture(&desc);
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}
