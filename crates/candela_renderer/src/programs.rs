pub mod forward_program;
pub mod gbuffer_program;
pub mod resolve_program;

pub use forward_program::ForwardProgram;
pub use gbuffer_program::GBufferProgram;
pub use resolve_program::ResolveProgram;

use crate::{error::RenderInitError, settings::RenderSettings};

/// Holds common WGPU references to simplify function signatures.
pub struct GpuProgramRenderContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub config: &'a wgpu::SurfaceConfiguration,
    pub settings: &'a RenderSettings,
}

pub trait GpuProgram: Sized {
    /// Data required to initialize the pipeline (e.g., global layouts)
    type InitData;

    /// Data required to draw a frame (e.g., bind groups, entity queries)
    type DrawData<'a>
    where
        Self: 'a;

    /// 1. INIT: Compiles shaders, creates pipeline layouts and the pipeline
    /// itself. Shader composition can fail, so this propagates.
    fn new(ctx: &GpuProgramRenderContext, init_data: &Self::InitData)
    -> Result<Self, RenderInitError>;

    /// 2. RECORD: Encodes commands into the RenderPass.
    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>);
}
