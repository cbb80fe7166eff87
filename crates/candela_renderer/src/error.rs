use thiserror::Error;

/// Fatal setup failures. Anything here aborts startup; there is no point in
/// limping along without a device or a compiled pipeline.
#[derive(Debug, Error)]
pub enum RenderInitError {
    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] wgpu::rwh::HandleError),

    #[error("failed to create rendering surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to acquire GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("shader composition failed: {0}")]
    Shader(#[from] ShaderDefError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Rejected `RenderSettings` values. Everything here would otherwise surface
/// later as a zero-division panic or an invalid shader constant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("cluster grid dimensions must all be non-zero, got {dims:?}")]
    ZeroGridDim { dims: [u32; 3] },

    #[error("cluster_capacity must be non-zero")]
    ZeroCapacity,

    #[error("{name} must be non-zero")]
    ZeroWorkgroup { name: &'static str },
}

/// Raised while substituting `{{name}}` constants into WGSL sources.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShaderDefError {
    #[error("shader references undefined constant `{name}`")]
    UnknownConstant { name: String },

    #[error("unterminated `{{{{` marker in shader source")]
    Unterminated,
}

/// Errors on the cluster snapshot debug path. These are reported to the
/// caller; the renderer itself keeps going.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("cluster snapshot buffer is already mapped or a map is pending")]
    AlreadyMapped,

    #[error("device poll failed while waiting for the snapshot map: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("mapping the cluster snapshot buffer failed: {0}")]
    MapFailed(#[from] wgpu::BufferAsyncError),

    #[error("snapshot map callback was dropped before completing")]
    Cancelled,
}
