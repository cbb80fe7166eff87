//! View-frustum cluster grid and the per-frame light assignment that fills it.
//!
//! The GPU kernel in `shaders/clustering.wgsl` is the production path; the
//! `reference` module reproduces it on the CPU so its behavior is testable
//! without a device.

pub mod grid;
pub mod layout;
pub mod readback;
pub mod reference;
pub mod stage;

pub use grid::{Aabb, ClusterCamera, ClusterGrid};
pub use layout::{ClusterRecord, ClusterSnapshot, cluster_buffer_size, cluster_stride};
pub use readback::ClusterReadback;
pub use stage::ClusterStage;
