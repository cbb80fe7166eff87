//! Host-visible shadow of the cluster buffer, for inspecting what the kernel
//! actually wrote. Strictly a debug path; nothing in the frame loop depends
//! on it.

use std::sync::mpsc;

use crate::{
    cluster::layout::{ClusterSnapshot, decode_clusters},
    error::SnapshotError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MapState {
    Unmapped,
    Mapped,
}

pub struct ClusterReadback {
    staging: wgpu::Buffer,
    size: u64,
    capacity: u32,
    state: MapState,
}

impl ClusterReadback {
    pub fn new(device: &wgpu::Device, size: u64, capacity: u32) -> Self {
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cluster Snapshot Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            staging,
            size,
            capacity,
            state: MapState::Unmapped,
        }
    }

    /// Encodes the device-side copy into the staging buffer. Must be followed
    /// by a submit before `map_result` sees the data.
    pub fn copy_result(&self, encoder: &mut wgpu::CommandEncoder, source: &wgpu::Buffer) {
        encoder.copy_buffer_to_buffer(source, 0, &self.staging, 0, self.size);
    }

    /// Maps the staging buffer, blocking until the device signals completion,
    /// and decodes it. The buffer stays mapped until `unmap` so repeated
    /// reads are cheap; mapping again before that is a usage error.
    pub fn map_result(&mut self, device: &wgpu::Device) -> Result<ClusterSnapshot, SnapshotError> {
        if self.state != MapState::Unmapped {
            return Err(SnapshotError::AlreadyMapped);
        }

        let (sender, receiver) = mpsc::channel();
        self.staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });

        device.poll(wgpu::PollType::wait_indefinitely())?;

        match receiver.try_recv() {
            Ok(Ok(())) => {
                self.state = MapState::Mapped;
                let data = self.staging.slice(..).get_mapped_range();
                let snapshot = decode_clusters(&data, self.capacity);
                drop(data);
                Ok(snapshot)
            }
            Ok(Err(error)) => Err(SnapshotError::MapFailed(error)),
            Err(_) => Err(SnapshotError::Cancelled),
        }
    }

    pub fn unmap(&mut self) {
        if self.state == MapState::Mapped {
            self.staging.unmap();
            self.state = MapState::Unmapped;
        }
    }
}
