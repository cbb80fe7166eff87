//! Binary layout of the cluster buffer. This is a bit-exact contract with the
//! WGSL side: a 16-byte header (`cluster_count: u32` + padding) followed by
//! one fixed-stride record per cluster.
//!
//! Record layout, stride = align16(36 + 4 * capacity):
//!   min_bound: vec4<f32>            16 B
//!   max_bound: vec4<f32>            16 B
//!   light_count: u32                 4 B
//!   light_indices: [u32; capacity]   4 * capacity B
//!   zero padding to the stride
//!
//! With the default capacity of 100 the stride is 448 bytes.

pub const CLUSTER_HEADER_SIZE: u64 = 16;

pub fn cluster_stride(capacity: u32) -> u64 {
    let raw = 36 + 4 * capacity as u64;
    (raw + 15) & !15
}

pub fn cluster_buffer_size(cluster_count: u32, capacity: u32) -> u64 {
    CLUSTER_HEADER_SIZE + cluster_count as u64 * cluster_stride(capacity)
}

/// One decoded cluster. `light_indices` always holds `capacity` entries; only
/// the first `light_count` are meaningful.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRecord {
    pub min_bound: [f32; 4],
    pub max_bound: [f32; 4],
    pub light_count: u32,
    pub light_indices: Vec<u32>,
}

impl ClusterRecord {
    pub fn empty(capacity: u32) -> Self {
        Self {
            min_bound: [0.0; 4],
            max_bound: [0.0; 4],
            light_count: 0,
            light_indices: vec![0; capacity as usize],
        }
    }

    /// The live prefix of the index list.
    pub fn indices(&self) -> &[u32] {
        &self.light_indices[..self.light_count as usize]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClusterSnapshot {
    pub cluster_count: u32,
    pub capacity: u32,
    pub clusters: Vec<ClusterRecord>,
}

pub fn encode_clusters(snapshot: &ClusterSnapshot) -> Vec<u8> {
    let stride = cluster_stride(snapshot.capacity) as usize;
    let mut bytes = vec![0u8; cluster_buffer_size(snapshot.cluster_count, snapshot.capacity) as usize];

    bytes[0..4].copy_from_slice(&snapshot.cluster_count.to_le_bytes());

    for (i, record) in snapshot.clusters.iter().enumerate() {
        let base = CLUSTER_HEADER_SIZE as usize + i * stride;
        bytes[base..base + 16].copy_from_slice(bytemuck::cast_slice(&record.min_bound));
        bytes[base + 16..base + 32].copy_from_slice(bytemuck::cast_slice(&record.max_bound));
        bytes[base + 32..base + 36].copy_from_slice(&record.light_count.to_le_bytes());
        let indices = bytemuck::cast_slice::<u32, u8>(&record.light_indices);
        bytes[base + 36..base + 36 + indices.len()].copy_from_slice(indices);
    }

    bytes
}

/// Inverse of `encode_clusters`. The mapped staging buffer has no alignment
/// guarantee, so all reads go through unaligned casts.
pub fn decode_clusters(bytes: &[u8], capacity: u32) -> ClusterSnapshot {
    let cluster_count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let stride = cluster_stride(capacity) as usize;

    let clusters = (0..cluster_count as usize)
        .map(|i| {
            let base = CLUSTER_HEADER_SIZE as usize + i * stride;
            let min_bound = bytemuck::pod_read_unaligned::<[f32; 4]>(&bytes[base..base + 16]);
            let max_bound = bytemuck::pod_read_unaligned::<[f32; 4]>(&bytes[base + 16..base + 32]);
            let light_count =
                bytemuck::pod_read_unaligned::<u32>(&bytes[base + 32..base + 36]);
            let light_indices = (0..capacity as usize)
                .map(|n| {
                    let at = base + 36 + n * 4;
                    bytemuck::pod_read_unaligned::<u32>(&bytes[at..at + 4])
                })
                .collect();
            ClusterRecord {
                min_bound,
                max_bound,
                light_count,
                light_indices,
            }
        })
        .collect();

    ClusterSnapshot {
        cluster_count,
        capacity,
        clusters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_gives_448_byte_records() {
        assert_eq!(cluster_stride(100), 448);
    }

    #[test]
    fn stride_is_always_16_byte_aligned() {
        for capacity in [1, 2, 3, 4, 7, 100, 101, 200] {
            assert_eq!(cluster_stride(capacity) % 16, 0);
            assert!(cluster_stride(capacity) >= 36 + 4 * capacity as u64);
        }
    }

    #[test]
    fn buffer_size_accounts_for_header_and_records() {
        assert_eq!(cluster_buffer_size(16 * 9 * 24, 100), 16 + 3456 * 448);
    }

    #[test]
    fn encode_decode_round_trip() {
        let capacity = 5;
        let mut record = ClusterRecord::empty(capacity);
        record.min_bound = [-1.0, -2.0, -3.0, 0.0];
        record.max_bound = [1.0, 2.0, -0.5, 0.0];
        record.light_count = 2;
        record.light_indices[0] = 7;
        record.light_indices[1] = 42;

        let snapshot = ClusterSnapshot {
            cluster_count: 3,
            capacity,
            clusters: vec![
                record,
                ClusterRecord::empty(capacity),
                ClusterRecord::empty(capacity),
            ],
        };

        let decoded = decode_clusters(&encode_clusters(&snapshot), capacity);
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn indices_returns_the_live_prefix() {
        let mut record = ClusterRecord::empty(4);
        record.light_count = 2;
        record.light_indices = vec![9, 8, 0, 0];
        assert_eq!(record.indices(), &[9, 8]);
    }
}
