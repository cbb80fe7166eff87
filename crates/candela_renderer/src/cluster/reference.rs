//! CPU mirror of the clustering kernel. Same bounds math, same closed
//! intersection test, same claim-then-clamp insertion, so the output is
//! byte-identical to what the GPU writes for the same inputs.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;
use rayon::prelude::*;

use crate::{
    cluster::{
        grid::{ClusterCamera, ClusterGrid},
        layout::{ClusterRecord, ClusterSnapshot},
    },
    lights::GpuLight,
};

pub struct ClusterInput<'a> {
    pub camera: ClusterCamera,
    pub grid: ClusterGrid,
    pub lights: &'a [GpuLight],
    pub active_count: u32,
    pub capacity: u32,
    pub light_radius: f32,
}

pub fn compute_clusters(input: &ClusterInput) -> ClusterSnapshot {
    let active = (input.active_count as usize).min(input.lights.len());
    let lights = &input.lights[..active];
    let cluster_count = input.grid.cluster_count();

    // Clusters are independent, so we parallelize over them. Each cluster
    // still visits lights in index order, which keeps the output
    // deterministic while exercising the same atomic claim discipline as the
    // kernel.
    let clusters: Vec<ClusterRecord> = (0..cluster_count as usize)
        .into_par_iter()
        .map(|index| {
            let coord = input.grid.coord_of(index);
            let bounds = input.grid.cluster_bounds(&input.camera, coord);

            let claimed = AtomicU32::new(0);
            let mut light_indices = vec![0u32; input.capacity as usize];

            for (light_index, light) in lights.iter().enumerate() {
                let world_pos = Vec3::new(
                    light.position[0],
                    light.position[1],
                    light.position[2],
                );
                let view_pos = input.camera.view.transform_point3(world_pos);
                if bounds.intersects_sphere(view_pos, input.light_radius) {
                    let slot = claimed.fetch_add(1, Ordering::Relaxed);
                    if slot < input.capacity {
                        light_indices[slot as usize] = light_index as u32;
                    }
                    // Slots past capacity are silently dropped.
                }
            }

            // Clamp the counter back; it may have overshot while claiming.
            let light_count = claimed.load(Ordering::Relaxed).min(input.capacity);

            ClusterRecord {
                min_bound: [bounds.min.x, bounds.min.y, bounds.min.z, 0.0],
                max_bound: [bounds.max.x, bounds.max.y, bounds.max.z, 0.0],
                light_count,
                light_indices,
            }
        })
        .collect();

    ClusterSnapshot {
        cluster_count,
        capacity: input.capacity,
        clusters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::layout::encode_clusters;
    use glam::Mat4;

    fn camera() -> ClusterCamera {
        ClusterCamera {
            view: Mat4::IDENTITY,
            proj: Mat4::perspective_rh(60.0f32.to_radians(), 1.0, 0.1, 100.0),
            near: 0.1,
            far: 100.0,
        }
    }

    fn light_at(x: f32, y: f32, z: f32) -> GpuLight {
        GpuLight {
            position: [x, y, z, 1.0],
            color: [1.0, 1.0, 1.0, 0.0],
        }
    }

    /// Lights spread through the frustum; checks the structural invariants
    /// that must hold for every cluster.
    #[test]
    fn output_respects_structural_invariants() {
        let lights: Vec<GpuLight> = (0..64)
            .map(|i| {
                let f = i as f32;
                light_at(
                    (f * 0.37).sin() * 8.0,
                    (f * 0.53).cos() * 4.0,
                    -2.0 - (f % 16.0) * 3.0,
                )
            })
            .collect();

        let input = ClusterInput {
            camera: camera(),
            grid: ClusterGrid::new([8, 8, 8]),
            lights: &lights,
            active_count: 48,
            capacity: 10,
            light_radius: 2.0,
        };
        let snapshot = compute_clusters(&input);

        assert_eq!(snapshot.cluster_count, 512);
        for cluster in &snapshot.clusters {
            assert!(cluster.light_count <= input.capacity);
            let indices = cluster.indices();
            for &index in indices {
                assert!(index < input.active_count);
            }
            let mut sorted = indices.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), indices.len(), "indices must be distinct");
        }
    }

    /// Every listed light really intersects the cluster, and a light that
    /// clearly intersects is listed when there is room.
    #[test]
    fn assignment_is_sound() {
        let lights: Vec<GpuLight> = (0..32)
            .map(|i| {
                let f = i as f32;
                light_at((f * 0.61).sin() * 6.0, (f * 0.29).cos() * 3.0, -5.0 - f)
            })
            .collect();

        let grid = ClusterGrid::new([4, 4, 8]);
        let cam = camera();
        let input = ClusterInput {
            camera: cam,
            grid,
            lights: &lights,
            active_count: 32,
            capacity: 32,
            light_radius: 2.0,
        };
        let snapshot = compute_clusters(&input);

        for (index, cluster) in snapshot.clusters.iter().enumerate() {
            let bounds = grid.cluster_bounds(&cam, grid.coord_of(index));
            for &light_index in cluster.indices() {
                let p = lights[light_index as usize].position;
                let view_pos = Vec3::new(p[0], p[1], p[2]);
                assert!(
                    bounds.intersects_sphere(view_pos, input.light_radius),
                    "cluster {index} lists light {light_index} that does not touch it"
                );
            }
            // Capacity was never hit, so the converse holds too.
            assert!(cluster.light_count < input.capacity);
            for (light_index, light) in lights.iter().enumerate() {
                let view_pos = Vec3::new(light.position[0], light.position[1], light.position[2]);
                if bounds.intersects_sphere(view_pos, input.light_radius) {
                    assert!(cluster.indices().contains(&(light_index as u32)));
                }
            }
        }
    }

    #[test]
    fn overflowing_cluster_clamps_to_capacity() {
        // Ten coincident lights, room for four.
        let lights = vec![light_at(0.0, 0.0, -10.0); 10];
        let input = ClusterInput {
            camera: camera(),
            grid: ClusterGrid::new([1, 1, 1]),
            lights: &lights,
            active_count: 10,
            capacity: 4,
            light_radius: 2.0,
        };
        let snapshot = compute_clusters(&input);

        let cluster = &snapshot.clusters[0];
        assert_eq!(cluster.light_count, 4);
        assert_eq!(cluster.indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn single_cluster_grid_separates_inside_from_outside() {
        let lights = vec![
            light_at(0.0, 0.0, -10.0),
            light_at(2.0, 1.0, -30.0),
            light_at(-3.0, -1.0, -60.0),
            // Behind the camera, outside the frustum.
            light_at(0.0, 0.0, 50.0),
        ];
        let input = ClusterInput {
            camera: camera(),
            grid: ClusterGrid::new([1, 1, 1]),
            lights: &lights,
            active_count: 4,
            capacity: 10,
            light_radius: 2.0,
        };
        let snapshot = compute_clusters(&input);

        assert_eq!(snapshot.clusters[0].indices(), &[0, 1, 2]);
    }

    #[test]
    fn boundary_lights_follow_the_closed_convention() {
        let grid = ClusterGrid::new([1, 1, 1]);
        let cam = camera();
        let bounds = grid.cluster_bounds(&cam, [0, 0, 0]);
        let radius = 2.0;

        // A light straight down -Z, exactly tangent to the far face.
        let tangent_z = bounds.min.z - radius;
        let cases = [
            (tangent_z, true),           // tangent: included
            (tangent_z + 1e-3, true),    // inside by epsilon
            (tangent_z - 1e-3, false),   // separated by epsilon
        ];
        for (z, expected) in cases {
            let lights = vec![light_at(0.0, 0.0, z)];
            let input = ClusterInput {
                camera: cam,
                grid,
                lights: &lights,
                active_count: 1,
                capacity: 4,
                light_radius: radius,
            };
            let snapshot = compute_clusters(&input);
            assert_eq!(
                snapshot.clusters[0].light_count == 1,
                expected,
                "light at z = {z}"
            );
        }
    }

    #[test]
    fn runs_are_byte_identical() {
        let lights: Vec<GpuLight> = (0..200)
            .map(|i| {
                let f = i as f32;
                light_at((f * 0.17).sin() * 10.0, (f * 0.41).cos() * 5.0, -1.0 - (f % 40.0) * 2.0)
            })
            .collect();
        let input = ClusterInput {
            camera: camera(),
            grid: ClusterGrid::new([16, 9, 24]),
            lights: &lights,
            active_count: 200,
            capacity: 8,
            light_radius: 2.0,
        };

        let first = encode_clusters(&compute_clusters(&input));
        let second = encode_clusters(&compute_clusters(&input));
        assert_eq!(first, second);
    }
}
