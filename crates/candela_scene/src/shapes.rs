//! Tiny procedural primitives. Enough geometry to fill a test scene without
//! dragging in an asset pipeline.

use glam::Vec3;

use crate::{MeshData, SceneVertex};

/// Flat quad in the XZ plane, normal up, centered at the origin.
pub fn plane(half_extent: f32) -> MeshData {
    let h = half_extent;
    let vertices = vec![
        SceneVertex {
            position: [-h, 0.0, -h],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0, 0.0],
        },
        SceneVertex {
            position: [h, 0.0, -h],
            normal: [0.0, 1.0, 0.0],
            uv: [1.0, 0.0],
        },
        SceneVertex {
            position: [h, 0.0, h],
            normal: [0.0, 1.0, 0.0],
            uv: [1.0, 1.0],
        },
        SceneVertex {
            position: [-h, 0.0, h],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0, 1.0],
        },
    ];

    MeshData {
        vertices,
        indices: vec![0, 2, 1, 0, 3, 2],
    }
}

/// Axis-aligned box with per-face normals (24 vertices, 12 triangles).
pub fn cuboid(half_extents: Vec3) -> MeshData {
    let Vec3 { x, y, z } = half_extents;

    // (normal, four corners in CCW order seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z]],
        ),
    ];

    let mut mesh = MeshData::default();
    for (normal, corners) in faces {
        let base = mesh.vertices.len() as u32;
        for (corner, uv) in corners
            .iter()
            .zip([[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]])
        {
            mesh.vertices.push(SceneVertex {
                position: *corner,
                normal,
                uv,
            });
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_is_a_single_quad() {
        let mesh = plane(5.0);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn cuboid_has_six_faces() {
        let mesh = cuboid(Vec3::splat(1.0));
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn cuboid_respects_half_extents() {
        let mesh = cuboid(Vec3::new(1.0, 2.0, 3.0));
        for vertex in &mesh.vertices {
            assert!(vertex.position[0].abs() <= 1.0);
            assert!(vertex.position[1].abs() <= 2.0);
            assert!(vertex.position[2].abs() <= 3.0);
        }
    }
}
