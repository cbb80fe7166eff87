use glam::{Mat4, Vec3};

/// View-space axis-aligned box. The camera looks down -Z, so `min.z` is the
/// far face and `max.z` the near face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Closed boundary convention: a sphere exactly tangent to a face counts
    /// as intersecting.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        center.distance_squared(closest) <= radius * radius
    }
}

/// Camera data the grid math depends on.
#[derive(Clone, Copy, Debug)]
pub struct ClusterCamera {
    pub view: Mat4,
    pub proj: Mat4,
    pub near: f32,
    pub far: f32,
}

/// Partition of the view frustum: `dims[0] x dims[1]` screen tiles crossed
/// with `dims[2]` exponential depth bands. Pure function of camera + dims;
/// completely independent of the lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterGrid {
    pub dims: [u32; 3],
}

impl ClusterGrid {
    pub fn new(dims: [u32; 3]) -> Self {
        Self { dims }
    }

    pub fn cluster_count(&self) -> u32 {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// X-fastest linearization, matching the WGSL kernel.
    pub fn flat_index(&self, coord: [u32; 3]) -> usize {
        ((coord[2] * self.dims[1] + coord[1]) * self.dims[0] + coord[0]) as usize
    }

    pub fn coord_of(&self, index: usize) -> [u32; 3] {
        let index = index as u32;
        let per_slice = self.dims[0] * self.dims[1];
        [
            index % self.dims[0],
            (index / self.dims[0]) % self.dims[1],
            index / per_slice,
        ]
    }

    /// Depth of band boundary `k` as a positive view distance:
    /// `near * (far/near)^(k/nz)`. Exponential spacing keeps clusters roughly
    /// cube-shaped in screen space.
    pub fn slice_depth(&self, camera: &ClusterCamera, k: u32) -> f32 {
        camera.near * (camera.far / camera.near).powf(k as f32 / self.dims[2] as f32)
    }

    /// View-space bounds of one cluster: the four NDC tile corners unprojected
    /// at both band depths, then componentwise min/max.
    pub fn cluster_bounds(&self, camera: &ClusterCamera, coord: [u32; 3]) -> Aabb {
        let [nx, ny, _] = self.dims;
        let z_near = self.slice_depth(camera, coord[2]);
        let z_far = self.slice_depth(camera, coord[2] + 1);

        let ndc_min_x = -1.0 + 2.0 * coord[0] as f32 / nx as f32;
        let ndc_max_x = -1.0 + 2.0 * (coord[0] + 1) as f32 / nx as f32;
        let ndc_min_y = -1.0 + 2.0 * coord[1] as f32 / ny as f32;
        let ndc_max_y = -1.0 + 2.0 * (coord[1] + 1) as f32 / ny as f32;

        // For a perspective projection, ndc.x = proj00 * view.x / depth, so a
        // tile edge unprojects to view.x = ndc.x * depth / proj00.
        let proj_xx = camera.proj.x_axis.x;
        let proj_yy = camera.proj.y_axis.y;

        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for depth in [z_near, z_far] {
            for ndc_x in [ndc_min_x, ndc_max_x] {
                let x = ndc_x * depth / proj_xx;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
            }
            for ndc_y in [ndc_min_y, ndc_max_y] {
                let y = ndc_y * depth / proj_yy;
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }

        Aabb {
            min: Vec3::new(min_x, min_y, -z_far),
            max: Vec3::new(max_x, max_y, -z_near),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    fn test_camera() -> ClusterCamera {
        ClusterCamera {
            view: Mat4::IDENTITY,
            proj: Mat4::perspective_rh(60.0f32.to_radians(), 16.0 / 9.0, 0.1, 100.0),
            near: 0.1,
            far: 100.0,
        }
    }

    #[test]
    fn flat_index_round_trips() {
        let grid = ClusterGrid::new([16, 9, 24]);
        for index in [0usize, 1, 15, 16, 143, 144, 16 * 9 * 24 - 1] {
            assert_eq!(grid.flat_index(grid.coord_of(index)), index);
        }
    }

    #[test]
    fn depth_bands_cover_near_to_far() {
        let grid = ClusterGrid::new([16, 9, 24]);
        let camera = test_camera();
        assert!((grid.slice_depth(&camera, 0) - camera.near).abs() < 1e-5);
        assert!((grid.slice_depth(&camera, 24) - camera.far).abs() < 1e-3);
        for k in 0..24 {
            assert!(grid.slice_depth(&camera, k) < grid.slice_depth(&camera, k + 1));
        }
    }

    #[test]
    fn single_cluster_grid_spans_the_frustum() {
        let grid = ClusterGrid::new([1, 1, 1]);
        let camera = test_camera();
        let bounds = grid.cluster_bounds(&camera, [0, 0, 0]);

        assert!((bounds.max.z - -camera.near).abs() < 1e-5);
        assert!((bounds.min.z - -camera.far).abs() < 1e-3);

        // Widest extent is at the far plane.
        let half_width = camera.far / camera.proj.x_axis.x;
        assert!((bounds.max.x - half_width).abs() < 1e-2);
        assert!((bounds.min.x + half_width).abs() < 1e-2);
    }

    #[test]
    fn neighbor_tiles_meet_at_the_screen_center() {
        let grid = ClusterGrid::new([2, 1, 1]);
        let camera = test_camera();
        let left = grid.cluster_bounds(&camera, [0, 0, 0]);
        let right = grid.cluster_bounds(&camera, [1, 0, 0]);
        // The shared edge sits at ndc.x = 0, which unprojects to x = 0 at
        // every depth, so the two boxes meet exactly there.
        assert!(left.max.x.abs() < 1e-5);
        assert!(right.min.x.abs() < 1e-5);
    }

    #[test]
    fn off_center_neighbors_overlap() {
        let grid = ClusterGrid::new([4, 4, 4]);
        let camera = test_camera();
        let left = grid.cluster_bounds(&camera, [0, 0, 0]);
        let right = grid.cluster_bounds(&camera, [1, 0, 0]);
        // Frustum cells flare with depth; away from the screen center the
        // boxes cover the shared edge from both sides instead of meeting.
        assert!(left.max.x > right.min.x);
    }

    #[test]
    fn sphere_tangent_to_face_intersects() {
        let aabb = Aabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        // Exactly tangent: included (closed boundary).
        assert!(aabb.intersects_sphere(Vec3::new(3.0, 0.0, 0.0), 2.0));
        // Slightly separated: excluded.
        assert!(!aabb.intersects_sphere(Vec3::new(3.0 + 1e-4, 0.0, 0.0), 2.0));
        // Slightly overlapping: included.
        assert!(aabb.intersects_sphere(Vec3::new(3.0 - 1e-4, 0.0, 0.0), 2.0));
    }

    #[test]
    fn sphere_inside_box_intersects() {
        let aabb = Aabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        assert!(aabb.intersects_sphere(Vec3::ZERO, 0.1));
    }
}
