use flecs_ecs::macros::Component;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    Forward,
    Deferred,
}

/// Every tunable in one place. Deserialized from `candela.json` when present;
/// each field falls back to its default otherwise.
#[derive(Component, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub mode: PipelineMode,

    /// Cluster grid dimensions (screen tiles x, y; depth bands z).
    pub grid_dims: [u32; 3],
    /// Light indices stored per cluster. Extra lights are dropped.
    pub cluster_capacity: u32,
    pub cluster_workgroup_size: u32,

    /// Allocated light records. `active_lights` is the live prefix.
    pub max_lights: u32,
    pub active_lights: u32,
    pub light_radius: f32,
    pub light_intensity: f32,
    pub move_workgroup_size: u32,
    pub light_bounds_min: [f32; 3],
    pub light_bounds_max: [f32; 3],
    pub light_speed: f32,

    /// Encode the host-visible cluster copy each frame (debug only).
    pub capture_cluster_snapshot: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Forward,
            grid_dims: [16, 9, 24],
            cluster_capacity: 100,
            cluster_workgroup_size: 4,
            max_lights: 5000,
            active_lights: 500,
            light_radius: 2.0,
            light_intensity: 0.1,
            move_workgroup_size: 128,
            light_bounds_min: [-12.0, 0.0, -12.0],
            light_bounds_max: [12.0, 8.0, 12.0],
            light_speed: 0.5,
            capture_cluster_snapshot: false,
        }
    }
}

impl RenderSettings {
    pub fn cluster_count(&self) -> u32 {
        self.grid_dims.iter().product()
    }

    /// Checked once at startup, before any value reaches a dispatch divisor
    /// or a WGSL array length. Settings come from user-editable JSON.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.grid_dims.iter().any(|&dim| dim == 0) {
            return Err(SettingsError::ZeroGridDim {
                dims: self.grid_dims,
            });
        }
        if self.cluster_capacity == 0 {
            return Err(SettingsError::ZeroCapacity);
        }
        if self.cluster_workgroup_size == 0 {
            return Err(SettingsError::ZeroWorkgroup {
                name: "cluster_workgroup_size",
            });
        }
        if self.move_workgroup_size == 0 {
            return Err(SettingsError::ZeroWorkgroup {
                name: "move_workgroup_size",
            });
        }
        Ok(())
    }

    /// The live prefix never exceeds the allocation.
    pub fn active_light_count(&self) -> u32 {
        self.active_lights.min(self.max_lights)
    }

    /// Constants baked into the WGSL sources at pipeline creation.
    pub fn shader_defs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("grid_x", self.grid_dims[0].to_string()),
            ("grid_y", self.grid_dims[1].to_string()),
            ("grid_z", self.grid_dims[2].to_string()),
            ("cluster_capacity", self.cluster_capacity.to_string()),
            (
                "cluster_workgroup_size",
                self.cluster_workgroup_size.to_string(),
            ),
            ("move_workgroup_size", self.move_workgroup_size.to_string()),
            ("light_radius", wgsl_float(self.light_radius)),
            ("light_speed", wgsl_float(self.light_speed)),
            ("bounds_min_x", wgsl_float(self.light_bounds_min[0])),
            ("bounds_min_y", wgsl_float(self.light_bounds_min[1])),
            ("bounds_min_z", wgsl_float(self.light_bounds_min[2])),
            ("bounds_max_x", wgsl_float(self.light_bounds_max[0])),
            ("bounds_max_y", wgsl_float(self.light_bounds_max[1])),
            ("bounds_max_z", wgsl_float(self.light_bounds_max[2])),
        ]
    }
}

/// `Debug` for f32 always prints a decimal point or exponent, which is what
/// WGSL needs to parse the literal as a float.
fn wgsl_float(value: f32) -> String {
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_matches_cluster_count() {
        let settings = RenderSettings::default();
        assert_eq!(settings.cluster_count(), 16 * 9 * 24);
    }

    #[test]
    fn active_lights_never_exceed_allocation() {
        let settings = RenderSettings {
            max_lights: 100,
            active_lights: 500,
            ..Default::default()
        };
        assert_eq!(settings.active_light_count(), 100);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let parsed: RenderSettings =
            serde_json::from_str(r#"{ "mode": "deferred", "active_lights": 64 }"#)
                .expect("partial settings should parse");
        assert_eq!(parsed.mode, PipelineMode::Deferred);
        assert_eq!(parsed.active_lights, 64);
        assert_eq!(parsed.cluster_capacity, RenderSettings::default().cluster_capacity);
    }

    #[test]
    fn defaults_validate() {
        assert_eq!(RenderSettings::default().validate(), Ok(()));
    }

    #[test]
    fn zero_grid_dimension_is_rejected() {
        let settings = RenderSettings {
            grid_dims: [16, 0, 24],
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::ZeroGridDim {
                dims: [16, 0, 24]
            })
        );
    }

    #[test]
    fn zero_workgroup_sizes_are_rejected() {
        let settings = RenderSettings {
            cluster_workgroup_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::ZeroWorkgroup { name: "cluster_workgroup_size" })
        ));

        let settings = RenderSettings {
            move_workgroup_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::ZeroWorkgroup { name: "move_workgroup_size" })
        ));
    }

    #[test]
    fn float_defs_are_valid_wgsl_literals() {
        assert_eq!(wgsl_float(2.0), "2.0");
        assert_eq!(wgsl_float(0.5), "0.5");
    }
}
