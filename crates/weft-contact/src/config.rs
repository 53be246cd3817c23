//! Collision configuration.
//!
//! Parameters that control the broad phase backend, box padding and the
//! narrow-phase tolerances. Loadable from TOML; missing keys take their
//! defaults.

use serde::{Deserialize, Serialize};
use weft_types::constants::{
    DEFAULT_BARYCENTRIC_TOLERANCE, DEFAULT_COEFFICIENT_THRESHOLD, DEFAULT_CONTINUOUS_PAD,
    DEFAULT_EDIT_PAD, DEFAULT_PROXIMITY_EPSILON, DEFAULT_TOUCH_DISTANCE_SQ,
};
use weft_types::{WeftError, WeftResult};

/// Broad phase backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhaseKind {
    /// Uniform hash grid.
    #[default]
    Grid,
    /// Bounding volume hierarchy.
    Bvh,
}

/// Configuration for the collision core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Broad phase backend.
    pub broad_phase: BroadPhaseKind,

    /// Grid cell size. When unset the grid derives it from the mesh's
    /// average edge length on every rebuild.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_cell_size: Option<f64>,

    /// Padding of static (proximity) boxes.
    pub proximity_epsilon: f64,

    /// Padding of swept boxes for continuous-time detection.
    pub continuous_pad: f64,

    /// Padding of swept boxes for edit safety checks.
    pub edit_pad: f64,

    /// Squared distance under which primitives touch at a coplanarity time.
    pub touch_distance_sq: f64,

    /// Slack on barycentric weights outside `[0, 1]`.
    pub barycentric_tolerance: f64,

    /// Relative magnitude under which cubic coefficients are zeroed.
    pub coefficient_threshold: f64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            broad_phase: BroadPhaseKind::Grid,
            grid_cell_size: None,
            proximity_epsilon: DEFAULT_PROXIMITY_EPSILON,
            continuous_pad: DEFAULT_CONTINUOUS_PAD,
            edit_pad: DEFAULT_EDIT_PAD,
            touch_distance_sq: DEFAULT_TOUCH_DISTANCE_SQ,
            barycentric_tolerance: DEFAULT_BARYCENTRIC_TOLERANCE,
            coefficient_threshold: DEFAULT_COEFFICIENT_THRESHOLD,
        }
    }
}

impl CollisionConfig {
    /// Creates a forgiving config for debugging (larger pads and tolerances).
    pub fn debug() -> Self {
        Self {
            proximity_epsilon: 1e-3,
            continuous_pad: 1e-4,
            touch_distance_sq: 1e-10,
            barycentric_tolerance: 1e-4,
            ..Default::default()
        }
    }

    /// Creates a high-quality config (BVH, tighter tolerances).
    pub fn high_quality() -> Self {
        Self {
            broad_phase: BroadPhaseKind::Bvh,
            touch_distance_sq: 1e-16,
            barycentric_tolerance: 1e-9,
            coefficient_threshold: 1e-14,
            ..Default::default()
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> WeftResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| WeftError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to a TOML document.
    pub fn to_toml_string(&self) -> WeftResult<String> {
        toml::to_string(self).map_err(|e| WeftError::Serialization(e.to_string()))
    }

    /// Checks every numeric field for a usable value.
    pub fn validate(&self) -> WeftResult<()> {
        if let Some(cell) = self.grid_cell_size {
            if !(cell > 0.0 && cell.is_finite()) {
                return Err(WeftError::InvalidConfig(format!(
                    "grid_cell_size must be positive, got {cell}"
                )));
            }
        }

        let non_negative = [
            ("proximity_epsilon", self.proximity_epsilon),
            ("continuous_pad", self.continuous_pad),
            ("edit_pad", self.edit_pad),
            ("barycentric_tolerance", self.barycentric_tolerance),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(WeftError::InvalidConfig(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        if !(self.touch_distance_sq > 0.0 && self.touch_distance_sq.is_finite()) {
            return Err(WeftError::InvalidConfig(format!(
                "touch_distance_sq must be positive, got {}",
                self.touch_distance_sq
            )));
        }
        if !(0.0..1.0).contains(&self.coefficient_threshold) {
            return Err(WeftError::InvalidConfig(format!(
                "coefficient_threshold must lie in [0, 1), got {}",
                self.coefficient_threshold
            )));
        }
        Ok(())
    }

    /// Tolerances consumed by the narrow phase.
    pub fn narrow_params(&self) -> NarrowPhaseParams {
        NarrowPhaseParams {
            touch_distance_sq: self.touch_distance_sq,
            barycentric_tolerance: self.barycentric_tolerance,
            coefficient_threshold: self.coefficient_threshold,
        }
    }
}

/// Narrow-phase tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NarrowPhaseParams {
    /// Squared distance under which primitives touch.
    pub touch_distance_sq: f64,
    /// Slack on barycentric weights.
    pub barycentric_tolerance: f64,
    /// Relative cubic coefficient cutoff.
    pub coefficient_threshold: f64,
}

impl Default for NarrowPhaseParams {
    fn default() -> Self {
        CollisionConfig::default().narrow_params()
    }
}
