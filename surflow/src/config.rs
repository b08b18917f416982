//! # Estimation configuration

use crate::error::{FlowError, FlowResult};
use crate::properties::{Properties, PropertyMut};
use std::time::Duration;

/// Parameters of a single flow estimation.
///
/// Everything is passed explicitly with each call, there is no global state.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FlowConfig {
    /// Number of cells along each axis of the sample grid.
    pub grid_size: usize,
    /// Side of the square window each cell sums over, in pixels.
    pub window_size: usize,
    /// Multiplier converting raw displacement to physical speed.
    pub calibration_factor: f32,
    /// Upper bound of any calibrated speed.
    pub max_speed: f32,
    /// Determinant threshold below which a window is treated as motionless.
    pub ill_conditioned_epsilon: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            window_size: 15,
            calibration_factor: 0.5,
            max_speed: 5.0,
            ill_conditioned_epsilon: 1e-6,
        }
    }
}

impl FlowConfig {
    /// Check that the configuration describes a valid estimation.
    pub fn validate(&self) -> FlowResult<()> {
        if self.grid_size == 0 {
            return Err(FlowError::InvalidConfig("grid size must be at least 1".into()));
        }

        if self.window_size == 0 {
            return Err(FlowError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }

        for (name, val) in [
            ("calibration factor", self.calibration_factor),
            ("max speed", self.max_speed),
            ("ill-conditioned epsilon", self.ill_conditioned_epsilon),
        ] {
            if !val.is_finite() || val <= 0.0 {
                return Err(FlowError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, val
                )));
            }
        }

        Ok(())
    }
}

impl Properties for FlowConfig {
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        vec![
            ("Grid size", PropertyMut::usize(&mut self.grid_size, 1, 64)),
            (
                "Window size",
                PropertyMut::usize(&mut self.window_size, 1, 255),
            ),
            (
                "Calibration factor",
                PropertyMut::float(&mut self.calibration_factor, 1e-6, 1e3),
            ),
            (
                "Max speed",
                PropertyMut::float(&mut self.max_speed, 1e-3, 1e3),
            ),
            (
                "Epsilon",
                PropertyMut::float(&mut self.ill_conditioned_epsilon, 1e-12, 1e6),
            ),
        ]
    }
}

/// Scheduling of periodic live analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveConfig {
    /// Time between consecutive captures.
    pub interval: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}
