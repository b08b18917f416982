//! # Velocity calibration

use crate::flow_field::FlowVector;
use nalgebra as na;

/// Maps raw per-frame displacement to physical speed.
///
/// The factor depends on camera geometry and frame rate, neither of which is inferred here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityCalibrator {
    pub factor: f32,
    pub max_speed: f32,
}

impl VelocityCalibrator {
    pub fn new(factor: f32, max_speed: f32) -> Self {
        Self { factor, max_speed }
    }

    /// Convert a raw magnitude to a clamped speed.
    pub fn speed(&self, magnitude: f32) -> f32 {
        let speed = magnitude * self.factor;

        if speed.is_finite() {
            speed.clamp(0.0, self.max_speed)
        } else {
            self.max_speed
        }
    }

    /// Calibrate a raw displacement.
    pub fn calibrate(&self, motion: na::Vector2<f32>) -> FlowVector {
        FlowVector {
            motion,
            speed: self.speed(motion.magnitude()),
            direction: motion.y.atan2(motion.x),
        }
    }
}
