//! # Flow aggregation
//!
//! Reduces a flow field to the scalar metrics consumed by reporting.

use crate::flow_field::FlowField;
use std::f32::consts::{PI, TAU};
use std::fmt;

/// One of eight compass sectors.
///
/// Sectors are ordered the way the bucketing formula indexes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum CompassDirection {
    East,
    NorthEast,
    North,
    NorthWest,
    West,
    SouthWest,
    South,
    SouthEast,
}

impl CompassDirection {
    pub const ALL: [Self; 8] = [
        Self::East,
        Self::NorthEast,
        Self::North,
        Self::NorthWest,
        Self::West,
        Self::SouthWest,
        Self::South,
        Self::SouthEast,
    ];

    /// Bucket a mean flow angle.
    ///
    /// The sector index is `round(((angle + π) mod 2π) / (π / 4)) mod 8`.
    pub fn from_angle(angle: f32) -> Self {
        let wrapped = (angle + PI).rem_euclid(TAU);
        let idx = (wrapped / (PI / 4.0)).round() as usize % 8;
        Self::ALL[idx]
    }

    /// Short compass label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::East => "E",
            Self::NorthEast => "NE",
            Self::North => "N",
            Self::NorthWest => "NW",
            Self::West => "W",
            Self::SouthWest => "SW",
            Self::South => "S",
            Self::SouthEast => "SE",
        }
    }
}

impl fmt::Display for CompassDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scalar summary of a flow field.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct FlowSummary {
    /// Mean calibrated speed over all cells.
    pub average_speed: f32,
    /// Reported flow magnitude. Equal to `average_speed`.
    pub flow_magnitude: f32,
    /// Sector of the circular mean direction of all cells.
    ///
    /// Still cells take part with a direction of `atan2(0, 0) = 0`.
    pub dominant_direction: CompassDirection,
    /// Number of cells with non-zero raw motion.
    pub moving_cells: usize,
}

impl FlowSummary {
    /// Summarise a flow field.
    pub fn from_field(field: &FlowField) -> Self {
        let speeds = field.speeds();

        let average_speed = if speeds.is_empty() {
            0.0
        } else {
            speeds.iter().sum::<f32>() / speeds.len() as f32
        };

        let dominant_direction =
            CompassDirection::from_angle(circular_mean(field.vectors().map(|v| v.direction)));

        let moving_cells = field
            .vectors()
            .filter(|v| v.motion.x != 0.0 || v.motion.y != 0.0)
            .count();

        Self {
            average_speed,
            flow_magnitude: average_speed,
            dominant_direction,
            moving_cells,
        }
    }

    /// Whether any cell registered motion.
    pub fn is_moving(&self) -> bool {
        self.moving_cells > 0
    }
}

/// Circular mean of a set of angles.
///
/// Angles that cancel out exactly, or an empty set, average to `atan2(0, 0) = 0`.
pub fn circular_mean(angles: impl Iterator<Item = f32>) -> f32 {
    let (sin, cos) = angles.fold((0f64, 0f64), |(s, c), a| {
        (s + (a as f64).sin(), c + (a as f64).cos())
    });

    sin.atan2(cos) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::VelocityCalibrator;
    use assert_approx_eq::assert_approx_eq;
    use nalgebra as na;

    fn field(motion: &[(f32, f32)]) -> FlowField {
        let cal = VelocityCalibrator::new(1.0, 5.0);
        let grid = (motion.len() as f32).sqrt() as usize;
        let vectors = motion
            .iter()
            .map(|&(u, v)| cal.calibrate(na::Vector2::new(u, v)))
            .collect::<Vec<_>>();
        FlowField::from_vectors(grid, &vectors)
    }

    #[test]
    fn sector_bucketing() {
        assert_eq!(CompassDirection::from_angle(-PI), CompassDirection::East);
        assert_eq!(CompassDirection::from_angle(PI), CompassDirection::East);
        assert_eq!(CompassDirection::from_angle(0.0), CompassDirection::West);
        assert_eq!(
            CompassDirection::from_angle(-PI / 2.0),
            CompassDirection::North
        );
        assert_eq!(
            CompassDirection::from_angle(PI / 2.0),
            CompassDirection::South
        );
        assert_eq!(
            CompassDirection::from_angle(-3.0 * PI / 4.0),
            CompassDirection::NorthEast
        );
        // Just short of π wraps around to the first sector.
        assert_eq!(
            CompassDirection::from_angle(PI - 0.1),
            CompassDirection::East
        );
        assert_eq!(CompassDirection::SouthEast.to_string(), "SE");
    }

    #[test]
    fn average_and_magnitude_match() {
        let summary = FlowSummary::from_field(&field(&[(1.0, 0.0), (3.0, 0.0), (0.0, 0.0), (0.0, 8.0)]));

        assert_approx_eq!(summary.average_speed, (1.0 + 3.0 + 0.0 + 5.0) / 4.0);
        assert_eq!(summary.flow_magnitude, summary.average_speed);
    }

    #[test]
    fn still_cells_count_towards_direction() {
        let mut motion = vec![(0.0, 0.0); 100];
        motion[..10].fill((-1.0, 0.0));

        // Still cells average in at angle 0 and outweigh the moving ones.
        let summary = FlowSummary::from_field(&field(&motion));

        assert_eq!(summary.dominant_direction, CompassDirection::West);
        assert_eq!(summary.moving_cells, 10);
        assert!(summary.is_moving());

        motion[..60].fill((-1.0, 0.0));
        let summary = FlowSummary::from_field(&field(&motion));

        assert_eq!(summary.dominant_direction, CompassDirection::East);
        assert_eq!(summary.moving_cells, 60);
    }

    #[test]
    fn no_motion_is_flagged_separately() {
        let summary = FlowSummary::from_field(&field(&[(0.0, 0.0); 9]));

        assert_eq!(summary.average_speed, 0.0);
        assert_eq!(summary.moving_cells, 0);
        assert!(!summary.is_moving());
        assert_eq!(summary.dominant_direction, CompassDirection::West);
    }

    #[test]
    fn circular_mean_wraps() {
        let mean = circular_mean([PI - 0.1, -PI + 0.1].into_iter());

        assert_approx_eq!(mean.abs(), PI, 1e-5);
        assert_eq!(circular_mean(std::iter::empty::<f32>()), 0.0);
    }
}
