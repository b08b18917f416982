//! # Surface flow estimator

use crate::calibration::VelocityCalibrator;
use crate::config::FlowConfig;
use crate::error::FlowResult;
use crate::flow_field::FlowField;
use crate::frame::{Frame, IntensityField};
use crate::gradient::GradientField;
use crate::grid::GridSampler;
use crate::solver;
use crate::summary::FlowSummary;
use log::*;

/// Flow field together with its summary.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowAnalysis {
    pub field: FlowField,
    pub summary: FlowSummary,
}

/// Generic frame pair flow estimator.
pub trait FlowEstimator {
    /// Estimate the flow field between two frames.
    ///
    /// # Arguments
    ///
    /// * `previous` - reference frame.
    /// * `current` - frame following `previous`. Must have the same dimensions.
    fn estimate(&self, previous: &Frame, current: &Frame) -> FlowResult<FlowField>;

    /// Estimate the flow field and summarise it.
    ///
    /// # Arguments
    ///
    /// * `previous` - reference frame.
    /// * `current` - frame following `previous`. Must have the same dimensions.
    fn analyse(&self, previous: &Frame, current: &Frame) -> FlowResult<FlowAnalysis> {
        let field = self.estimate(previous, current)?;
        let summary = FlowSummary::from_field(&field);
        Ok(FlowAnalysis { field, summary })
    }
}

/// Single-scale, grid sampled Lucas-Kanade estimator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LucasKanadeEstimator {
    config: FlowConfig,
}

impl LucasKanadeEstimator {
    /// Create a new estimator, validating the configuration up front.
    pub fn new(config: FlowConfig) -> FlowResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl FlowEstimator for LucasKanadeEstimator {
    fn estimate(&self, previous: &Frame, current: &Frame) -> FlowResult<FlowField> {
        estimate_flow(previous, current, &self.config)
    }
}

/// Estimate the flow field between two frames.
///
/// This is a pure function of its inputs. Gradient buffers live only for the duration of the
/// call.
///
/// # Arguments
///
/// * `previous` - reference frame.
/// * `current` - frame following `previous`. Must have the same dimensions.
/// * `config` - estimation parameters.
pub fn estimate_flow(previous: &Frame, current: &Frame, config: &FlowConfig) -> FlowResult<FlowField> {
    config.validate()?;

    let (width, height) = previous.dim();
    let grid = GridSampler::new(width, height, config.grid_size, config.window_size);
    let cells = grid.cells().collect::<Vec<_>>();

    let motion = {
        let grad = GradientField::compute(
            &IntensityField::from_frame(previous),
            &IntensityField::from_frame(current),
        )?;

        solver::solve_cells(&grad, &cells, config.ill_conditioned_epsilon as f64)
    };

    let stalled = motion.iter().filter(|m| m.x == 0.0 && m.y == 0.0).count();

    let calibrator = VelocityCalibrator::new(config.calibration_factor, config.max_speed);

    let vectors = motion
        .into_iter()
        .map(|m| calibrator.calibrate(m))
        .collect::<Vec<_>>();

    let field = FlowField::from_vectors(config.grid_size, &vectors);

    debug!(
        "Estimated {} flow cells on {}x{} frames, {} motionless",
        field.size(),
        width,
        height,
        stalled
    );

    Ok(field)
}

/// Estimate flow and summarise it in one go.
pub fn analyse_flow(previous: &Frame, current: &Frame, config: &FlowConfig) -> FlowResult<FlowAnalysis> {
    let field = estimate_flow(previous, current, config)?;
    let summary = FlowSummary::from_field(&field);
    Ok(FlowAnalysis { field, summary })
}
