//! # Local motion solver
//!
//! Windowed least squares (Lucas-Kanade) solution of the brightness constancy constraint. Every
//! grid cell accumulates gradient products over its window and solves the resulting 2x2 normal
//! equations once, without iterative refinement.

use crate::gradient::GradientField;
use crate::grid::{GridCell, Window};
use log::*;
use nalgebra as na;
use rayon::prelude::*;

/// Accumulated gradient products of a single window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalEquations {
    pub sxx: f64,
    pub sxy: f64,
    pub syy: f64,
    pub sxt: f64,
    pub syt: f64,
}

impl NormalEquations {
    /// Accumulate the gradient products over a window.
    ///
    /// # Arguments
    ///
    /// * `grad` - gradient buffers of the frame pair.
    /// * `window` - window to sum over. Must lie within the gradient buffers.
    pub fn accumulate(grad: &GradientField, window: &Window) -> Self {
        let (rows, cols) = (window.height(), window.width());
        let start = (window.y0, window.x0);

        let dx = grad.dx.slice(start, (rows, cols));
        let dy = grad.dy.slice(start, (rows, cols));
        let dt = grad.dt.slice(start, (rows, cols));

        dx.iter()
            .zip(dy.iter())
            .zip(dt.iter())
            .fold(Self::default(), |mut acc, ((&x, &y), &t)| {
                let (x, y, t) = (x as f64, y as f64, t as f64);
                acc.sxx += x * x;
                acc.sxy += x * y;
                acc.syy += y * y;
                acc.sxt += x * t;
                acc.syt += y * t;
                acc
            })
    }

    /// Determinant of the structure tensor.
    pub fn determinant(&self) -> f64 {
        self.sxx * self.syy - self.sxy * self.sxy
    }

    /// Solve for the window displacement.
    ///
    /// Returns `None` when `|det| < epsilon`, which happens on textureless windows and on
    /// windows where all gradients share one orientation.
    pub fn solve(&self, epsilon: f64) -> Option<na::Vector2<f32>> {
        let det = self.determinant();

        if !det.is_finite() || det.abs() < epsilon {
            return None;
        }

        let u = (self.syy * self.sxt - self.sxy * self.syt) / det;
        let v = (self.sxx * self.syt - self.sxy * self.sxt) / det;

        let motion = na::Vector2::new(u as f32, v as f32);

        if motion.iter().all(|c| c.is_finite()) {
            Some(motion)
        } else {
            None
        }
    }
}

/// Solve a single cell, falling back to zero motion on ill-conditioned windows.
pub fn solve_cell(grad: &GradientField, cell: &GridCell, epsilon: f64) -> na::Vector2<f32> {
    NormalEquations::accumulate(grad, &cell.window)
        .solve(epsilon)
        .unwrap_or_else(|| {
            trace!("Cell ({}, {}) is ill-conditioned", cell.row, cell.col);
            na::Vector2::zeros()
        })
}

/// Solve all cells in parallel.
///
/// The output is in the same order as `cells`. This returns only once every cell is solved.
pub fn solve_cells(grad: &GradientField, cells: &[GridCell], epsilon: f64) -> Vec<na::Vector2<f32>> {
    cells
        .par_iter()
        .map(|cell| solve_cell(grad, cell, epsilon))
        .collect()
}
