//! # Spatial and temporal gradients
//!
//! Horizontal and vertical gradients are taken from the reference (previous) frame with 3x3
//! Sobel kernels, applied as a correlation with replicated borders so that the output keeps the
//! input size. The temporal gradient is the cell-wise difference `current - reference`.

use crate::error::{FlowError, FlowResult};
use crate::frame::IntensityField;
use nalgebra as na;

type Kernel3 = [[f32; 3]; 3];

/// Horizontal gradient kernel.
pub const SOBEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
/// Vertical gradient kernel.
pub const SOBEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Gradient buffers of a frame pair.
///
/// All three matrices share the `height x width` shape of the source intensity fields.
#[derive(Clone, Debug)]
pub struct GradientField {
    /// Horizontal gradient of the reference frame.
    pub dx: na::DMatrix<f32>,
    /// Vertical gradient of the reference frame.
    pub dy: na::DMatrix<f32>,
    /// Temporal difference between the current and reference frames.
    pub dt: na::DMatrix<f32>,
}

impl GradientField {
    /// Compute gradients of a frame pair.
    ///
    /// # Arguments
    ///
    /// * `reference` - intensity of the previous frame.
    /// * `current` - intensity of the current frame.
    pub fn compute(reference: &IntensityField, current: &IntensityField) -> FlowResult<Self> {
        if reference.dim() != current.dim() {
            return Err(FlowError::DimensionMismatch {
                previous: reference.dim(),
                current: current.dim(),
            });
        }

        let reference = reference.as_matrix();

        Ok(Self {
            dx: correlate3(reference, &SOBEL_X),
            dy: correlate3(reference, &SOBEL_Y),
            dt: current.as_matrix() - reference,
        })
    }
}

/// Apply a 3x3 kernel with border replication, producing a same-sized output.
fn correlate3(input: &na::DMatrix<f32>, kernel: &Kernel3) -> na::DMatrix<f32> {
    let (h, w) = input.shape();

    na::DMatrix::from_fn(h, w, |y, x| {
        let rows = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let cols = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

        rows.iter()
            .zip(kernel)
            .map(|(&yy, krow)| {
                cols.iter()
                    .zip(krow)
                    .map(|(&xx, k)| input[(yy, xx)] * k)
                    .sum::<f32>()
            })
            .sum::<f32>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn ramp(w: usize, h: usize, fx: f32, fy: f32) -> IntensityField {
        IntensityField::from_matrix(na::DMatrix::from_fn(h, w, |y, x| {
            x as f32 * fx + y as f32 * fy
        }))
    }

    #[test]
    fn sobel_of_ramp() {
        let grad = GradientField::compute(&ramp(6, 5, 2.0, 0.0), &ramp(6, 5, 2.0, 0.0)).unwrap();

        assert_eq!(grad.dx.shape(), (5, 6));
        assert_eq!(grad.dt.shape(), (5, 6));

        // Interior pixels see a slope of 2 per pixel, amplified by the kernel gain of 8.
        assert_approx_eq!(grad.dx[(2, 3)], 16.0);
        assert_approx_eq!(grad.dy[(2, 3)], 0.0);

        // Replicated border halves the horizontal span.
        assert_approx_eq!(grad.dx[(2, 0)], 8.0);
        assert_approx_eq!(grad.dx[(2, 5)], 8.0);

        assert!(grad.dt.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn vertical_gradient_points_down() {
        let grad = GradientField::compute(&ramp(4, 4, 0.0, 1.0), &ramp(4, 4, 0.0, 1.0)).unwrap();

        assert_approx_eq!(grad.dy[(1, 1)], 8.0);
        assert_approx_eq!(grad.dx[(1, 1)], 0.0);
    }

    #[test]
    fn temporal_is_current_minus_reference() {
        let grad = GradientField::compute(&ramp(3, 3, 1.0, 0.0), &ramp(3, 3, 1.0, 1.0)).unwrap();

        assert_approx_eq!(grad.dt[(2, 1)], 2.0);
        assert_approx_eq!(grad.dt[(0, 2)], 0.0);
    }

    #[test]
    fn mismatched_dimensions() {
        let err = GradientField::compute(&ramp(4, 4, 1.0, 0.0), &ramp(4, 3, 1.0, 0.0)).unwrap_err();

        assert_eq!(
            err,
            FlowError::DimensionMismatch {
                previous: (4, 4),
                current: (4, 3)
            }
        );
    }
}
