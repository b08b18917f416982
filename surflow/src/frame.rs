//! # Raster frames and intensity fields

use crate::error::{FlowError, FlowResult};
use bytemuck::{Pod, Zeroable};
use nalgebra as na;

/// RGBA colour structure.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RGBA {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Immutable 3-channel, 8-bit raster frame.
///
/// Pixels are stored row-major as `[r, g, b]` triplets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Create a frame from a packed RGB buffer.
    ///
    /// # Arguments
    ///
    /// * `width` - width of the frame in pixels.
    /// * `height` - height of the frame in pixels.
    /// * `data` - `width * height * 3` bytes of row-major RGB data.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> FlowResult<Self> {
        let expected = width * height * 3;

        if width == 0 || height == 0 || data.len() != expected {
            return Err(FlowError::InvalidFrame {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a frame from decoder RGBA output.
    ///
    /// The alpha channel is dropped.
    ///
    /// # Arguments
    ///
    /// * `rgba` - row-major pixels.
    /// * `width` - width of the frame. Height is derived from the pixel count.
    pub fn from_rgba(rgba: &[RGBA], width: usize) -> FlowResult<Self> {
        if width == 0 || rgba.len() % width != 0 {
            return Err(FlowError::InvalidFrame {
                expected: width * 4,
                actual: bytemuck::cast_slice::<_, u8>(rgba).len(),
            });
        }

        let data = rgba.iter().flat_map(|p| [p.r, p.g, p.b]).collect();

        Self::new(width, rgba.len() / width, data)
    }

    /// Create a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> [u8; 3],
    ) -> FlowResult<Self> {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .flat_map(|(x, y)| f(x, y))
            .collect();

        Self::new(width, height, data)
    }

    /// Get width and height of the frame.
    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the `[r, g, b]` value at the given coordinates.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }
}

#[cfg(feature = "visualize")]
impl TryFrom<&image::RgbImage> for Frame {
    type Error = FlowError;

    fn try_from(img: &image::RgbImage) -> FlowResult<Self> {
        Self::new(
            img.width() as usize,
            img.height() as usize,
            img.as_raw().clone(),
        )
    }
}

/// Single channel intensity field.
///
/// Stored as a `height x width` matrix, so that `(row, column)` indexing maps to `(y, x)`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityField {
    field: na::DMatrix<f32>,
}

impl IntensityField {
    /// Convert a frame to grayscale.
    ///
    /// Every cell holds the mean of the three channel values of its pixel.
    pub fn from_frame(frame: &Frame) -> Self {
        let (width, height) = frame.dim();

        Self::from_matrix(na::DMatrix::from_fn(height, width, |y, x| {
            let [r, g, b] = frame.pixel(x, y);
            (r as f32 + g as f32 + b as f32) / 3.0
        }))
    }

    /// Wrap an existing `height x width` matrix.
    pub fn from_matrix(field: na::DMatrix<f32>) -> Self {
        Self { field }
    }

    /// Get width and height of the field.
    pub fn dim(&self) -> (usize, usize) {
        (self.field.ncols(), self.field.nrows())
    }

    pub fn as_matrix(&self) -> &na::DMatrix<f32> {
        &self.field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn rejects_short_buffers() {
        assert_eq!(
            Frame::new(4, 4, vec![0; 47]),
            Err(FlowError::InvalidFrame {
                expected: 48,
                actual: 47
            })
        );
        assert!(Frame::new(0, 4, vec![]).is_err());
    }

    #[test]
    fn rgba_drops_alpha() {
        let pixels = (0..6)
            .map(|i| RGBA {
                r: i,
                g: i + 1,
                b: i + 2,
                a: 17,
            })
            .collect::<Vec<_>>();

        let frame = Frame::from_rgba(&pixels, 3).unwrap();

        assert_eq!(frame.dim(), (3, 2));
        assert_eq!(frame.pixel(1, 1), [4, 5, 6]);

        assert!(Frame::from_rgba(&pixels, 4).is_err());
    }

    #[cfg(feature = "visualize")]
    #[test]
    fn images_go_through_validation() {
        let img = image::RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let frame = Frame::try_from(&img).unwrap();

        assert_eq!(frame.dim(), (3, 2));
        assert_eq!(frame.pixel(2, 1), [2, 1, 7]);

        assert_eq!(
            Frame::try_from(&image::RgbImage::new(0, 4)),
            Err(FlowError::InvalidFrame {
                expected: 0,
                actual: 0
            })
        );
    }

    #[test]
    fn grayscale_is_channel_mean() {
        let frame = Frame::from_fn(5, 3, |x, y| [x as u8 * 10, y as u8 * 20, 90]).unwrap();
        let field = IntensityField::from_frame(&frame);

        assert_eq!(field.dim(), (5, 3));
        assert_approx_eq!(field.as_matrix()[(2, 4)], (40.0 + 40.0 + 90.0) / 3.0);
        assert_approx_eq!(field.as_matrix()[(0, 0)], 30.0);
    }
}
