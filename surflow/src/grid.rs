//! # Grid sampling
//!
//! A frame is split into a fixed `grid_size x grid_size` lattice. Each cell samples a square
//! window centred on its lattice point, clipped against the frame bounds.

use nalgebra as na;

/// Pixel window, with inclusive start and exclusive end bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Window {
    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    /// Number of rows covered.
    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }
}

/// Single lattice cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    /// Centre pixel, `x` being the column.
    pub center: na::Point2<usize>,
    pub window: Window,
}

/// Grid geometry of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSampler {
    width: usize,
    height: usize,
    grid_size: usize,
    window_size: usize,
}

impl GridSampler {
    /// Create a new sampler.
    ///
    /// # Arguments
    ///
    /// * `width` - frame width in pixels.
    /// * `height` - frame height in pixels.
    /// * `grid_size` - number of cells along each axis. Must be at least 1.
    /// * `window_size` - side of each sample window in pixels. Must be at least 1.
    pub fn new(width: usize, height: usize, grid_size: usize, window_size: usize) -> Self {
        Self {
            width,
            height,
            grid_size,
            window_size,
        }
    }

    /// Get the cell at the given lattice position.
    pub fn cell(&self, row: usize, col: usize) -> GridCell {
        let n = self.grid_size as f64;
        let cx = ((col as f64 + 0.5) * self.width as f64 / n).floor() as usize;
        let cy = ((row as f64 + 0.5) * self.height as f64 / n).floor() as usize;

        let (x0, x1) = clip_span(cx, self.window_size, self.width);
        let (y0, y1) = clip_span(cy, self.window_size, self.height);

        GridCell {
            row,
            col,
            center: na::Point2::new(cx, cy),
            window: Window { x0, y0, x1, y1 },
        }
    }

    /// Iterate all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.grid_size)
            .flat_map(move |row| (0..self.grid_size).map(move |col| self.cell(row, col)))
    }
}

/// Span of `size` pixels centred at `center`, clipped to `[0; limit)`.
fn clip_span(center: usize, size: usize, limit: usize) -> (usize, usize) {
    let start = center as isize - (size / 2) as isize;
    let end = start + size as isize;
    (start.max(0) as usize, (end.max(0) as usize).min(limit))
}
