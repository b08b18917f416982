//! # Grid flow field

use nalgebra::*;

/// Pair containing normalised cell coordinates and motion at them.
pub type MotionEntry = (Point2<f32>, Vector2<f32>);

/// Calibrated motion of a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlowVector {
    /// Raw normal equation solution `(u, v)`.
    ///
    /// The gradient kernels carry a gain of 8 and the temporal difference enters the equations
    /// unnegated, so content translating by `d` pixels between the frames solves to roughly
    /// `-d / 8`. The calibration factor absorbs this scale.
    pub motion: Vector2<f32>,
    /// Calibrated speed, within `[0; max_speed]`.
    pub speed: f32,
    /// `atan2(v, u)` in radians.
    pub direction: f32,
}

/// Fixed size grid of calibrated flow vectors.
///
/// Produced in one piece from a single frame pair.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowField {
    vf: Matrix2xX<f32>,
    speeds: Vec<f32>,
    width: usize,
}

impl FlowField {
    /// Assemble a field from row-major cell vectors.
    ///
    /// # Arguments
    ///
    /// * `grid_size` - number of cells along each axis.
    /// * `vectors` - `grid_size * grid_size` vectors, in row-major order.
    pub(crate) fn from_vectors(grid_size: usize, vectors: &[FlowVector]) -> Self {
        debug_assert_eq!(vectors.len(), grid_size * grid_size);

        Self {
            vf: Matrix2xX::from_iterator(
                vectors.len(),
                vectors.iter().flat_map(|v| [v.motion.x, v.motion.y]),
            ),
            speeds: vectors.iter().map(|v| v.speed).collect(),
            width: grid_size,
        }
    }

    /// Get width and height of the field, in cells.
    pub fn dim(&self) -> (usize, usize) {
        if self.width == 0 {
            (0, 0)
        } else {
            (self.width, self.vf.ncols() / self.width)
        }
    }

    /// Get size of the field.
    ///
    /// This is the same as `grid_size * grid_size`
    pub fn size(&self) -> usize {
        self.vf.ncols()
    }

    /// Get calibrated speeds in row-major order.
    pub fn speeds(&self) -> &[f32] {
        &self.speeds
    }

    /// Get raw motion at the given cell.
    ///
    /// # Arguments
    ///
    /// * `x` - cell column.
    /// * `y` - cell row.
    pub fn get_motion(&self, x: usize, y: usize) -> Vector2<f32> {
        self.vf.column(self.width * y + x).into()
    }

    /// Get the flow vector at the given cell.
    ///
    /// # Arguments
    ///
    /// * `x` - cell column.
    /// * `y` - cell row.
    pub fn get(&self, x: usize, y: usize) -> FlowVector {
        let motion = self.get_motion(x, y);
        FlowVector {
            motion,
            speed: self.speeds[self.width * y + x],
            direction: motion.y.atan2(motion.x),
        }
    }

    /// Iterate every element of the field.
    ///
    /// The resulting iterator yields `(x, y, vector)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, FlowVector)> + '_ {
        let (width, height) = self.dim();
        (0..height).flat_map(move |y| (0..width).map(move |x| (x, y, self.get(x, y))))
    }

    /// Iterate flow vectors in row-major order.
    pub fn vectors(&self) -> impl Iterator<Item = FlowVector> + '_ {
        self.iter().map(|(_, _, v)| v)
    }

    /// Iterate raw motion at normalised cell centres.
    ///
    /// Positions are in 0-1 range.
    pub fn motion_iter(&self) -> impl Iterator<Item = MotionEntry> + '_ {
        let (width, height) = self.dim();
        self.iter().map(move |(x, y, v)| {
            (
                Point2::new(
                    (x as f32 + 0.5) / width as f32,
                    (y as f32 + 0.5) / height as f32,
                ),
                v.motion,
            )
        })
    }
}
