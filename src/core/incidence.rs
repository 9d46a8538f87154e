use crate::types::{SarError, SarResult};
use ndarray::Array2;

/// Per-pixel local incidence angle (degrees), queryable at arbitrary raster positions
pub trait IncidenceAngleSurface {
    fn angle_at(&self, x: f64, y: f64) -> f64;
}

/// Sub-sampled angle grid with bilinear interpolation between tie points
#[derive(Debug, Clone)]
pub struct TiePointGrid {
    /// Tie-point values, indexed [row, column]
    values: Array2<f64>,
    offset_x: f64,
    offset_y: f64,
    sub_sampling_x: f64,
    sub_sampling_y: f64,
}

impl TiePointGrid {
    pub fn new(
        values: Array2<f64>,
        offset: (f64, f64),
        sub_sampling: (f64, f64),
    ) -> SarResult<Self> {
        if values.is_empty() {
            return Err(SarError::Configuration("Empty tie-point grid".to_string()));
        }
        if sub_sampling.0 <= 0.0 || sub_sampling.1 <= 0.0 {
            return Err(SarError::Configuration(format!(
                "Tie-point sub-sampling must be positive, got {:?}",
                sub_sampling
            )));
        }
        Ok(Self {
            values,
            offset_x: offset.0,
            offset_y: offset.1,
            sub_sampling_x: sub_sampling.0,
            sub_sampling_y: sub_sampling.1,
        })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }
}

impl IncidenceAngleSurface for TiePointGrid {
    fn angle_at(&self, x: f64, y: f64) -> f64 {
        let (rows, cols) = self.values.dim();

        // Grid coordinates, clamped so edge pixels reuse the border tie points
        let gx = ((x - self.offset_x) / self.sub_sampling_x).clamp(0.0, (cols - 1) as f64);
        let gy = ((y - self.offset_y) / self.sub_sampling_y).clamp(0.0, (rows - 1) as f64);

        let j0 = gx.floor() as usize;
        let i0 = gy.floor() as usize;
        let j1 = (j0 + 1).min(cols - 1);
        let i1 = (i0 + 1).min(rows - 1);

        let fj = gx - j0 as f64;
        let fi = gy - i0 as f64;

        self.values[[i0, j0]] * (1.0 - fi) * (1.0 - fj)
            + self.values[[i1, j0]] * fi * (1.0 - fj)
            + self.values[[i0, j1]] * (1.0 - fi) * fj
            + self.values[[i1, j1]] * fi * fj
    }
}

/// Full-resolution angle raster, nearest pixel
impl IncidenceAngleSurface for Array2<f64> {
    fn angle_at(&self, x: f64, y: f64) -> f64 {
        let (rows, cols) = self.dim();
        if rows == 0 || cols == 0 {
            return f64::NAN;
        }
        let i = (y.round().max(0.0) as usize).min(rows - 1);
        let j = (x.round().max(0.0) as usize).min(cols - 1);
        self[[i, j]]
    }
}
