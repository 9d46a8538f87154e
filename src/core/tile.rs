//! Tile-level application of the calibration transform.
//!
//! A tile is a window into caller-owned buffers. Every buffer records the
//! raster position of its first element, so a window given in raster
//! coordinates can be resolved against buffers of any extent, from a single
//! tile up to a full scene.

use crate::config::{CalibrationMode, TileConfig};
use crate::core::calibrate::{calibrate, Calibrator};
use crate::core::gain_lut::GainLut;
use crate::core::units::{self, Sample};
use crate::types::{Polarization, SampleUnit, SarComplex, SarError, SarResult, TileWindow};
use ndarray::{s, ArrayView2, ArrayViewMut2, Axis};
use num_traits::Float;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation, polled between tiles
pub trait CancelCheck: Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancelCheck for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F> CancelCheck for F
where
    F: Fn() -> bool + Sync,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Read-only samples positioned in raster coordinates
#[derive(Debug, Clone)]
pub struct TileBuffer<'a, T> {
    data: ArrayView2<'a, T>,
    origin_x: usize,
    origin_y: usize,
}

impl<'a, T> TileBuffer<'a, T> {
    /// `data[[0, 0]]` holds raster pixel `(origin.0, origin.1)`
    pub fn new(data: ArrayView2<'a, T>, origin: (usize, usize)) -> Self {
        Self {
            data,
            origin_x: origin.0,
            origin_y: origin.1,
        }
    }

    pub fn origin(&self) -> (usize, usize) {
        (self.origin_x, self.origin_y)
    }

    pub fn extent(&self) -> TileWindow {
        let (rows, cols) = self.data.dim();
        TileWindow::new(self.origin_x, self.origin_y, cols, rows)
    }

    fn window_view(&self, window: TileWindow, name: &str) -> SarResult<ArrayView2<'_, T>> {
        check_contains(self.extent(), window, name)?;
        let (r0, c0) = (window.y0 - self.origin_y, window.x0 - self.origin_x);
        Ok(self.data.slice(s![r0..r0 + window.height, c0..c0 + window.width]))
    }
}

/// Writable samples positioned in raster coordinates
#[derive(Debug)]
pub struct TileBufferMut<'a, T> {
    data: ArrayViewMut2<'a, T>,
    origin_x: usize,
    origin_y: usize,
}

impl<'a, T> TileBufferMut<'a, T> {
    pub fn new(data: ArrayViewMut2<'a, T>, origin: (usize, usize)) -> Self {
        Self {
            data,
            origin_x: origin.0,
            origin_y: origin.1,
        }
    }

    pub fn extent(&self) -> TileWindow {
        let (rows, cols) = self.data.dim();
        TileWindow::new(self.origin_x, self.origin_y, cols, rows)
    }

    fn window_view_mut(&mut self, window: TileWindow) -> SarResult<ArrayViewMut2<'_, T>> {
        check_contains(self.extent(), window, "target")?;
        let (r0, c0) = (window.y0 - self.origin_y, window.x0 - self.origin_x);
        Ok(self.data.slice_mut(s![r0..r0 + window.height, c0..c0 + window.width]))
    }
}

/// Source layout: one detected band or an I/Q pair
#[derive(Debug, Clone)]
pub enum SourceTile<'a, T> {
    Detected(TileBuffer<'a, T>),
    Complex { i: TileBuffer<'a, T>, q: TileBuffer<'a, T> },
}

impl<'a, T> SourceTile<'a, T> {
    fn validate_layout(&self) -> SarResult<()> {
        if let SourceTile::Complex { i, q } = self {
            if i.extent() != q.extent() {
                return Err(SarError::Configuration(format!(
                    "I/Q buffers disagree: {:?} vs {:?}",
                    i.extent(),
                    q.extent()
                )));
            }
        }
        Ok(())
    }
}

fn check_contains(extent: TileWindow, window: TileWindow, name: &str) -> SarResult<()> {
    let inside = window.x0 >= extent.x0
        && window.y0 >= extent.y0
        && window.max_x() <= extent.max_x()
        && window.max_y() <= extent.max_y();
    if !inside {
        return Err(SarError::Configuration(format!(
            "Window {:?} exceeds {} buffer {:?}",
            window, name, extent
        )));
    }
    Ok(())
}

fn check_units(
    complex_layout: bool,
    source_unit: SampleUnit,
    target_unit: SampleUnit,
    mode: &CalibrationMode,
) -> SarResult<()> {
    match source_unit {
        SampleUnit::Other => return Err(SarError::UnsupportedUnit(source_unit)),
        unit if unit.is_complex() != complex_layout => {
            return Err(SarError::Configuration(format!(
                "Source unit {} does not match the {} buffer layout",
                unit,
                if complex_layout { "I/Q" } else { "single-band" }
            )));
        }
        _ => {}
    }
    if mode.output_complex && !target_unit.is_complex() {
        return Err(SarError::UnsupportedUnit(target_unit));
    }
    Ok(())
}

#[inline]
fn to_f64<S: Float>(v: S) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

/// Calibrate `window` of `source` into `target`.
///
/// Gains depend only on the column, so they are resolved once for the
/// window's absolute column range and reused for every row. Only the target
/// window is written. A missing `lut` is legal and leaves samples
/// uncorrected.
pub fn calibrate_tile<S: Float, T: Float>(
    source: &SourceTile<'_, S>,
    target: &mut TileBufferMut<'_, T>,
    window: TileWindow,
    source_unit: SampleUnit,
    target_unit: SampleUnit,
    lut: Option<&GainLut>,
    mode: &CalibrationMode,
) -> SarResult<()> {
    mode.validate()?;
    source.validate_layout()?;
    check_units(
        matches!(source, SourceTile::Complex { .. }),
        source_unit,
        target_unit,
        mode,
    )?;
    if window.is_empty() {
        return Ok(());
    }

    let gains = match lut {
        Some(lut) => Some(lut.gains((window.x0 + mode.column_offset) as i64, window.width)?),
        None => {
            log::debug!("No gain LUT for tile {:?}, samples left uncorrected", window);
            None
        }
    };
    let offset = lut.map_or(0.0, |lut| lut.offset());
    let keep_phase = mode.output_complex;

    let mut out = target.window_view_mut(window)?;

    match source {
        SourceTile::Detected(band) => {
            let src = band.window_view(window, "source")?;
            for ((r, c), value) in out.indexed_iter_mut() {
                let sample = Sample::Single(to_f64(src[[r, c]]));
                let n = units::normalize(sample, source_unit, target_unit, keep_phase)?;
                let sigma = calibrate(n, gains.as_ref().map(|g| g[c]), offset, mode);
                *value = num_traits::cast(sigma).unwrap_or_else(T::nan);
            }
        }
        SourceTile::Complex { i, q } => {
            let src_i = i.window_view(window, "in-phase")?;
            let src_q = q.window_view(window, "quadrature")?;
            for ((r, c), value) in out.indexed_iter_mut() {
                let z = SarComplex::new(to_f64(src_i[[r, c]]), to_f64(src_q[[r, c]]));
                let n = units::normalize(Sample::Pair(z), source_unit, target_unit, keep_phase)?;
                let sigma = calibrate(n, gains.as_ref().map(|g| g[c]), offset, mode);
                *value = num_traits::cast(sigma).unwrap_or_else(T::nan);
            }
        }
    }

    Ok(())
}

/// Copy `window` unchanged, for bands that are already calibrated
pub fn passthrough_tile<T: Clone>(
    source: &TileBuffer<'_, T>,
    target: &mut TileBufferMut<'_, T>,
    window: TileWindow,
) -> SarResult<()> {
    let src = source.window_view(window, "source")?;
    target.window_view_mut(window)?.assign(&src);
    Ok(())
}

/// Calibrate every tile of `target`.
///
/// The target is split into bands of `tile_height` rows, each band into
/// tiles of `tile_width` columns. Bands run concurrently with the `parallel`
/// feature. `cancel` is polled before each tile; tiles finished before
/// cancellation keep their output.
#[allow(clippy::too_many_arguments)]
pub fn calibrate_raster<S, T>(
    calibrator: &Calibrator,
    source: &SourceTile<'_, S>,
    target: &mut TileBufferMut<'_, T>,
    source_unit: SampleUnit,
    target_unit: SampleUnit,
    polarization: Polarization,
    config: &TileConfig,
    cancel: Option<&dyn CancelCheck>,
) -> SarResult<()>
where
    S: Float + Sync,
    T: Float + Send,
{
    if config.tile_width == 0 || config.tile_height == 0 {
        return Err(SarError::Configuration(format!(
            "Tile size must be non-zero, got {}x{}",
            config.tile_width, config.tile_height
        )));
    }

    let extent = target.extent();
    log::info!(
        "Calibrating {} {}x{} raster in {}x{} tiles",
        polarization,
        extent.width,
        extent.height,
        config.tile_width,
        config.tile_height
    );

    let process_band = |(band_idx, band): (usize, ArrayViewMut2<'_, T>)| -> SarResult<()> {
        let y0 = extent.y0 + band_idx * config.tile_height;
        let height = band.nrows();
        let mut band = TileBufferMut::new(band, (extent.x0, y0));

        let mut x0 = extent.x0;
        while x0 < extent.max_x() {
            if cancel.map_or(false, |check| check.is_cancelled()) {
                return Err(SarError::Cancelled);
            }
            let width = config.tile_width.min(extent.max_x() - x0);
            let window = TileWindow::new(x0, y0, width, height);
            calibrator.calibrate_tile(source, &mut band, window, source_unit, target_unit, polarization)?;
            x0 += width;
        }
        Ok(())
    };

    let bands = target
        .data
        .axis_chunks_iter_mut(Axis(0), config.tile_height)
        .enumerate();

    #[cfg(feature = "parallel")]
    let result = {
        use rayon::prelude::*;
        bands.par_bridge().try_for_each(process_band)
    };
    #[cfg(not(feature = "parallel"))]
    let result = bands.map(process_band).collect::<SarResult<()>>();

    match &result {
        Ok(()) => log::info!("Raster calibration of {} completed", polarization),
        Err(e) => log::warn!("Raster calibration of {} stopped: {}", polarization, e),
    }
    result
}
