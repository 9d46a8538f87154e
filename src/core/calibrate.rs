use crate::config::CalibrationMode;
use crate::core::gain_lut::GainLutMap;
use crate::core::incidence::IncidenceAngleSurface;
use crate::core::tile::{self, SourceTile, TileBufferMut};
use crate::core::units::{self, Normalized};
use crate::types::{IncidenceAngleMode, Polarization, SampleUnit, SarError, SarResult, TileWindow};
use num_traits::Float;

/// Values below this are not log-scaled; the dB output is pinned to its negative.
pub const UNDERFLOW_FLOOR: f64 = 1.0e-30;

/// Apply the gain/offset correction to one normalised sample.
///
/// Complex sources are divided by the squared gain and, for complex output,
/// rescaled to the target component with the phase fraction. Detected
/// sources get the additive offset first and are divided by the plain gain.
/// A missing gain leaves the value uncorrected.
#[inline]
pub fn calibrate(sample: Normalized, gain: Option<f64>, offset: f64, mode: &CalibrationMode) -> f64 {
    let mut sigma = if mode.is_complex_source {
        let mut sigma = match gain {
            Some(g) => sample.intensity / (g * g),
            None => sample.intensity,
        };
        if mode.output_complex {
            sigma = sigma.sqrt() * sample.phase_fraction;
        }
        sigma
    } else {
        let sigma = sample.intensity + offset;
        match gain {
            Some(g) => sigma / g,
            None => sigma,
        }
    };

    if mode.output_in_db {
        sigma = if sigma < UNDERFLOW_FLOOR {
            -UNDERFLOW_FLOOR
        } else {
            units::linear_to_db(sigma)
        };
    }
    sigma
}

/// Multiply by sin(local incidence angle) when angles come from the DEM
#[inline]
pub fn apply_forward(sigma: f64, local_incidence_angle_deg: f64, mode: &CalibrationMode) -> f64 {
    match mode.incidence_angle_mode {
        IncidenceAngleMode::FromDEM => sigma * local_incidence_angle_deg.to_radians().sin(),
        IncidenceAngleMode::FromEllipsoid => sigma,
    }
}

/// Undo [`apply_forward`] (retro-calibration)
#[inline]
pub fn apply_reverse(value: f64, pixel_incidence_angle_deg: f64, mode: &CalibrationMode) -> f64 {
    match mode.incidence_angle_mode {
        IncidenceAngleMode::FromDEM => value / pixel_incidence_angle_deg.to_radians().sin(),
        IncidenceAngleMode::FromEllipsoid => value,
    }
}

/// Calibration engine for one processing run: the LUT map plus the run's mode.
///
/// Both are immutable after construction, so a `&Calibrator` can be shared
/// across worker threads calibrating disjoint tiles.
#[derive(Debug, Clone)]
pub struct Calibrator {
    luts: GainLutMap,
    mode: CalibrationMode,
}

impl Calibrator {
    pub fn new(luts: GainLutMap, mode: CalibrationMode) -> SarResult<Self> {
        mode.validate()?;
        log::info!(
            "Calibrator ready: {} LUTs, complex source: {}, complex output: {}, dB: {}",
            luts.len(),
            mode.is_complex_source,
            mode.output_complex,
            mode.output_in_db
        );
        Ok(Self { luts, mode })
    }

    pub fn mode(&self) -> &CalibrationMode {
        &self.mode
    }

    pub fn luts(&self) -> &GainLutMap {
        &self.luts
    }

    /// Calibrate `window` of `source` into `target`
    pub fn calibrate_tile<S: Float, T: Float>(
        &self,
        source: &SourceTile<'_, S>,
        target: &mut TileBufferMut<'_, T>,
        window: TileWindow,
        source_unit: SampleUnit,
        target_unit: SampleUnit,
        polarization: Polarization,
    ) -> SarResult<()> {
        tile::calibrate_tile(
            source,
            target,
            window,
            source_unit,
            target_unit,
            self.luts.get(polarization),
            &self.mode,
        )
    }

    /// Calibrate a single sample at an arbitrary range/azimuth position.
    ///
    /// The gain is taken at the nearest range column. No dB or complex
    /// conversion is applied; the result is the linear value scaled by the
    /// forward incidence factor.
    pub fn calibrate_point(
        &self,
        sample: f64,
        range_index: f64,
        azimuth_index: f64,
        unit: SampleUnit,
        polarization: Polarization,
        local_incidence_angle: f64,
    ) -> SarResult<f64> {
        if !range_index.is_finite() {
            return Err(SarError::Configuration(format!(
                "Range index must be finite, got {}",
                range_index
            )));
        }
        let intensity = units::normalize_point(sample, unit)?;

        let lut = self.luts.get(polarization);
        let gain = match lut {
            Some(lut) => Some(lut.gain_at(range_index.round() as i64)?),
            None => {
                log::debug!(
                    "No gain LUT for {} at ({}, {}), value left uncorrected",
                    polarization,
                    range_index,
                    azimuth_index
                );
                None
            }
        };
        let offset = lut.map_or(0.0, |lut| lut.offset());

        let point_mode = CalibrationMode {
            output_complex: false,
            output_in_db: false,
            ..self.mode
        };
        let sigma = calibrate(Normalized::intensity(intensity), gain, offset, &point_mode);

        Ok(apply_forward(sigma, local_incidence_angle, &self.mode))
    }

    /// Remove the incidence factor from `value` using the angle surface at (x, y)
    pub fn reverse_incidence_correction<A: IncidenceAngleSurface + ?Sized>(
        &self,
        value: f64,
        x: f64,
        y: f64,
        surface: &A,
    ) -> f64 {
        match self.mode.incidence_angle_mode {
            IncidenceAngleMode::FromDEM => apply_reverse(value, surface.angle_at(x, y), &self.mode),
            IncidenceAngleMode::FromEllipsoid => value,
        }
    }
}

/// Point-wise retro-calibration for a known pixel incidence angle
pub fn reverse_incidence_correction(value: f64, pixel_incidence_angle: f64, mode: &CalibrationMode) -> f64 {
    apply_reverse(value, pixel_incidence_angle, mode)
}
