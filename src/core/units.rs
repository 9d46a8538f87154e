//! Reduction of band encodings to linear intensity

use crate::types::{SampleUnit, SarComplex, SarError, SarResult};

/// One raw source sample: a single value or an I/Q pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Single(f64),
    Pair(SarComplex),
}

/// Linear intensity plus, for complex output, the phase fraction of the target component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub intensity: f64,
    pub phase_fraction: f64,
}

impl Normalized {
    pub fn intensity(intensity: f64) -> Self {
        Self {
            intensity,
            phase_fraction: 0.0,
        }
    }
}

#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// Convert a sample to linear intensity.
///
/// `target` selects the component whose phase fraction is returned for
/// complex pairs; the fraction is only computed when `keep_phase` is set.
pub fn normalize(
    sample: Sample,
    unit: SampleUnit,
    target: SampleUnit,
    keep_phase: bool,
) -> SarResult<Normalized> {
    match (unit, sample) {
        (SampleUnit::Amplitude, Sample::Single(v)) => Ok(Normalized::intensity(v * v)),
        (SampleUnit::Intensity, Sample::Single(v)) => Ok(Normalized::intensity(v)),
        (SampleUnit::IntensityDB, Sample::Single(v)) => Ok(Normalized::intensity(db_to_linear(v))),
        (SampleUnit::Real | SampleUnit::Imaginary, Sample::Pair(z)) => {
            let intensity = z.norm_sqr();
            let phase_fraction = if keep_phase {
                phase_fraction(z, intensity, target)?
            } else {
                0.0
            };
            Ok(Normalized {
                intensity,
                phase_fraction,
            })
        }
        (SampleUnit::Real | SampleUnit::Imaginary, Sample::Single(_)) => Err(SarError::Configuration(
            format!("{} samples must be read as an I/Q pair", unit),
        )),
        (unit, _) => Err(SarError::UnsupportedUnit(unit)),
    }
}

/// Share of the magnitude carried by the target component
pub fn phase_fraction(z: SarComplex, intensity: f64, target: SampleUnit) -> SarResult<f64> {
    if intensity <= 0.0 {
        return Ok(0.0);
    }
    match target {
        SampleUnit::Real => Ok(z.re / intensity.sqrt()),
        SampleUnit::Imaginary => Ok(z.im / intensity.sqrt()),
        other => Err(SarError::UnsupportedUnit(other)),
    }
}

/// Point-wise normalisation: I/Q components are taken as intensity values.
pub fn normalize_point(value: f64, unit: SampleUnit) -> SarResult<f64> {
    match unit {
        SampleUnit::Amplitude => Ok(value * value),
        SampleUnit::Intensity | SampleUnit::Real | SampleUnit::Imaginary => Ok(value),
        SampleUnit::IntensityDB => Ok(db_to_linear(value)),
        other => Err(SarError::UnsupportedUnit(other)),
    }
}
