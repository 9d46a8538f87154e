use crate::types::{Polarization, SarError, SarResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Raw LUT fields as extracted from auxiliary calibration data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainLutParams {
    pub first_index: i64,
    pub step: i64,
    pub count: usize,
    pub offset: f64,
    pub values: Vec<f64>,
}

/// Range-dependent antenna pattern gains for one polarization.
///
/// Lookup is a step function: column `x` maps to
/// `values[(x - first_index) / step]`, so consecutive columns share the same
/// gain when `step > 1`. There is no interpolation between breakpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct GainLut {
    first_index: i64,
    /// One past the last covered column
    end_index: i64,
    step: i64,
    offset: f64,
    values: Vec<f64>,
}

impl GainLut {
    /// Validate params and build an immutable table
    pub fn new(params: GainLutParams) -> SarResult<Self> {
        if params.step <= 0 {
            return Err(SarError::Configuration(format!(
                "LUT step must be positive, got {}",
                params.step
            )));
        }
        if params.count == 0 || params.values.is_empty() {
            return Err(SarError::Configuration("LUT has no gain values".to_string()));
        }
        if params.values.len() != params.count {
            return Err(SarError::Configuration(format!(
                "LUT declares {} values but carries {}",
                params.count,
                params.values.len()
            )));
        }

        let end_index = i64::try_from(params.count)
            .ok()
            .and_then(|count| count.checked_mul(params.step))
            .and_then(|span| params.first_index.checked_add(span))
            .ok_or_else(|| {
                SarError::Configuration(format!(
                    "LUT coverage overflows: first column {}, step {}, {} values",
                    params.first_index, params.step, params.count
                ))
            })?;

        Ok(Self {
            first_index: params.first_index,
            end_index,
            step: params.step,
            offset: params.offset,
            values: params.values,
        })
    }

    pub fn first_index(&self) -> i64 {
        self.first_index
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Additive offset applied to detected data before the gain
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Declared column coverage `[first_index, first_index + step * count)`
    pub fn coverage(&self) -> Range<i64> {
        self.first_index..self.end_index
    }

    /// Gain for a single absolute column
    pub fn gain_at(&self, column: i64) -> SarResult<f64> {
        let index = column.saturating_sub(self.first_index).div_euclid(self.step);
        if !self.coverage().contains(&column) {
            return Err(SarError::OutOfDomain {
                column,
                index,
                count: self.values.len(),
            });
        }
        Ok(self.values[index as usize])
    }

    /// Gains for the absolute columns `[x0, x0 + width)`
    pub fn gains(&self, x0: i64, width: usize) -> SarResult<Vec<f64>> {
        let end = i64::try_from(width)
            .ok()
            .and_then(|width| x0.checked_add(width))
            .ok_or_else(|| {
                SarError::Configuration(format!("Column range {} + {} overflows", x0, width))
            })?;
        (x0..end).map(|x| self.gain_at(x)).collect()
    }
}

/// Per-polarization LUTs for one processing run
#[derive(Debug, Clone, Default)]
pub struct GainLutMap {
    luts: HashMap<Polarization, GainLut>,
}

impl GainLutMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; each polarization may appear only once
    pub fn insert(&mut self, polarization: Polarization, lut: GainLut) -> SarResult<()> {
        if self.luts.contains_key(&polarization) {
            return Err(SarError::Configuration(format!(
                "Duplicate gain LUT for polarization {}",
                polarization
            )));
        }
        log::debug!(
            "Gain LUT {}: {} values, first column {}, step {}",
            polarization,
            lut.count(),
            lut.first_index(),
            lut.step()
        );
        self.luts.insert(polarization, lut);
        Ok(())
    }

    /// Build from raw params
    pub fn from_params<I>(entries: I) -> SarResult<Self>
    where
        I: IntoIterator<Item = (Polarization, GainLutParams)>,
    {
        let mut map = Self::new();
        for (polarization, params) in entries {
            map.insert(polarization, GainLut::new(params)?)?;
        }
        log::info!("Loaded gain LUTs for {} polarizations", map.len());
        Ok(map)
    }

    pub fn get(&self, polarization: Polarization) -> Option<&GainLut> {
        self.luts.get(&polarization)
    }

    pub fn len(&self) -> usize {
        self.luts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.luts.is_empty()
    }

    pub fn polarizations(&self) -> impl Iterator<Item = Polarization> + '_ {
        self.luts.keys().copied()
    }
}

/// Build a single LUT from its params
pub fn build_lut(params: GainLutParams) -> SarResult<GainLut> {
    GainLut::new(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(first_index: i64, step: i64, values: Vec<f64>) -> GainLutParams {
        GainLutParams {
            first_index,
            step,
            count: values.len(),
            offset: 0.0,
            values,
        }
    }

    #[test]
    fn test_step_function_lookup() {
        let lut = build_lut(params(0, 4, vec![1.0, 2.0, 3.0])).unwrap();
        let gains = lut.gains(0, 8).unwrap();
        assert_eq!(gains, vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_lookup_with_first_index() {
        let lut = build_lut(params(10, 2, vec![5.0, 6.0, 7.0])).unwrap();
        assert_eq!(lut.gains(11, 4).unwrap(), vec![5.0, 6.0, 6.0, 7.0]);
        assert_eq!(lut.coverage(), 10..16);
    }

    #[test]
    fn test_out_of_range_query() {
        let lut = build_lut(params(0, 4, vec![1.0, 2.0, 3.0])).unwrap();
        assert!(lut.gain_at(11).is_ok());
        assert!(matches!(
            lut.gain_at(12),
            Err(SarError::OutOfDomain { index: 3, count: 3, .. })
        ));
        assert!(lut.gains(10, 4).is_err());
    }

    #[test]
    fn test_column_before_first_index() {
        let lut = build_lut(params(8, 4, vec![1.0, 2.0])).unwrap();
        // 7 - 8 = -1 must not truncate towards zero into index 0
        assert!(matches!(
            lut.gain_at(7),
            Err(SarError::OutOfDomain { index: -1, .. })
        ));
    }

    #[test]
    fn test_malformed_params() {
        assert!(build_lut(params(0, 0, vec![1.0])).is_err());
        assert!(build_lut(params(0, 1, vec![])).is_err());

        let mut mismatched = params(0, 1, vec![1.0, 2.0]);
        mismatched.count = 3;
        assert!(build_lut(mismatched).is_err());
    }

    #[test]
    fn test_overflowing_coverage_rejected() {
        let result = build_lut(params(0, i64::MAX / 2, vec![1.0, 2.0, 3.0]));
        assert!(matches!(result, Err(SarError::Configuration(_))));

        let result = build_lut(params(i64::MAX - 1, 1, vec![1.0, 2.0]));
        assert!(matches!(result, Err(SarError::Configuration(_))));
    }

    #[test]
    fn test_extreme_columns_are_out_of_domain() {
        let lut = build_lut(params(i64::MAX - 4, 2, vec![1.0, 2.0])).unwrap();
        assert_eq!(lut.coverage(), i64::MAX - 4..i64::MAX);
        assert_eq!(lut.gain_at(i64::MAX - 1).unwrap(), 2.0);
        assert!(matches!(lut.gain_at(i64::MAX), Err(SarError::OutOfDomain { .. })));
        assert!(matches!(lut.gain_at(i64::MIN), Err(SarError::OutOfDomain { .. })));
        assert!(matches!(lut.gains(i64::MAX - 2, 4), Err(SarError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_polarization_rejected() {
        let entries = vec![
            (Polarization::HH, params(0, 1, vec![1.0])),
            (Polarization::HH, params(0, 1, vec![2.0])),
        ];
        assert!(GainLutMap::from_params(entries).is_err());
    }

    #[test]
    fn test_missing_polarization_is_absent() {
        let map = GainLutMap::from_params(vec![(Polarization::HH, params(0, 1, vec![1.0]))]).unwrap();
        assert!(map.get(Polarization::HH).is_some());
        assert!(map.get(Polarization::HV).is_none());
        assert_eq!(map.polarizations().collect::<Vec<_>>(), vec![Polarization::HH]);
    }
}
