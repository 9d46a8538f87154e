//! Run-wide calibration configuration

use crate::types::{IncidenceAngleMode, SarError, SarResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mission handled by this calibrator
pub const RCM_MISSION: &str = "RCM";

/// Calibration flags, fixed for the lifetime of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationMode {
    /// Input is pre-detection (I/Q) data
    pub is_complex_source: bool,
    /// Keep a phase-scaled complex value instead of magnitude
    pub output_complex: bool,
    /// Log-scale the calibrated value
    pub output_in_db: bool,
    pub incidence_angle_mode: IncidenceAngleMode,
    /// Absolute column of tile-local column 0 (prior subsetting)
    pub column_offset: usize,
}

impl Default for CalibrationMode {
    fn default() -> Self {
        Self {
            is_complex_source: false,
            output_complex: false,
            output_in_db: false,
            incidence_angle_mode: IncidenceAngleMode::FromEllipsoid,
            column_offset: 0,
        }
    }
}

impl CalibrationMode {
    /// Build the mode from product metadata plus user output selection
    pub fn from_product(product: &ProductInfo, output: OutputOptions) -> SarResult<Self> {
        product.ensure_mission(RCM_MISSION)?;

        let mode = Self {
            is_complex_source: product.is_slc(),
            output_complex: output.output_complex,
            output_in_db: output.output_in_db,
            incidence_angle_mode: output.incidence_angle_mode,
            column_offset: product.subset_offset_x,
        };
        mode.validate()?;

        log::debug!("Calibration mode for {}: {:?}", product.product_type, mode);
        Ok(mode)
    }

    /// Reject flag combinations the transform has no branch for
    pub fn validate(&self) -> SarResult<()> {
        if self.output_complex && !self.is_complex_source {
            return Err(SarError::Configuration(
                "Complex output requires a complex (SLC) source".to_string(),
            ));
        }
        if self.output_complex && self.output_in_db {
            return Err(SarError::Configuration(
                "Complex output cannot be scaled to dB".to_string(),
            ));
        }
        Ok(())
    }
}

/// User-selected output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub output_complex: bool,
    pub output_in_db: bool,
    pub incidence_angle_mode: IncidenceAngleMode,
}

/// The handful of product metadata fields the calibrator reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub mission: String,
    pub product_type: String,
    #[serde(default)]
    pub subset_offset_x: usize,
    #[serde(default)]
    pub subset_offset_y: usize,
}

impl ProductInfo {
    pub fn is_slc(&self) -> bool {
        self.product_type.to_lowercase().contains("slc")
    }

    pub fn ensure_mission(&self, expected: &str) -> SarResult<()> {
        if self.mission != expected {
            return Err(SarError::Configuration(format!(
                "{} is not a valid mission for {} calibration",
                self.mission, expected
            )));
        }
        Ok(())
    }
}

/// RCM products carry their LUTs; an external auxiliary file is never accepted.
pub fn check_external_aux_file(file: Option<&Path>) -> SarResult<()> {
    match file {
        Some(path) => Err(SarError::Configuration(format!(
            "No external auxiliary file should be selected for {} product (got {})",
            RCM_MISSION,
            path.display()
        ))),
        None => Ok(()),
    }
}

/// Tile geometry for whole-raster processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileConfig {
    pub tile_width: usize,
    pub tile_height: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_width: 512,
            tile_height: 512,
        }
    }
}
