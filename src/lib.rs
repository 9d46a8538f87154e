//! rcmcal: gain-LUT radiometric calibration for RADARSAT Constellation Mission data
//!
//! Converts detected or complex SAR samples into sigma-naught using the
//! per-polarization, range-dependent gain tables shipped with RCM products.
//! The crate covers the numeric core: LUT lookup, unit normalisation, the
//! calibration formula, incidence-angle retro-calibration and tile-level
//! processing over caller-owned buffers.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    IncidenceAngleMode, Polarization, SampleUnit, SarComplex, SarError, SarResult, TileWindow,
};
pub use config::{CalibrationMode, OutputOptions, ProductInfo, TileConfig};
pub use crate::core::{Calibrator, GainLut, GainLutMap, GainLutParams, SourceTile, TileBuffer, TileBufferMut};
