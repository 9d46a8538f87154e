//! Core calibration modules

pub mod gain_lut;
pub mod units;
pub mod calibrate;
pub mod incidence;
pub mod tile;

// Re-export main types
pub use gain_lut::{build_lut, GainLut, GainLutMap, GainLutParams};
pub use units::{db_to_linear, linear_to_db, normalize, Normalized, Sample};
pub use calibrate::{
    apply_forward, apply_reverse, calibrate, reverse_incidence_correction, Calibrator, UNDERFLOW_FLOOR,
};
pub use incidence::{IncidenceAngleSurface, TiePointGrid};
pub use tile::{
    calibrate_raster, calibrate_tile, passthrough_tile, CancelCheck, SourceTile, TileBuffer, TileBufferMut,
};
