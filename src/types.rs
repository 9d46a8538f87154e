use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Complex-valued SAR sample (I + jQ)
pub type SarComplex = Complex<f64>;

/// Polarization channels carried by RCM products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    HH,
    HV,
    VH,
    VV,
    /// Compact polarimetry, circular transmit / horizontal receive
    CH,
    /// Compact polarimetry, circular transmit / vertical receive
    CV,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::HH => write!(f, "HH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::VV => write!(f, "VV"),
            Polarization::CH => write!(f, "CH"),
            Polarization::CV => write!(f, "CV"),
        }
    }
}

impl FromStr for Polarization {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HH" => Ok(Polarization::HH),
            "HV" => Ok(Polarization::HV),
            "VH" => Ok(Polarization::VH),
            "VV" => Ok(Polarization::VV),
            "CH" => Ok(Polarization::CH),
            "CV" => Ok(Polarization::CV),
            _ => Err(SarError::Metadata(format!("Invalid polarization: {}", s))),
        }
    }
}

/// Declared sample encoding of a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleUnit {
    Amplitude,
    Intensity,
    IntensityDB,
    /// In-phase component of a complex pair
    Real,
    /// Quadrature component of a complex pair
    Imaginary,
    /// Anything the calibrator has no conversion for (phase, coherence, ...)
    Other,
}

impl SampleUnit {
    pub fn is_complex(self) -> bool {
        matches!(self, SampleUnit::Real | SampleUnit::Imaginary)
    }
}

impl std::fmt::Display for SampleUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SampleUnit::Amplitude => "amplitude",
            SampleUnit::Intensity => "intensity",
            SampleUnit::IntensityDB => "intensity_db",
            SampleUnit::Real => "real",
            SampleUnit::Imaginary => "imaginary",
            SampleUnit::Other => "other",
        };
        f.write_str(name)
    }
}

/// Source of the local incidence angle used by point-wise calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IncidenceAngleMode {
    /// Projected local incidence angle from a DEM
    FromDEM,
    /// Incidence angle from the reference ellipsoid
    #[default]
    FromEllipsoid,
}

/// Rectangular window in raster coordinates (x = range column, y = azimuth line)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileWindow {
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

impl TileWindow {
    pub fn new(x0: usize, y0: usize, width: usize, height: usize) -> Self {
        Self { x0, y0, width, height }
    }

    pub fn max_x(&self) -> usize {
        self.x0 + self.width
    }

    pub fn max_y(&self) -> usize {
        self.y0 + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Error types for SAR calibration
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported sample unit: {0}")]
    UnsupportedUnit(SampleUnit),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Column {column} resolves to gain index {index}, outside table of {count} values")]
    OutOfDomain { column: i64, index: i64, count: usize },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Calibration cancelled")]
    Cancelled,
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;
