//! Readers for auxiliary calibration data

pub mod lut_xml;

pub use lut_xml::{load_lut_dir, load_lut_map, parse_lut_xml, read_lut_file};
