use crate::core::gain_lut::{GainLutMap, GainLutParams};
use crate::types::{Polarization, SarError, SarResult};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::path::Path;

/// Name fragment identifying sigma-naught LUTs among the calibration tables
pub const SIGMA_LUT_TAG: &str = "lutSigma";

/// RCM calibration LUT document (`<lut>` root)
#[derive(Debug, Deserialize)]
pub struct LutDocument {
    #[serde(rename = "pixelFirstLutValue")]
    pub pixel_first_lut_value: Option<i64>,
    #[serde(rename = "stepSize")]
    pub step_size: Option<i64>,
    #[serde(rename = "numberOfValues")]
    pub number_of_values: Option<usize>,
    #[serde(rename = "offset")]
    pub offset: Option<f64>,
    #[serde(rename = "gains")]
    pub gains: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> SarResult<T> {
    value.ok_or_else(|| SarError::Configuration(format!("LUT is missing required field {}", field)))
}

/// Parse space-separated numbers from a string
fn parse_space_separated_numbers(input: &str) -> SarResult<Vec<f64>> {
    input
        .split_whitespace()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|e| SarError::XmlParsing(format!("Invalid gain value '{}': {}", s, e)))
        })
        .collect()
}

/// Parse one LUT XML document into construction params
pub fn parse_lut_xml(xml_content: &str) -> SarResult<GainLutParams> {
    let doc = from_str::<LutDocument>(xml_content)
        .map_err(|e| SarError::XmlParsing(format!("Failed to parse LUT XML: {}", e)))?;

    let count = required(doc.number_of_values, "numberOfValues")?;
    let values = parse_space_separated_numbers(&required(doc.gains, "gains")?)?;
    if values.len() != count {
        return Err(SarError::Configuration(format!(
            "LUT numberOfValues is {} but {} gains were found",
            count,
            values.len()
        )));
    }

    Ok(GainLutParams {
        first_index: required(doc.pixel_first_lut_value, "pixelFirstLutValue")?,
        step: required(doc.step_size, "stepSize")?,
        count,
        offset: required(doc.offset, "offset")?,
        values,
    })
}

/// `lutSigma_HH` -> HH
pub fn polarization_from_lut_name(name: &str) -> SarResult<Polarization> {
    let suffix = name
        .rsplit_once('_')
        .map(|(_, pol)| pol)
        .ok_or_else(|| SarError::Metadata(format!("No polarization in LUT name {}", name)))?;
    suffix.parse()
}

pub fn is_sigma_lut(name: &str) -> bool {
    name.contains(SIGMA_LUT_TAG)
}

/// Build the per-polarization map from (table name, XML) pairs.
///
/// Tables other than sigma-naught (beta, gamma) are skipped, as are sigma
/// tables whose name carries no known polarization code.
pub fn load_lut_map<I, N, X>(entries: I) -> SarResult<GainLutMap>
where
    I: IntoIterator<Item = (N, X)>,
    N: AsRef<str>,
    X: AsRef<str>,
{
    let mut params = Vec::new();
    for (name, xml) in entries {
        let name = name.as_ref();
        if !is_sigma_lut(name) {
            log::debug!("Skipping calibration table {}", name);
            continue;
        }
        let polarization = match polarization_from_lut_name(name) {
            Ok(polarization) => polarization,
            Err(e) => {
                log::warn!("Skipping sigma LUT {}: {}", name, e);
                continue;
            }
        };
        params.push((polarization, parse_lut_xml(xml.as_ref())?));
    }
    GainLutMap::from_params(params)
}

/// Read and parse a single LUT file
pub fn read_lut_file<P: AsRef<Path>>(path: P) -> SarResult<GainLutParams> {
    log::info!("Reading calibration LUT: {}", path.as_ref().display());
    let xml_content = std::fs::read_to_string(path.as_ref())?;
    parse_lut_xml(&xml_content)
}

/// Load every `lutSigma_*.xml` file in a product's calibration directory
pub fn load_lut_dir<P: AsRef<Path>>(dir: P) -> SarResult<GainLutMap> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        let is_xml = path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("xml"));
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if is_xml && is_sigma_lut(stem) => stem.to_string(),
            _ => continue,
        };
        entries.push((stem, std::fs::read_to_string(&path)?));
    }

    if entries.is_empty() {
        log::warn!("No sigma LUTs found in {}", dir.as_ref().display());
    }
    load_lut_map(entries)
}
