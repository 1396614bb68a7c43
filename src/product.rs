use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

pub const SAFE_EXTENSION: &str = "SAFE";
pub const MEASUREMENT_DIR: &str = "measurement";

const NAME_LEN: usize = 67;
const TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductError {
    #[error("product name '{0}' does not follow the Sentinel-1 naming convention")]
    Naming(String),
    #[error("invalid {field} '{value}' in product name")]
    Field { field: &'static str, value: String },
    #[error("stop time is earlier than start time")]
    TimeOrder,
}

/// Metadata encoded in a Sentinel-1 SAFE product name, e.g.
/// `S1A_IW_OCN__2SDV_20190101T053012_20190101T053037_025273_02CB6E_1234`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductId {
    pub name: String,
    pub mission: String,
    pub mode: String,
    pub product_type: String,
    pub level: char,
    pub polarisation: String,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub absolute_orbit: u32,
    pub datatake: String,
    pub unique_id: String,
}

impl ProductId {
    pub fn parse(name: &str) -> Result<Self, ProductError> {
        let name = name.strip_suffix(".SAFE").unwrap_or(name);
        let naming = || ProductError::Naming(name.to_string());

        if name.len() != NAME_LEN || !name.is_ascii() {
            return Err(naming());
        }
        for sep in [3, 6, 11, 16, 32, 48, 55, 62] {
            if name.as_bytes()[sep] != b'_' {
                return Err(naming());
            }
        }

        let mission = &name[0..3];
        if !mission.starts_with("S1") {
            return Err(ProductError::Field {
                field: "mission",
                value: mission.to_string(),
            });
        }

        // The type field is padded with '_' when the resolution class is absent (OCN products).
        let product_type = name[7..11].trim_end_matches('_');
        let level_class_pol = &name[12..16];
        let level = level_class_pol.chars().next().ok_or_else(naming)?;

        let start = parse_time("start time", &name[17..32])?;
        let stop = parse_time("stop time", &name[33..48])?;
        if stop < start {
            return Err(ProductError::TimeOrder);
        }

        let orbit = &name[49..55];
        let absolute_orbit = orbit.parse::<u32>().map_err(|_| ProductError::Field {
            field: "absolute orbit",
            value: orbit.to_string(),
        })?;

        Ok(ProductId {
            name: name.to_string(),
            mission: mission.to_string(),
            mode: name[4..6].to_string(),
            product_type: product_type.to_string(),
            level,
            polarisation: level_class_pol[2..].to_string(),
            start,
            stop,
            absolute_orbit,
            datatake: name[56..62].to_string(),
            unique_id: name[63..67].to_string(),
        })
    }

    /// Finds the enclosing `<id>.SAFE` directory of a path inside a product and parses it.
    pub fn from_measurement_path(path: &Path) -> Option<Self> {
        path.ancestors()
            .filter_map(|p| p.file_name()?.to_str())
            .find(|name| is_safe_dir_name(name))
            .and_then(|name| ProductId::parse(name).ok())
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveDateTime, ProductError> {
    NaiveDateTime::parse_from_str(value, TIME_FORMAT).map_err(|_| ProductError::Field {
        field,
        value: value.to_string(),
    })
}

pub fn is_safe_dir_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == SAFE_EXTENSION)
}
