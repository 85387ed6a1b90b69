//! Coordinate Reference System codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CRS codes a regional grid can be defined in.
///
/// Every input source and output tile in the atlas is geographic WGS84, so
/// this is the only variant the aligner knows how to resample onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    #[default]
    #[serde(rename = "EPSG:4326", alias = "epsg:4326", alias = "CRS:84")]
    Epsg4326,
}

impl CrsCode {
    /// Parse a CRS string.
    ///
    /// Accepts "EPSG:4326" (any case) and "CRS:84".
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        match s.to_uppercase().as_str() {
            "EPSG:4326" | "CRS:84" => Ok(CrsCode::Epsg4326),
            _ => Err(CrsParseError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Name written into the tile's `spatial_reference`-style attributes.
    pub fn datum_name(&self) -> &'static str {
        match self {
            CrsCode::Epsg4326 => "WGS 84",
        }
    }

    /// Valid coordinate range for this CRS.
    pub fn valid_bounds(&self) -> crate::BoundingBox {
        match self {
            CrsCode::Epsg4326 => crate::BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsCode::Epsg4326 => write!(f, "EPSG:4326"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(CrsCode::parse("EPSG:4326").unwrap(), CrsCode::Epsg4326);
        assert_eq!(CrsCode::parse("epsg:4326").unwrap(), CrsCode::Epsg4326);
        assert_eq!(CrsCode::parse("CRS:84").unwrap(), CrsCode::Epsg4326);
        assert!(CrsCode::parse("EPSG:3857").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let code = CrsCode::Epsg4326;
        assert_eq!(CrsCode::parse(&code.to_string()).unwrap(), code);
    }
}
