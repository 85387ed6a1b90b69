//! Named atlas regions and their grid definitions.

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, CrsCode};

/// Default target resolution: 30 arc-seconds, the native landmask spacing.
pub const DEFAULT_RESOLUTION_DEG: f64 = 1.0 / 120.0;

/// A named region with a fixed grid definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Short identifier used on the command line and in filenames (e.g. "Oceania").
    pub id: String,
    /// Display name substituted into tile titles.
    pub name: String,
    /// Geographic extent.
    pub bbox: BoundingBox,
    /// Coordinate reference system of the regional grid.
    #[serde(default)]
    pub crs: CrsCode,
    /// Cell size in degrees.
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION_DEG
}

impl Region {
    pub fn new(id: impl Into<String>, name: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bbox,
            crs: CrsCode::Epsg4326,
            resolution: DEFAULT_RESOLUTION_DEG,
        }
    }

    /// Override the grid resolution.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Check that the grid definition can produce at least one cell.
    pub fn validate(&self) -> Result<(), RegionError> {
        if !self.bbox.is_valid() {
            return Err(RegionError::InvalidDefinition {
                id: self.id.clone(),
                reason: "bounding box has no extent".to_string(),
            });
        }
        if self.resolution <= 0.0 || !self.resolution.is_finite() {
            return Err(RegionError::InvalidDefinition {
                id: self.id.clone(),
                reason: format!("resolution must be positive, got {}", self.resolution),
            });
        }
        let valid = self.crs.valid_bounds();
        if self.bbox.min_lon < valid.min_lon
            || self.bbox.max_lon > valid.max_lon
            || self.bbox.min_lat < valid.min_lat
            || self.bbox.max_lat > valid.max_lat
        {
            return Err(RegionError::InvalidDefinition {
                id: self.id.clone(),
                reason: format!("bounding box exceeds {} bounds", self.crs),
            });
        }
        Ok(())
    }
}

/// Ordered lookup table of supported regions.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    regions: Vec<Region>,
}

impl RegionRegistry {
    /// Empty registry.
    pub fn empty() -> Self {
        Self { regions: Vec::new() }
    }

    /// The eleven regions of the published atlas.
    pub fn atlas() -> Self {
        let defs: [(&str, &str, (f64, f64, f64, f64)); 11] = [
            ("EuropeMed", "Europe Mediterranean", (20.0, 85.0, -20.0, 55.0)),
            (
                "MidE_NInd",
                "Middle East and Northern Indian Ocean",
                (0.0, 30.0, 30.0, 60.0),
            ),
            (
                "NInd_FarE",
                "Northern Indian Ocean, Far East",
                (0.0, 30.0, 60.0, 100.0),
            ),
            ("FarE_Isl", "Far East and Islands", (-10.0, 30.0, 100.0, 130.0)),
            ("Oceania", "Oceania", (-50.0, 0.0, 100.0, 180.0)),
            ("PacRim", "Pacific Rim", (20.0, 85.0, 100.0, 180.0)),
            ("NAm", "North America", (20.0, 85.0, -180.0, -50.0)),
            ("CAm", "Central America", (0.0, 20.0, -120.0, -60.0)),
            ("SAm", "South America", (-60.0, 0.0, -90.0, -30.0)),
            ("NAfr", "North Africa", (0.0, 30.0, -20.0, 20.0)),
            ("SAfr", "South Africa", (-40.0, 0.0, 0.0, 70.0)),
        ];

        let regions = defs
            .iter()
            .map(|(id, name, (s, n, w, e))| Region::new(*id, *name, BoundingBox::from_snwe(*s, *n, *w, *e)))
            .collect();
        Self { regions }
    }

    /// Add or replace a region. Replacing keeps the original position.
    pub fn insert(&mut self, region: Region) -> Result<(), RegionError> {
        region.validate()?;
        match self.regions.iter_mut().find(|r| r.id == region.id) {
            Some(existing) => *existing = region,
            None => self.regions.push(region),
        }
        Ok(())
    }

    /// Apply one resolution to every region.
    pub fn set_resolution(&mut self, resolution: f64) -> Result<(), RegionError> {
        for region in &mut self.regions {
            region.resolution = resolution;
            region.validate()?;
        }
        Ok(())
    }

    /// Look up a region by its short identifier.
    pub fn get(&self, id: &str) -> Result<&Region, RegionError> {
        self.regions
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RegionError::Unknown {
                id: id.to_string(),
                known: self.ids().join(", "),
            })
    }

    /// Region identifiers in registry order.
    pub fn ids(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::atlas()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("Unknown region '{id}'. Choose from: {known}")]
    Unknown { id: String, known: String },

    #[error("Invalid definition for region '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atlas_lookup() {
        let registry = RegionRegistry::atlas();
        assert_eq!(registry.len(), 11);

        let oceania = registry.get("Oceania").unwrap();
        assert_eq!(oceania.bbox, BoundingBox::new(100.0, -50.0, 180.0, 0.0));
        assert_eq!(oceania.crs, CrsCode::Epsg4326);
        assert!((oceania.resolution - 1.0 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_atlas_ids_are_unique_and_valid() {
        let registry = RegionRegistry::atlas();
        let mut ids = registry.ids();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), registry.len());
        for region in registry.iter() {
            region.validate().unwrap();
        }
    }

    #[test]
    fn test_unknown_region_lists_choices() {
        let registry = RegionRegistry::atlas();
        let err = registry.get("Atlantis").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Atlantis"));
        assert!(msg.contains("EuropeMed"));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut registry = RegionRegistry::atlas();
        let first = registry.ids()[0].clone();
        registry
            .insert(Region::new(first.clone(), "Replaced", BoundingBox::from_snwe(0.0, 1.0, 0.0, 1.0)))
            .unwrap();
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.ids()[0], first);
        assert_eq!(registry.get(&first).unwrap().name, "Replaced");
    }

    #[test]
    fn test_insert_rejects_bad_resolution() {
        let mut registry = RegionRegistry::empty();
        let region = Region::new("X", "X", BoundingBox::from_snwe(0.0, 1.0, 0.0, 1.0))
            .with_resolution(0.0);
        assert!(registry.insert(region).is_err());
    }
}
