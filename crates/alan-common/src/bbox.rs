//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Create a bounding box from the atlas region order `(south, north, west, east)`.
    pub fn from_snwe(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self::new(west, south, east, north)
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// A box is valid when it has positive extent on both axes.
    pub fn is_valid(&self) -> bool {
        self.max_lon > self.min_lon && self.max_lat > self.min_lat
    }

    /// Check if this bbox intersects another (shared edges do not count).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon < other.max_lon
            && self.max_lon > other.min_lon
            && self.min_lat < other.max_lat
            && self.max_lat > other.min_lat
    }

    /// Expand the bounding box by a buffer amount (in degrees).
    pub fn expand(&self, buffer: f64) -> Self {
        Self {
            min_lon: self.min_lon - buffer,
            min_lat: self.min_lat - buffer,
            max_lon: self.max_lon + buffer,
            max_lat: self.max_lat + buffer,
        }
    }

    /// Human readable extent used in tile metadata.
    pub fn extent_description(&self) -> String {
        format!(
            "Latitude: [{},{}] Longitude: [{},{}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_snwe_and_validity() {
        let bbox = BoundingBox::from_snwe(-50.0, 0.0, 100.0, 180.0);
        assert_eq!((bbox.min_lat, bbox.max_lat), (-50.0, 0.0));
        assert_eq!((bbox.min_lon, bbox.max_lon), (100.0, 180.0));
        assert!(bbox.is_valid());
        assert!(!BoundingBox::from_snwe(10.0, 5.0, 0.0, 1.0).is_valid());
    }

    #[test]
    fn test_intersects_excludes_shared_edges() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&BoundingBox::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&BoundingBox::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!a.intersects(&BoundingBox::new(20.0, 20.0, 30.0, 30.0)));
    }

    #[test]
    fn test_extent_description_uses_plain_integers() {
        let bbox = BoundingBox::from_snwe(-50.0, 0.0, 100.0, 180.0);
        assert_eq!(
            bbox.extent_description(),
            "Latitude: [-50,0] Longitude: [100,180]"
        );
    }
}
