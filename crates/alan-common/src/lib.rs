//! Common types shared across the ALAN atlas crates.

pub mod bbox;
pub mod crs;
pub mod month;
pub mod region;

pub use bbox::BoundingBox;
pub use crs::{CrsCode, CrsParseError};
pub use month::{Month, MonthParseError};
pub use region::{Region, RegionError, RegionRegistry};
