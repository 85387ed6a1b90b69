//! Global attribute template for output tiles.
//!
//! Attribute values may carry placeholder tokens filled per tile:
//!
//! | Token | Replaced with |
//! |-------|---------------|
//! | `REGION_PLACEHOLDER` | region display name |
//! | `SPATIAL_PLACEHOLDER` | `Latitude: [S,N] Longitude: [W,E]` |
//! | `CREATION_PLACEHOLDER` | generation date, `dd/mm/YYYY` |
//!
//! Any other `*_PLACEHOLDER` token left after substitution is an error, as is
//! a required attribute that is missing or empty.

use std::collections::BTreeMap;
use std::path::Path;

use alan_common::Region;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AlanError, Result};

pub const REGION_PLACEHOLDER: &str = "REGION_PLACEHOLDER";
pub const SPATIAL_PLACEHOLDER: &str = "SPATIAL_PLACEHOLDER";
pub const CREATION_PLACEHOLDER: &str = "CREATION_PLACEHOLDER";

const PLACEHOLDER_SUFFIX: &str = "_PLACEHOLDER";

/// Attribute name to value, with placeholders, plus the names every tile must carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataTemplate {
    pub attributes: BTreeMap<String, String>,
    pub required: Vec<String>,
}

impl Default for MetadataTemplate {
    fn default() -> Self {
        let attributes = [
            (
                "title",
                "REGION_PLACEHOLDER Region of Artificial Light at Night Under the Sea",
            ),
            ("extents", "The spatial extent covers: SPATIAL_PLACEHOLDER"),
            ("creation_date", "CREATION_PLACEHOLDER"),
            ("spatial_reference", "WGS 84"),
            ("Conventions", "CF-1.8"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            attributes,
            required: vec!["title".to_string(), "creation_date".to_string()],
        }
    }
}

impl MetadataTemplate {
    /// Load a template from a YAML file.
    ///
    /// The file is either a full template (`attributes` / `required`) or a
    /// plain mapping of attribute names to values.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AlanError::config(format!("cannot read metadata file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
            .map_err(|e| AlanError::config(format!("{}: {}", path.display(), e)))
    }

    fn from_yaml(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum TemplateFile {
            Full {
                attributes: BTreeMap<String, String>,
                #[serde(default)]
                required: Option<Vec<String>>,
            },
            Plain(BTreeMap<String, String>),
        }

        Ok(match serde_yaml::from_str(text)? {
            TemplateFile::Full {
                attributes,
                required,
            } => Self {
                attributes,
                required: required.unwrap_or_else(|| Self::default().required),
            },
            TemplateFile::Plain(attributes) => Self {
                attributes,
                required: Self::default().required,
            },
        })
    }

    /// `self` with every attribute of `overrides` on top.
    pub fn merged_with(mut self, overrides: &MetadataTemplate) -> Self {
        for (name, value) in &overrides.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
        for name in &overrides.required {
            if !self.required.contains(name) {
                self.required.push(name.clone());
            }
        }
        self
    }

    /// Substitute the placeholders for one tile and check the result.
    pub fn render(&self, region: &Region, created: NaiveDate) -> Result<Vec<(String, String)>> {
        let spatial = region.bbox.extent_description();
        let creation = created.format("%d/%m/%Y").to_string();

        let rendered: Vec<(String, String)> = self
            .attributes
            .iter()
            .map(|(name, value)| {
                let value = value
                    .replace(REGION_PLACEHOLDER, &region.name)
                    .replace(SPATIAL_PLACEHOLDER, &spatial)
                    .replace(CREATION_PLACEHOLDER, &creation);
                (name.clone(), value)
            })
            .collect();

        for (name, value) in &rendered {
            if let Some(token) = leftover_placeholder(value) {
                return Err(AlanError::metadata(format!(
                    "attribute '{}' still contains {}",
                    name, token
                )));
            }
        }
        for name in &self.required {
            let present = rendered
                .iter()
                .any(|(k, v)| k == name && !v.trim().is_empty());
            if !present {
                return Err(AlanError::metadata(format!(
                    "required attribute '{}' is missing",
                    name
                )));
            }
        }

        Ok(rendered)
    }
}

/// The first `XXX_PLACEHOLDER` token in `value`, if any.
fn leftover_placeholder(value: &str) -> Option<&str> {
    let end = value.find(PLACEHOLDER_SUFFIX)? + PLACEHOLDER_SUFFIX.len();
    let start = value[..end - PLACEHOLDER_SUFFIX.len()]
        .rfind(|c: char| !(c.is_ascii_uppercase() || c == '_'))
        .map_or(0, |i| i + 1);
    Some(&value[start..end])
}
