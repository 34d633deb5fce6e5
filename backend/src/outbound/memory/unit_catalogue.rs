//! Fixed unit catalogue, optionally loaded from a JSON file.
//!
//! The file is a JSON array of units:
//!
//! ```json
//! [{ "unitId": "U1", "title": "Hanok loft", "nightlyRateKrw": 130000,
//!    "hostId": "3fa85f64-5717-4562-b3fc-2c963f66afa6" }]
//! ```

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use serde::Deserialize;

use crate::domain::identity::UserId;
use crate::domain::ports::{UnitCatalogue, UnitCatalogueError, UnitPricing};
use crate::domain::reservation::UnitId;

/// Errors raised while loading a catalogue file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueFileError {
    #[error("failed to read catalogue {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalogue {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalogue entry {index} is invalid: {message}")]
    Entry { index: usize, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CatalogueEntry {
    unit_id: String,
    title: String,
    nightly_rate_krw: i64,
    #[serde(default)]
    host_id: Option<String>,
}

impl CatalogueEntry {
    fn into_pricing(self, index: usize) -> Result<UnitPricing, CatalogueFileError> {
        let entry_error = |message: String| CatalogueFileError::Entry { index, message };
        let unit_id = UnitId::new(self.unit_id).map_err(|err| entry_error(err.to_string()))?;
        if self.nightly_rate_krw <= 0 {
            return Err(entry_error("nightlyRateKrw must be positive".to_owned()));
        }
        let host_id = self
            .host_id
            .map(UserId::new)
            .transpose()
            .map_err(|err| entry_error(err.to_string()))?;
        Ok(UnitPricing {
            unit_id,
            title: self.title,
            nightly_rate_krw: self.nightly_rate_krw,
            host_id,
        })
    }
}

/// Catalogue backed by a map built at startup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitCatalogue {
    units: HashMap<UnitId, UnitPricing>,
}

impl InMemoryUnitCatalogue {
    pub fn new(units: impl IntoIterator<Item = UnitPricing>) -> Self {
        Self {
            units: units
                .into_iter()
                .map(|unit| (unit.unit_id.clone(), unit))
                .collect(),
        }
    }

    /// Parse a catalogue from JSON text.
    pub fn from_json(path: &Path, text: &str) -> Result<Self, CatalogueFileError> {
        let entries: Vec<CatalogueEntry> =
            serde_json::from_str(text).map_err(|source| CatalogueFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let units = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_pricing(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(units))
    }

    /// Load a catalogue file from disk.
    ///
    /// Only the file's parent directory is opened with ambient authority; the
    /// read itself goes through that capability.
    pub fn load(path: &Path) -> Result<Self, CatalogueFileError> {
        let read_error = |source| CatalogueFileError::Read {
            path: path.to_path_buf(),
            source,
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path.file_name().ok_or_else(|| {
            read_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "catalogue path must name a file",
            ))
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let text = dir.read_to_string(Path::new(file_name)).map_err(read_error)?;
        Self::from_json(path, &text)
    }

    /// Every unit, for seeding a persistent catalogue.
    pub fn units(&self) -> Vec<UnitPricing> {
        self.units.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[async_trait]
impl UnitCatalogue for InMemoryUnitCatalogue {
    async fn unit_pricing(&self, unit_id: &UnitId) -> Result<Option<UnitPricing>, UnitCatalogueError> {
        Ok(self.units.get(unit_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn loads_units_from_json() {
        let text = r#"[
            {"unitId": "U1", "title": "Hanok loft", "nightlyRateKrw": 130000,
             "hostId": "3fa85f64-5717-4562-b3fc-2c963f66afa6"},
            {"unitId": "U2", "title": "Harbour room", "nightlyRateKrw": 90000}
        ]"#;
        let catalogue =
            InMemoryUnitCatalogue::from_json(Path::new("units.json"), text).expect("catalogue");

        assert_eq!(catalogue.len(), 2);
        let unit = catalogue
            .unit_pricing(&UnitId::new("U1").expect("unit"))
            .await
            .expect("lookup")
            .expect("known unit");
        assert_eq!(unit.nightly_rate_krw, 130_000);
        assert!(unit.host_id.is_some());
    }

    #[rstest]
    #[case(r#"[{"unitId": "U1", "title": "Loft", "nightlyRateKrw": 0}]"#)]
    #[case(r#"[{"unitId": "bad id", "title": "Loft", "nightlyRateKrw": 1000}]"#)]
    #[case(r#"[{"unitId": "U1", "title": "Loft", "nightlyRateKrw": 1000, "hostId": "nope"}]"#)]
    fn rejects_invalid_entries(#[case] text: &str) {
        let err = InMemoryUnitCatalogue::from_json(Path::new("units.json"), text)
            .expect_err("invalid entry");
        assert!(matches!(err, CatalogueFileError::Entry { index: 0, .. }));
    }

    #[rstest]
    fn reports_malformed_json() {
        let err = InMemoryUnitCatalogue::from_json(Path::new("units.json"), "{")
            .expect_err("malformed");
        assert!(matches!(err, CatalogueFileError::Parse { .. }));
    }

    #[rstest]
    fn loads_catalogue_file_from_disk() {
        let file = crate::test_support::catalogue_file(
            r#"[{"unitId": "U1", "title": "Hanok loft", "nightlyRateKrw": 130000}]"#,
        );

        let catalogue = InMemoryUnitCatalogue::load(file.path()).expect("catalogue");

        assert_eq!(catalogue.len(), 1);
    }

    #[rstest]
    #[case::missing_file("/nonexistent-lodging-dir/units.json")]
    #[case::directory("/")]
    fn unreadable_paths_are_read_errors(#[case] raw: &str) {
        let err = InMemoryUnitCatalogue::load(Path::new(raw)).expect_err("unreadable");

        assert!(matches!(err, CatalogueFileError::Read { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_units_are_absent() {
        let catalogue = InMemoryUnitCatalogue::default();
        let found = catalogue
            .unit_pricing(&UnitId::new("U9").expect("unit"))
            .await
            .expect("lookup");
        assert!(found.is_none());
    }
}
