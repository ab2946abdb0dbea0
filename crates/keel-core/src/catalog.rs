//! Migration catalog: the ordered set of units shipped with a deployment.
//!
//! Order is derived purely from each unit's name via [`OrderKey`]. The same
//! deployment therefore always yields the same catalog, and two units that
//! would compete for the same position are rejected when the catalog is
//! built instead of being resolved arbitrarily.

use crate::error::{CoreError, CoreResult};
use crate::unit::{MigrationUnit, OrderKey};
use crate::version::SchemaVersion;
use std::path::Path;

/// Ordered, immutable collection of migration units.
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    target_version: SchemaVersion,
    units: Vec<MigrationUnit>,
}

impl MigrationCatalog {
    /// Build a catalog from already-loaded units (e.g. embedded resources).
    pub fn from_units(
        target_version: SchemaVersion,
        units: impl IntoIterator<Item = MigrationUnit>,
    ) -> CoreResult<Self> {
        let mut units: Vec<MigrationUnit> = units.into_iter().collect();
        // Stable sort on (key, name) keeps error messages deterministic.
        units.sort_by(|a, b| {
            a.order_key()
                .cmp(&b.order_key())
                .then_with(|| a.filename().cmp(b.filename()))
        });

        for pair in units.windows(2) {
            if pair[0].order_key() == pair[1].order_key() {
                return Err(CoreError::DuplicateOrderKey {
                    key: pair[0].order_key().value(),
                    first: pair[0].filename().to_string(),
                    second: pair[1].filename().to_string(),
                });
            }
        }

        Ok(Self {
            target_version,
            units,
        })
    }

    /// Load every `*.sql` file directly inside `dir`.
    ///
    /// Sub-directories and files with other extensions are ignored.
    pub fn from_dir(dir: &Path, target_version: SchemaVersion) -> CoreResult<Self> {
        if !dir.is_dir() {
            return Err(CoreError::MigrationsDirNotFound {
                path: dir.display().to_string(),
            });
        }

        let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut units = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() || !is_sql_file(&path) {
                continue;
            }

            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                log::warn!("Skipping non UTF-8 migration file name: {}", path.display());
                continue;
            };

            let body = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            })?;
            units.push(MigrationUnit::new(filename, body)?);
        }

        let catalog = Self::from_units(target_version, units)?;
        log::debug!(
            "Loaded {} migration unit(s) from {}, highest order key {}",
            catalog.len(),
            dir.display(),
            catalog
                .max_order_key()
                .map_or_else(|| "none".to_string(), |k| k.to_string())
        );
        Ok(catalog)
    }

    /// All units in execution order.
    pub fn list_units(&self) -> &[MigrationUnit] {
        &self.units
    }

    /// Release version this catalog brings the schema to.
    pub fn target_version(&self) -> &SchemaVersion {
        &self.target_version
    }

    /// Look up a unit by file name.
    pub fn get(&self, filename: &str) -> Option<&MigrationUnit> {
        self.units.iter().find(|u| u.filename() == filename)
    }

    pub fn max_order_key(&self) -> Option<OrderKey> {
        self.units.last().map(MigrationUnit::order_key)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("sql"))
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
