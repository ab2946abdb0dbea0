//! Migration units and their ordering keys.

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::fmt;

/// Ordering key parsed from the numeric prefix of a unit's file name.
///
/// `001_init.sql`, `1-init.sql` and `1init.sql` all carry key `1`. Keys are
/// compared numerically, so `10_x.sql` sorts after `9_y.sql` regardless of
/// zero padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OrderKey(u64);

impl OrderKey {
    /// Derive the key from a unit file name.
    pub fn from_name(name: &str) -> CoreResult<Self> {
        let digits: &str = {
            let end = name
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(name.len());
            &name[..end]
        };

        if digits.is_empty() {
            return Err(CoreError::InvalidUnitName {
                name: name.to_string(),
                reason: "name must start with a numeric ordering prefix (e.g. 001_init.sql)"
                    .to_string(),
            });
        }

        digits
            .parse::<u64>()
            .map(OrderKey)
            .map_err(|e| CoreError::InvalidUnitName {
                name: name.to_string(),
                reason: format!("ordering prefix '{digits}' is not a valid number: {e}"),
            })
    }

    /// Raw numeric value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One named, ordered block of schema-changing statements.
///
/// Units are built once from deployment artifacts and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationUnit {
    filename: String,
    order_key: OrderKey,
    #[serde(skip)]
    body: String,
    checksum: String,
}

impl MigrationUnit {
    /// Create a unit, deriving its ordering key and checksum.
    pub fn new(filename: impl Into<String>, body: impl Into<String>) -> CoreResult<Self> {
        let filename = filename.into();
        let body = body.into();
        let order_key = OrderKey::from_name(&filename)?;
        let checksum = compute_checksum(&body);
        Ok(Self {
            filename,
            order_key,
            body,
            checksum,
        })
    }

    /// File name, the unique identity of the unit in the log.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn order_key(&self) -> OrderKey {
        self.order_key
    }

    /// Raw SQL body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// SHA-256 of the body.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

#[cfg(test)]
#[path = "unit_test.rs"]
mod tests;
