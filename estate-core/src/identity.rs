//! Identity types for ESTATE entities

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Delimiter between the components of a rendered cache key.
pub const KEY_DELIMITER: char = ':';

/// Identifier of one customer organization, the unit of data isolation.
///
/// A `CompanyId` can only be obtained through [`CompanyId::new`], which
/// rejects values that could not be embedded unambiguously in a cache key:
/// empty strings, the `:` delimiter, whitespace and non-ASCII characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyId(String);

impl CompanyId {
    /// Validate and wrap a tenant identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_key_component("company_id", &value)?;
        Ok(Self(value))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CompanyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CompanyId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CompanyId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CompanyId> for String {
    fn from(id: CompanyId) -> Self {
        id.0
    }
}

/// Check that a value can be used as one component of a cache key.
///
/// Shared by company identifiers and key subtypes (e.g. analytics kinds).
pub fn validate_key_component(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        });
    }
    if let Some(bad) = value
        .chars()
        .find(|c| *c == KEY_DELIMITER || !c.is_ascii() || c.is_ascii_whitespace() || c.is_ascii_control())
    {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("character {:?} is not allowed", bad),
        });
    }
    Ok(())
}
