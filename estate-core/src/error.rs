//! Error types for ESTATE operations

use std::time::Duration;
use thiserror::Error;

/// Cache backend errors.
///
/// These never reach end users: the read-through service absorbs them and
/// falls back to direct computation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Cache serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Cache deserialization failed: {reason}")]
    Deserialization { reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Data layer errors raised by aggregate queries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Query timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all ESTATE errors.
#[derive(Debug, Clone, Error)]
pub enum EstateError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for ESTATE operations.
pub type EstateResult<T> = Result<T, EstateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display_unavailable() {
        let err = CacheError::Unavailable {
            reason: "connection refused".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("unavailable"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_query_error_display_not_found() {
        let err = QueryError::NotFound {
            entity: "Building".to_string(),
            id: "b-1".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Building"));
        assert!(msg.contains("b-1"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "ESTATE_CACHE_BACKEND".to_string(),
            value: "redis".to_string(),
            reason: "expected memory or lmdb".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("ESTATE_CACHE_BACKEND"));
        assert!(msg.contains("redis"));
        assert!(msg.contains("expected memory or lmdb"));
    }

    #[test]
    fn test_estate_error_from_variants() {
        let cache = EstateError::from(CacheError::LockPoisoned);
        assert!(matches!(cache, EstateError::Cache(_)));

        let query = EstateError::from(QueryError::QueryFailed {
            reason: "deadlock".to_string(),
        });
        assert!(matches!(query, EstateError::Query(_)));

        let validation = EstateError::from(ValidationError::RequiredFieldMissing {
            field: "company_id".to_string(),
        });
        assert!(matches!(validation, EstateError::Validation(_)));

        let config = EstateError::from(ConfigError::MissingRequired {
            field: "ESTATE_CACHE_LMDB_PATH".to_string(),
        });
        assert!(matches!(config, EstateError::Config(_)));
    }
}
