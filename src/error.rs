//! Error taxonomy for pipeline stages
//!
//! Stages return `eyre::Result` like the rest of the crate, but the root cause
//! of a stage failure is always an [`EtlError`] so callers (and tests) can
//! classify it with `report.downcast_ref::<EtlError>()`.

use thiserror::Error;

/// Classified failure of a pipeline stage or one of its collaborators
#[derive(Error, Debug)]
pub enum EtlError {
    /// Staging read or write failed, including a missing key
    #[error("staging unavailable for {bucket}/{key}: {reason}")]
    StorageUnavailable {
        bucket: String,
        key: String,
        reason: String,
    },

    /// An insert or aggregate statement did not complete
    #[error("database write failed: {0}")]
    DatabaseWriteFailed(String),

    /// A read-only warehouse query did not complete
    #[error("database query failed: {0}")]
    DatabaseQueryFailed(String),

    /// A staged payload could not be decoded
    #[error("failed to deserialize {key}: {reason}")]
    DeserializationFailed { key: String, reason: String },

    /// The pipeline cannot be assembled from the given settings
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EtlError {
    pub fn storage(
        bucket: impl Into<String>,
        key: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::StorageUnavailable {
            bucket: bucket.into(),
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(reason: impl std::fmt::Display) -> Self {
        Self::DatabaseWriteFailed(reason.to_string())
    }

    pub fn query(reason: impl std::fmt::Display) -> Self {
        Self::DatabaseQueryFailed(reason.to_string())
    }

    pub fn deserialization(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::DeserializationFailed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(reason: impl std::fmt::Display) -> Self {
        Self::Configuration(reason.to_string())
    }

    /// Whether this is a staging failure
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }

    /// Whether this is a failed insert or aggregate
    pub fn is_database_write(&self) -> bool {
        matches!(self, Self::DatabaseWriteFailed(_))
    }

    /// Whether this is a malformed staged payload
    pub fn is_deserialization(&self) -> bool {
        matches!(self, Self::DeserializationFailed { .. })
    }
}

/// Find the [`EtlError`] at the root of an `eyre::Report`, if there is one
pub fn classify(report: &eyre::Report) -> Option<&EtlError> {
    report.chain().find_map(|e| e.downcast_ref::<EtlError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn test_storage_error_message() {
        let err = EtlError::storage("raw-data", "sample_data_2024-01-01.json", "not found");
        assert_eq!(
            err.to_string(),
            "staging unavailable for raw-data/sample_data_2024-01-01.json: not found"
        );
        assert!(err.is_storage());
        assert!(!err.is_database_write());
    }

    #[test]
    fn test_classify_through_context() {
        let result: eyre::Result<()> = Err(EtlError::write("connection reset").into());
        let report = result.wrap_err("stage `load` failed").unwrap_err();

        let err = classify(&report).expect("root cause should be an EtlError");
        assert!(err.is_database_write());
    }

    #[test]
    fn test_classify_foreign_error() {
        let report = eyre::eyre!("something else");
        assert!(classify(&report).is_none());
    }
}
