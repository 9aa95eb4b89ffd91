//! Errors raised by pingu-core.
//!
//! Rust callers get [`PinguError`] and can match on the failure. Kotlin and
//! Swift callers get [`PinguFfiError`], which only carries the rendered
//! message, so its shape can stay fixed while `PinguError` grows.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// Core errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure of a tracker, store, classifier or config operation.
///
/// Storage trouble is either `PersistenceFailure` or `CorruptRecord`; see
/// [`PinguError::is_persistence_failure`].
#[derive(Debug, thiserror::Error)]
pub enum PinguError {
    // ─────────────────────────────────────────────────────────────────────
    // Permission Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No active screen to request {capability} from")]
    ContextUnavailable { capability: String },

    #[error("Platform permission prompt failed: {message}")]
    Platform { message: String },

    // ─────────────────────────────────────────────────────────────────────
    // Persistence Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Persistence failure: {context}: {source}")]
    PersistenceFailure {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Persistence failure: unreadable {column} value {value:?}")]
    CorruptRecord { column: String, value: String },

    // ─────────────────────────────────────────────────────────────────────
    // Classification Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Classifier returned no gesture")]
    ClassificationAbsent,

    #[error("No classifier configured")]
    ClassifierUnavailable,

    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Unknown gesture: {0}")]
    InvalidGesture(String),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration / I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PinguError {
    /// True for storage-layer failures, whichever shape they took.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            PinguError::PersistenceFailure { .. } | PinguError::CorruptRecord { .. }
        )
    }

    pub(crate) fn persistence(context: impl Into<String>, source: rusqlite::Error) -> Self {
        PinguError::PersistenceFailure {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PinguError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Binding boundary
// ═══════════════════════════════════════════════════════════════════════════════

/// What exported engine methods throw on the Kotlin/Swift side.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PinguFfiError {
    #[error("{message}")]
    General { message: String },
}

impl From<PinguError> for PinguFfiError {
    fn from(err: PinguError) -> Self {
        let message = err.to_string();
        tracing::debug!(error = %message, "Error crossing binding boundary");
        PinguFfiError::General { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_variants_are_classified() {
        let corrupt = PinguError::CorruptRecord {
            column: "outcome".to_string(),
            value: "MAYBE".to_string(),
        };
        assert!(corrupt.is_persistence_failure());

        let sql = PinguError::persistence("insert", rusqlite::Error::InvalidQuery);
        assert!(sql.is_persistence_failure());

        assert!(!PinguError::ClassificationAbsent.is_persistence_failure());
    }

    #[test]
    fn ffi_error_keeps_message() {
        let err = PinguFfiError::from(PinguError::ContextUnavailable {
            capability: "android.permission.CAMERA".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "No active screen to request android.permission.CAMERA from"
        );
    }
}
