//! Error types for Design Core
//!
//! Provides error handling for:
//! - Remote load/save failures, including structured validation payloads
//! - Invalid store operations (bad paths, out-of-range indices)
//! - Controller lifecycle misuse
//! - Configuration loading

use crate::sync::SyncState;
use design_snapshot::{ErrorMap, FieldPath, PathError, SnapshotError};

/// Failure reported by the remote design resource
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// Save rejected with field-level messages
    #[error("validation failed ({} field(s))", .0.message_paths().len())]
    Validation(ErrorMap),

    /// Design does not exist
    #[error("design not found: {0}")]
    NotFound(String),

    /// Transport or server failure without a structured payload
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Check if the failure carries field-level messages
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Error tree to show the operator for this failure
    ///
    /// Validation payloads map path-for-path; anything else becomes a
    /// single non-field message.
    #[must_use]
    pub fn into_error_map(self) -> ErrorMap {
        match self {
            Self::Validation(errors) => errors,
            other => ErrorMap::non_field(other.to_string()),
        }
    }
}

/// Invalid operation on the design state store
///
/// These indicate a defect in the calling code, never operator input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Snapshot traversal or collection operation failed
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Path could not be parsed
    #[error(transparent)]
    Path(#[from] PathError),

    /// Path is the record root or the design kind, both fixed at load
    #[error("read-only field: '{0}'")]
    ReadOnly(FieldPath),

    /// Collection operation on something that is not a collection
    #[error("not a collection: {0}")]
    NotACollection(FieldPath),

    /// Operation needs a branch schema with preference collections
    #[error("design kind '{0}' has no preference collections")]
    NoPreferenceCollection(String),
}

/// Controller lifecycle and orchestration errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Mount was already performed for this controller
    #[error("controller already mounted")]
    AlreadyMounted,

    /// Operation requires loaded data
    #[error("operation not available while {0:?}")]
    NotReady(SyncState),

    /// Controller was torn down
    #[error("controller torn down")]
    TornDown,

    /// Illegal state transition
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition { from: SyncState, to: SyncState },

    /// Load failed; the view stays in Loading
    #[error("load failed")]
    Load(#[source] RemoteError),

    /// Store rejected an edit
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Experiment slug is empty or has characters outside `[A-Za-z0-9_-]`
    #[error("invalid experiment slug: '{0}'")]
    InvalidSlug(String),

    /// Design kind segment is empty or malformed
    #[error("invalid design kind segment: '{0}'")]
    InvalidKind(String),

    /// TOML could not be parsed
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
