//! Error types for schema synchronization.
//!
//! [`SyncError`] is the top-level error. Variants raised before any definition
//! is processed (bind, container search, container creation, missing input)
//! abort the run; per-definition failures are captured in the
//! [`SyncReport`](crate::sync::SyncReport) instead of being propagated.

use crate::canonical::OidParseError;
use crate::config::ConfigError;
use crate::directory::DirectoryError;
use crate::input::InputError;

/// Main error type for synchronization runs.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Binding to the directory failed
    #[error("LDAP bind failed: {0}")]
    Auth(#[source] DirectoryError),

    /// Listing the existing schema containers failed
    #[error("Failed to search schema container: {0}")]
    ContainerSearch(#[source] DirectoryError),

    /// Creating the schema container entry failed
    #[error("Failed to create schema entry {dn}: {source}")]
    ContainerCreate {
        dn: String,
        #[source]
        source: DirectoryError,
    },

    /// No ordinal is left for a new schema container entry
    #[error("No schema ordinal available under {base_dn}: the highest ordinal in use cannot be incremented")]
    OrdinalsExhausted { base_dn: String },

    /// Neither attributeType nor objectClass definitions were supplied
    #[error("No attributeType or objectClass definitions provided.")]
    NoDefinitions,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Definition input could not be loaded
    #[error(transparent)]
    Input(#[from] InputError),

    /// A directory operation on a single definition failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A definition has no parsable object identifier
    #[error(transparent)]
    Parse(#[from] OidParseError),

    /// Report serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Process exit status for a run aborted by this error.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether this error aborts the whole run rather than one definition.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::Directory(_) | SyncError::Parse(_))
    }
}

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
