//! Error types for directory operations.
//!
//! These errors describe failures talking to the directory server and are
//! independent of schema semantics. Where the server reported an LDAP result
//! code it is kept so callers can react to specific conditions such as
//! `entryAlreadyExists`.

use thiserror::Error;

/// LDAP result code for `noSuchObject`.
pub const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code for `invalidCredentials`.
pub const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code for `unwillingToPerform`.
pub const RC_UNWILLING_TO_PERFORM: u32 = 53;
/// LDAP result code for `entryAlreadyExists`.
pub const RC_ENTRY_ALREADY_EXISTS: u32 = 68;
/// LDAP result code for `attributeOrValueExists`.
pub const RC_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;

/// Errors that can occur during directory operations.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("bind to {uri} failed: {message}")]
    Bind {
        /// Server URI the bind was attempted against
        uri: String,
        /// Server or transport diagnostic
        message: String,
    },

    #[error("connection error: {message}")]
    Connection {
        /// Transport-level diagnostic
        message: String,
    },

    #[error("no such object: {dn}")]
    NoSuchObject { dn: String },

    #[error("entry already exists: {dn}")]
    AlreadyExists { dn: String },

    #[error("{operation} on {dn} failed (result code {result_code}): {message}")]
    Operation {
        /// The directory operation that failed (search, add, modify)
        operation: String,
        /// Target DN of the operation
        dn: String,
        /// LDAP result code returned by the server
        result_code: u32,
        /// Diagnostic message returned by the server
        message: String,
    },

    #[error("invalid search filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },
}

impl DirectoryError {
    /// Build an operation error from a server result.
    ///
    /// Well-known result codes are mapped onto their dedicated variants.
    pub fn from_result(
        operation: impl Into<String>,
        dn: impl Into<String>,
        result_code: u32,
        message: impl Into<String>,
    ) -> Self {
        let dn = dn.into();
        match result_code {
            RC_NO_SUCH_OBJECT => DirectoryError::NoSuchObject { dn },
            RC_ENTRY_ALREADY_EXISTS => DirectoryError::AlreadyExists { dn },
            _ => DirectoryError::Operation {
                operation: operation.into(),
                dn,
                result_code,
                message: message.into(),
            },
        }
    }

    /// The LDAP result code behind this error, when there is one.
    pub fn result_code(&self) -> Option<u32> {
        match self {
            DirectoryError::Bind { .. } => Some(RC_INVALID_CREDENTIALS),
            DirectoryError::NoSuchObject { .. } => Some(RC_NO_SUCH_OBJECT),
            DirectoryError::AlreadyExists { .. } => Some(RC_ENTRY_ALREADY_EXISTS),
            DirectoryError::Operation { result_code, .. } => Some(*result_code),
            DirectoryError::Connection { .. } | DirectoryError::InvalidFilter { .. } => None,
        }
    }

    /// Whether the server rejected an add because the entry exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, DirectoryError::AlreadyExists { .. })
    }
}
