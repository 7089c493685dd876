//! Directory service abstraction.
//!
//! The sync engine needs only three operations from the directory server:
//! search, add an entry, and modify one attribute of an entry. The
//! [`DirectoryService`] trait captures exactly that, so the engine can run
//! against a live OpenLDAP server ([`LdapDirectory`]) or an in-process
//! [`InMemoryDirectory`] that records every mutation.
//!
//! # Example Usage
//!
//! ```rust
//! use ldap_schema_sync::directory::{
//!     AttributeMap, DirectoryService, Filter, InMemoryDirectory, ModifyOperation, SearchScope,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::new();
//! let mut attrs = AttributeMap::new();
//! attrs.insert("objectClass".into(), vec![b"olcSchemaConfig".to_vec()]);
//! directory.add_entry("cn={0}core,cn=schema,cn=config", attrs).await?;
//!
//! directory
//!     .modify_attribute(
//!         "cn={0}core,cn=schema,cn=config",
//!         ModifyOperation::Add,
//!         "olcAttributeTypes",
//!         vec![b"( 2.5.4.3 NAME 'cn' )".to_vec()],
//!     )
//!     .await?;
//!
//! let found = directory
//!     .search(
//!         "cn=schema,cn=config",
//!         SearchScope::OneLevel,
//!         &Filter::equality("objectClass", "olcSchemaConfig"),
//!         &["cn"],
//!     )
//!     .await?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;
pub mod ldap;


pub use errors::DirectoryError;
pub use in_memory::{InMemoryDirectory, Modification};
pub use ldap::LdapDirectory;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// Attribute name to raw values, as stored on a directory entry.
pub type AttributeMap = BTreeMap<String, Vec<Vec<u8>>>;

/// A single entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    pub dn: String,
    pub attributes: AttributeMap,
}

impl SearchEntry {
    pub fn new(dn: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    /// Values of an attribute, matching the name case-insensitively.
    ///
    /// Returns an empty slice when the entry has no such attribute.
    pub fn values(&self, attribute: &str) -> &[Vec<u8>] {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}

/// Search scope relative to the base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the base entry itself
    Base,
    /// Immediate children of the base entry
    OneLevel,
    /// The base entry and everything below it
    Subtree,
}

/// Attribute modification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifyOperation {
    /// Append values to the attribute
    Add,
    /// Replace the whole value set of the attribute
    Replace,
    /// Remove the given values, or the whole attribute when no values are given
    Delete,
}

impl fmt::Display for ModifyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifyOperation::Add => write!(f, "add"),
            ModifyOperation::Replace => write!(f, "replace"),
            ModifyOperation::Delete => write!(f, "delete"),
        }
    }
}

/// The subset of LDAP search filters the sync engine issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `(attr=value)`
    Equality { attribute: String, value: String },
    /// `(attr=*)`
    Present { attribute: String },
}

impl Filter {
    pub fn equality(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equality {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Filter matching every entry.
    pub fn any() -> Self {
        Self::present("objectClass")
    }

    /// Evaluate the filter against an attribute map.
    ///
    /// Attribute names and values compare case-insensitively, as they do for
    /// the directory string syntaxes these filters target.
    pub fn matches(&self, attributes: &AttributeMap) -> bool {
        let values = |name: &str| {
            attributes
                .iter()
                .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
                .map(|(_, values)| values)
        };
        match self {
            Filter::Present { attribute } => values(attribute).is_some_and(|v| !v.is_empty()),
            Filter::Equality { attribute, value } => values(attribute).is_some_and(|v| {
                v.iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(value.as_bytes()))
            }),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Equality { attribute, value } => {
                write!(f, "({}={})", attribute, escape_filter_value(value))
            }
            Filter::Present { attribute } => write!(f, "({}=*)", attribute),
        }
    }
}

/// Escape a filter assertion value per RFC 4515.
fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Canonical DN form used for comparisons: lowercased, no spaces around
/// RDN separators.
pub fn normalize_dn(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| {
            rdn.split('=')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("=")
        })
        .collect::<Vec<_>>()
        .join(",")
        .to_ascii_lowercase()
}

/// Split a DN into its first RDN and the parent DN.
pub fn split_dn(dn: &str) -> (&str, Option<&str>) {
    match dn.split_once(',') {
        Some((rdn, parent)) => (rdn.trim(), Some(parent.trim())),
        None => (dn.trim(), None),
    }
}

/// Core trait for directory backends.
///
/// Implementations perform one blocking round trip per call from the caller's
/// point of view: the engine awaits each operation before issuing the next.
///
/// # Errors
///
/// Every operation reports failures as [`DirectoryError`]; a missing target
/// entry is [`DirectoryError::NoSuchObject`] and an add of an existing entry is
/// [`DirectoryError::AlreadyExists`].
pub trait DirectoryService: Send + Sync {
    /// Search below `base_dn`.
    ///
    /// # Arguments
    /// * `base_dn` - Where the search starts
    /// * `scope` - How far below the base to look
    /// * `filter` - Entries must match this filter
    /// * `attributes` - Attributes to return; empty means all user attributes
    ///
    /// # Returns
    /// Matching entries. A missing base entry is `NoSuchObject`, not an
    /// empty result.
    fn search(
        &self,
        base_dn: &str,
        scope: SearchScope,
        filter: &Filter,
        attributes: &[&str],
    ) -> impl Future<Output = Result<Vec<SearchEntry>, DirectoryError>> + Send;

    /// Add a new entry.
    fn add_entry(
        &self,
        dn: &str,
        attributes: AttributeMap,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Apply one modification to one attribute of an existing entry.
    ///
    /// # Arguments
    /// * `dn` - The entry to modify
    /// * `operation` - Add, replace or delete
    /// * `attribute` - Attribute name
    /// * `values` - Values to add, the full replacement set, or values to delete
    fn modify_attribute(
        &self,
        dn: &str,
        operation: ModifyOperation,
        attribute: &str,
        values: Vec<Vec<u8>>,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}
