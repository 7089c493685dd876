//! Schema container entries under `cn=schema,cn=config`.
//!
//! OpenLDAP names each schema snippet entry `cn={n}name`, where `n` is the
//! position the server loads it at. This naming is the server's own contract,
//! so it is reproduced exactly here.

use crate::directory::{AttributeMap, SearchEntry, split_dn};

/// Object classes of a newly created container entry.
pub const CONTAINER_OBJECT_CLASSES: [&str; 2] = ["top", "olcSchemaConfig"];

/// Object class identifying schema container entries in searches.
pub const CONTAINER_OBJECT_CLASS: &str = "olcSchemaConfig";

/// A named schema snippet entry, e.g. `cn={4}nextcloud,cn=schema,cn=config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContainer {
    ordinal: u32,
    name: String,
    base_dn: String,
}

impl SchemaContainer {
    pub fn new(ordinal: u32, name: impl Into<String>, base_dn: impl Into<String>) -> Self {
        Self {
            ordinal,
            name: name.into(),
            base_dn: base_dn.into(),
        }
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// The `cn` value: `{ordinal}name`.
    pub fn cn(&self) -> String {
        format!("{{{}}}{}", self.ordinal, self.name)
    }

    pub fn dn(&self) -> String {
        format!("cn={},{}", self.cn(), self.base_dn)
    }

    /// Attributes for adding this container as a new entry.
    pub fn entry_attributes(&self) -> AttributeMap {
        let mut attrs = AttributeMap::new();
        attrs.insert(
            "objectClass".to_string(),
            CONTAINER_OBJECT_CLASSES
                .iter()
                .map(|oc| oc.as_bytes().to_vec())
                .collect(),
        );
        attrs.insert("cn".to_string(), vec![self.cn().into_bytes()]);
        attrs
    }

    /// Parse a container from its DN.
    ///
    /// The first RDN must be `cn={n}name`; DNs of other shapes (including the
    /// schema root itself) yield `None`.
    pub fn from_dn(dn: &str) -> Option<Self> {
        let (ordinal, name) = parse_ordinal_name(first_cn(dn)?)?;
        Some(Self::new(ordinal, name, split_dn(dn).1.unwrap_or_default()))
    }
}

/// The value of a leading `cn=` RDN.
fn first_cn(dn: &str) -> Option<&str> {
    let (rdn, _) = split_dn(dn);
    let (attribute, value) = rdn.split_once('=')?;
    attribute
        .trim()
        .eq_ignore_ascii_case("cn")
        .then(|| value.trim())
}

/// Split `{n}name` into its ordinal digits and name.
fn split_ordinal_name(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix('{')?;
    let (digits, name) = rest.split_once('}')?;
    if digits.is_empty() || name.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits, name))
}

/// Split `{n}name` into its ordinal and name.
///
/// Ordinals that do not fit in a `u32` yield `None`.
pub fn parse_ordinal_name(value: &str) -> Option<(u32, &str)> {
    let (digits, name) = split_ordinal_name(value)?;
    Some((digits.parse().ok()?, name))
}

/// The containers present under the schema root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerIndex {
    containers: Vec<SchemaContainer>,
    // an entry carries an ordinal wider than u32
    out_of_range: bool,
}

impl ContainerIndex {
    /// Build the index from one-level search results.
    pub fn from_entries(entries: &[SearchEntry]) -> Self {
        let mut index = Self::default();
        for entry in entries {
            match SchemaContainer::from_dn(&entry.dn) {
                Some(container) => index.containers.push(container),
                None => {
                    if first_cn(&entry.dn).and_then(split_ordinal_name).is_some() {
                        index.out_of_range = true;
                    }
                }
            }
        }
        index
    }

    pub fn containers(&self) -> &[SchemaContainer] {
        &self.containers
    }

    /// Find the container for a schema name.
    ///
    /// Names compare case-insensitively, as `cn` values do.
    pub fn find(&self, name: &str) -> Option<&SchemaContainer> {
        self.containers
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// The ordinal a new container gets: one past the highest in use, or 0.
    ///
    /// `None` when the highest ordinal in use is already `u32::MAX` or does
    /// not fit in a `u32` at all.
    pub fn next_ordinal(&self) -> Option<u32> {
        if self.out_of_range {
            return None;
        }
        match self.containers.iter().map(SchemaContainer::ordinal).max() {
            Some(max) => max.checked_add(1),
            None => Some(0),
        }
    }
}
