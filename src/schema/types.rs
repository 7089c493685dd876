//! Core schema definition types.
//!
//! A [`SchemaDefinition`] is one attributeType or objectClass description in
//! LDIF syntax, exactly as the operator wrote it. Its object identifier is the
//! semantic key; its normalized form is what equality checks compare.

use crate::canonical::{self, OidParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of schema element a definition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaKind {
    AttributeType,
    ObjectClass,
}

impl SchemaKind {
    /// Processing order within a run.
    pub const ALL: [SchemaKind; 2] = [SchemaKind::AttributeType, SchemaKind::ObjectClass];

    /// The `cn=config` attribute holding definitions of this kind.
    pub fn config_attribute(self) -> &'static str {
        match self {
            SchemaKind::AttributeType => "olcAttributeTypes",
            SchemaKind::ObjectClass => "olcObjectClasses",
        }
    }

    /// Label used in status lines.
    pub fn label(self) -> &'static str {
        match self {
            SchemaKind::AttributeType => "AttributeType",
            SchemaKind::ObjectClass => "ObjectClass",
        }
    }

    /// Map an LDIF attribute name onto a kind.
    ///
    /// Accepts both the `cn=config` names and the subschema subentry names
    /// (`attributeTypes`, `objectClasses`), case-insensitively.
    pub fn from_ldif_attribute(name: &str) -> Option<Self> {
        const ATTRIBUTE_TYPES: [&str; 2] = ["olcAttributeTypes", "attributeTypes"];
        const OBJECT_CLASSES: [&str; 2] = ["olcObjectClasses", "objectClasses"];

        if ATTRIBUTE_TYPES.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            Some(SchemaKind::AttributeType)
        } else if OBJECT_CLASSES.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            Some(SchemaKind::ObjectClass)
        } else {
            None
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::AttributeType => write!(f, "attributeType"),
            SchemaKind::ObjectClass => write!(f, "objectClass"),
        }
    }
}

/// One attributeType or objectClass definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    kind: SchemaKind,
    text: String,
}

impl SchemaDefinition {
    pub fn new(kind: SchemaKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn attribute_type(text: impl Into<String>) -> Self {
        Self::new(SchemaKind::AttributeType, text)
    }

    pub fn object_class(text: impl Into<String>) -> Self {
        Self::new(SchemaKind::ObjectClass, text)
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// The definition exactly as supplied.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The numeric object identifier of the definition.
    pub fn oid(&self) -> Result<&str, OidParseError> {
        canonical::extract_oid(&self.text)
    }

    /// Whitespace-normalized form used for equality checks.
    pub fn normalized(&self) -> Vec<u8> {
        canonical::normalize(self.text.as_bytes())
    }
}

impl fmt::Display for SchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
