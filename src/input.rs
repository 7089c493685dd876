//! Loading schema definitions from files.
//!
//! Two formats are understood:
//!
//! - Plain definition files: one definition per line, blank lines and `#`
//!   comments ignored.
//! - Schema LDIF, such as an OpenLDAP `cn=config` schema export. Values of
//!   `olcAttributeTypes`/`attributeTypes` and `olcObjectClasses`/`objectClasses`
//!   are collected; folded lines, comments and base64 values are handled, and
//!   `{n}` ordering prefixes are dropped. Every other attribute is ignored,
//!   as are the `changetype`/`add`/`replace`/`-` lines of modify records.

use crate::canonical::strip_ordering_prefix;
use crate::schema::{SchemaDefinition, SchemaKind};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading definitions.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Error reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("LDIF line {line}: {message}")]
    Ldif { line: usize, message: String },
}

/// Definitions to synchronize, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionSet {
    attribute_types: Vec<SchemaDefinition>,
    object_classes: Vec<SchemaDefinition>,
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition, keeping supply order within its kind.
    pub fn push(&mut self, definition: SchemaDefinition) {
        match definition.kind() {
            SchemaKind::AttributeType => self.attribute_types.push(definition),
            SchemaKind::ObjectClass => self.object_classes.push(definition),
        }
    }

    pub fn of_kind(&self, kind: SchemaKind) -> &[SchemaDefinition] {
        match kind {
            SchemaKind::AttributeType => &self.attribute_types,
            SchemaKind::ObjectClass => &self.object_classes,
        }
    }

    pub fn len(&self) -> usize {
        self.attribute_types.len() + self.object_classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All definitions in processing order: attribute types first.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaDefinition> {
        self.attribute_types.iter().chain(self.object_classes.iter())
    }
}

impl Extend<SchemaDefinition> for DefinitionSet {
    fn extend<I: IntoIterator<Item = SchemaDefinition>>(&mut self, iter: I) {
        for definition in iter {
            self.push(definition);
        }
    }
}

impl FromIterator<SchemaDefinition> for DefinitionSet {
    fn from_iter<I: IntoIterator<Item = SchemaDefinition>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

fn read(path: &Path) -> Result<String, InputError> {
    fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a plain definition list: one definition per line.
pub fn parse_definition_lines(text: &str, kind: SchemaKind) -> Vec<SchemaDefinition> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| SchemaDefinition::new(kind, line))
        .collect()
}

/// Load a plain definition file.
pub fn load_definitions_file(
    path: impl AsRef<Path>,
    kind: SchemaKind,
) -> Result<Vec<SchemaDefinition>, InputError> {
    Ok(parse_definition_lines(&read(path.as_ref())?, kind))
}

/// A logical LDIF line after unfolding, with the number of its first
/// physical line.
struct LogicalLine {
    number: usize,
    text: String,
}

fn unfold(text: &str) -> Vec<LogicalLine> {
    let mut lines: Vec<LogicalLine> = Vec::new();
    let mut in_comment = false;

    for (index, raw) in text.lines().enumerate() {
        if let Some(continuation) = raw.strip_prefix(' ') {
            if in_comment {
                continue;
            }
            if let Some(last) = lines.last_mut() {
                last.text.push_str(continuation);
                continue;
            }
        }
        in_comment = raw.starts_with('#');
        if in_comment || raw.trim().is_empty() {
            continue;
        }
        lines.push(LogicalLine {
            number: index + 1,
            text: raw.to_string(),
        });
    }
    lines
}

/// Parse schema definitions out of LDIF text.
pub fn parse_schema_ldif(text: &str) -> Result<Vec<SchemaDefinition>, InputError> {
    let mut definitions = Vec::new();

    for line in unfold(text) {
        // Separator between the changes of a `changetype: modify` record.
        if line.text.trim_end() == "-" {
            continue;
        }
        let Some((description, rest)) = line.text.split_once(':') else {
            return Err(InputError::Ldif {
                line: line.number,
                message: format!("missing ':' separator in '{}'", line.text),
            });
        };
        // Attribute options (`attributeTypes;x-origin`) do not change the kind.
        let name = description.split(';').next().unwrap_or_default().trim();
        let Some(kind) = SchemaKind::from_ldif_attribute(name) else {
            continue;
        };

        let value = if let Some(encoded) = rest.strip_prefix(':') {
            let bytes = BASE64
                .decode(encoded.trim())
                .map_err(|e| InputError::Ldif {
                    line: line.number,
                    message: format!("invalid base64 value for {}: {}", name, e),
                })?;
            String::from_utf8(bytes).map_err(|_| InputError::Ldif {
                line: line.number,
                message: format!("value of {} is not valid UTF-8", name),
            })?
        } else if rest.starts_with('<') {
            return Err(InputError::Ldif {
                line: line.number,
                message: format!("URL values are not supported for {}", name),
            });
        } else {
            rest.trim_start().to_string()
        };

        let stripped = strip_ordering_prefix(value.as_bytes()).len();
        let text = value[value.len() - stripped..].trim().to_string();
        if !text.is_empty() {
            definitions.push(SchemaDefinition::new(kind, text));
        }
    }

    Ok(definitions)
}

/// Load a schema LDIF file.
pub fn load_schema_ldif(path: impl AsRef<Path>) -> Result<Vec<SchemaDefinition>, InputError> {
    parse_schema_ldif(&read(path.as_ref())?)
}
