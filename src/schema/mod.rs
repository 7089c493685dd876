//! Schema definitions and the container entries that hold them.
//!
//! # Key Types
//!
//! - [`SchemaDefinition`] - One attributeType or objectClass in LDIF syntax
//! - [`SchemaKind`] - Which of the two a definition is, and where it is stored
//! - [`SchemaContainer`] - A `cn={n}name` entry under `cn=schema,cn=config`
//! - [`ContainerIndex`] - The containers currently present, for ordinal lookup
//!
//! # Examples
//!
//! ```rust
//! use ldap_schema_sync::schema::{SchemaContainer, SchemaDefinition, SchemaKind};
//!
//! let definition = SchemaDefinition::attribute_type(
//!     "( 1.3.6.1.4.1.99999.1 NAME 'nextcloudQuota' SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 )",
//! );
//! assert_eq!(definition.oid().unwrap(), "1.3.6.1.4.1.99999.1");
//! assert_eq!(SchemaKind::AttributeType.config_attribute(), "olcAttributeTypes");
//!
//! let container = SchemaContainer::new(0, "nextcloud", "cn=schema,cn=config");
//! assert_eq!(container.dn(), "cn={0}nextcloud,cn=schema,cn=config");
//! ```

pub mod container;
pub mod types;


pub use container::{ContainerIndex, SchemaContainer, parse_ordinal_name};
pub use types::{SchemaDefinition, SchemaKind};
