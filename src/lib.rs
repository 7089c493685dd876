//! Idempotent schema synchronization for OpenLDAP `cn=config`.
//!
//! Upserts `attributeType` and `objectClass` definitions into a named schema
//! entry under `cn=schema,cn=config`, creating the entry with the next free
//! `{n}` ordinal when it does not exist yet. Re-running with the same input
//! writes nothing; a changed definition replaces the stored value sharing its
//! object identifier.
//!
//! # Core Components
//!
//! - [`SchemaSynchronizer`] - Resolves the schema container and upserts definitions
//! - [`DirectoryService`] - Trait for the directory operations the engine needs
//! - [`LdapDirectory`] / [`InMemoryDirectory`] - Live and in-memory backends
//! - [`SyncReport`] - Per-definition outcomes of a run
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ldap_schema_sync::{DefinitionSet, LdapDirectory, SchemaDefinition, SchemaSynchronizer, SyncConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::builder("nextcloud").build()?;
//! let directory = LdapDirectory::connect(&config.server_uri, &config.bind_dn, &config.bind_password).await?;
//!
//! let definitions: DefinitionSet = vec![SchemaDefinition::object_class(
//!     "( 1.3.6.1.4.1.99999.2 NAME 'nextcloudUser' AUXILIARY )",
//! )]
//! .into_iter()
//! .collect();
//!
//! let report = SchemaSynchronizer::new(directory, config).sync(&definitions).await?;
//! for result in &report.results {
//!     println!("{}", result.status_line());
//! }
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod config;
pub mod directory;
pub mod error;
pub mod input;
pub mod schema;
pub mod sync;

pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use directory::{DirectoryError, DirectoryService, InMemoryDirectory, LdapDirectory};
pub use error::{SyncError, SyncResult};
pub use input::{DefinitionSet, InputError};
pub use schema::{SchemaDefinition, SchemaKind};
pub use sync::{DefinitionOutcome, SchemaSynchronizer, SyncReport};
