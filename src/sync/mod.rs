//! Idempotent upsert of schema definitions.
//!
//! # Key Types
//!
//! - [`SchemaSynchronizer`] - Resolves the container and applies definitions
//! - [`UpsertPlan`] - The mutation one definition needs, decided without I/O
//! - [`SyncReport`] - Per-definition outcomes of a run
//!
//! # Example Usage
//!
//! ```rust
//! use ldap_schema_sync::directory::InMemoryDirectory;
//! use ldap_schema_sync::input::DefinitionSet;
//! use ldap_schema_sync::schema::SchemaDefinition;
//! use ldap_schema_sync::sync::{DefinitionOutcome, SchemaSynchronizer};
//! use ldap_schema_sync::SyncConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::with_schema_root().await;
//! let config = SyncConfig::builder("nextcloud").build()?;
//! let engine = SchemaSynchronizer::new(directory, config);
//!
//! let definitions: DefinitionSet = vec![SchemaDefinition::object_class(
//!     "( 1.3.6.1.4.1.99999.2 NAME 'nextcloudUser' AUXILIARY MAY ( nextcloudQuota ) )",
//! )]
//! .into_iter()
//! .collect();
//!
//! let report = engine.sync(&definitions).await?;
//! assert_eq!(report.container_dn, "cn={0}nextcloud,cn=schema,cn=config");
//! assert_eq!(report.results[0].outcome, DefinitionOutcome::Added);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod plan;
pub mod report;

#[cfg(test)]
mod tests;

pub use engine::{ResolvedContainer, SchemaSynchronizer};
pub use plan::{UpsertPlan, plan_upsert, stored_value_matches};
pub use report::{
    ContainerStatus, DefinitionOutcome, DefinitionReport, ReportSummary, SyncReport,
};
