//! The synchronization engine.
//!
//! [`SchemaSynchronizer`] resolves the schema container once, then upserts
//! every definition in turn. Each directory request is awaited before the next
//! one is issued. Failures while resolving the container abort the run;
//! failures on a single definition are recorded in the report and processing
//! moves on.

use crate::config::SyncConfig;
use crate::directory::{DirectoryError, DirectoryService, Filter, ModifyOperation, SearchScope};
use crate::error::{SyncError, SyncResult};
use crate::input::DefinitionSet;
use crate::schema::container::CONTAINER_OBJECT_CLASS;
use crate::schema::{ContainerIndex, SchemaContainer, SchemaDefinition, SchemaKind};
use crate::sync::plan::{UpsertPlan, plan_upsert};
use crate::sync::report::{ContainerStatus, DefinitionOutcome, DefinitionReport, SyncReport};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;

/// The container a run writes to, and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContainer {
    pub container: SchemaContainer,
    pub status: ContainerStatus,
}

impl ResolvedContainer {
    pub fn dn(&self) -> String {
        self.container.dn()
    }
}

/// Value sets of a dry run, standing in for the directory once a definition
/// of that kind has been planned.
type Simulation = HashMap<SchemaKind, Vec<Vec<u8>>>;

/// Upserts schema definitions into one named schema container.
pub struct SchemaSynchronizer<D> {
    directory: D,
    config: SyncConfig,
}

impl<D: DirectoryService> SchemaSynchronizer<D> {
    pub fn new(directory: D, config: SyncConfig) -> Self {
        Self { directory, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn into_directory(self) -> D {
        self.directory
    }

    /// Synchronize a batch of definitions.
    ///
    /// Attribute types are processed before object classes, each in supply
    /// order.
    ///
    /// # Errors
    /// [`SyncError::NoDefinitions`] for an empty batch, and the container
    /// resolution errors of [`resolve_container`](Self::resolve_container).
    /// Per-definition failures are reported, not returned.
    pub async fn sync(&self, definitions: &DefinitionSet) -> SyncResult<SyncReport> {
        let started_at = Utc::now();
        if definitions.is_empty() {
            return Err(SyncError::NoDefinitions);
        }

        let resolved = self.resolve_container().await?;
        let mut report = SyncReport::new(
            &self.config.schema_name,
            resolved.dn(),
            resolved.container.ordinal(),
            resolved.status,
            self.config.dry_run,
            started_at,
        );

        let mut simulation = Simulation::new();
        for kind in SchemaKind::ALL {
            for definition in definitions.of_kind(kind) {
                let outcome = match self
                    .upsert_with(&resolved, definition, &mut simulation)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(
                            "Error adding {} '{}': {}",
                            kind.label(),
                            definition.text(),
                            e
                        );
                        DefinitionOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                report.push(DefinitionReport::new(definition, outcome));
            }
        }

        let summary = report.summary();
        info!(
            "Schema '{}': {} added, {} replaced, {} already present, {} failed",
            self.config.schema_name,
            summary.added,
            summary.replaced,
            summary.already_present,
            summary.failed
        );
        Ok(report.finish())
    }

    /// Upsert a single definition into a resolved container.
    ///
    /// # Errors
    /// Directory failures and unparsable identifiers of new definitions.
    pub async fn upsert_definition(
        &self,
        resolved: &ResolvedContainer,
        definition: &SchemaDefinition,
    ) -> SyncResult<DefinitionOutcome> {
        self.upsert_with(resolved, definition, &mut Simulation::new())
            .await
    }

    async fn upsert_with(
        &self,
        resolved: &ResolvedContainer,
        definition: &SchemaDefinition,
        simulation: &mut Simulation,
    ) -> SyncResult<DefinitionOutcome> {
        let kind = definition.kind();
        let stored = match simulation.get(&kind) {
            Some(values) => values.clone(),
            None => self.stored_values(resolved, kind).await?,
        };

        let plan = plan_upsert(&stored, definition)?;
        let dn = resolved.dn();
        let attribute = kind.config_attribute();

        if self.config.dry_run {
            debug!("Dry run: planned {:?} for {} on {}", plan, attribute, dn);
            simulation.insert(kind, plan.apply(stored));
        } else {
            match &plan {
                UpsertPlan::AlreadyPresent => {}
                UpsertPlan::Add { value } => {
                    self.directory
                        .modify_attribute(&dn, ModifyOperation::Add, attribute, vec![value.clone()])
                        .await?;
                }
                UpsertPlan::Replace { values, .. } => {
                    self.directory
                        .modify_attribute(&dn, ModifyOperation::Replace, attribute, values.clone())
                        .await?;
                }
            }
        }

        let outcome = match plan {
            UpsertPlan::AlreadyPresent => DefinitionOutcome::AlreadyPresent,
            UpsertPlan::Add { .. } => DefinitionOutcome::Added,
            UpsertPlan::Replace { previous, .. } => DefinitionOutcome::Replaced {
                previous: String::from_utf8_lossy(&previous).into_owned(),
            },
        };
        if outcome.is_change() {
            info!(
                "{} (on {})",
                DefinitionReport::new(definition, outcome.clone()).status_line(),
                dn
            );
        }
        Ok(outcome)
    }

    /// Values currently stored in the container for one kind.
    async fn stored_values(
        &self,
        resolved: &ResolvedContainer,
        kind: SchemaKind,
    ) -> SyncResult<Vec<Vec<u8>>> {
        if resolved.status == ContainerStatus::Planned {
            return Ok(Vec::new());
        }

        let dn = resolved.dn();
        let attribute = kind.config_attribute();
        let entries = self
            .directory
            .search(&dn, SearchScope::Base, &Filter::any(), &[attribute])
            .await?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or(DirectoryError::NoSuchObject { dn })?;
        Ok(entry.values(attribute).to_vec())
    }

    /// List the containers currently under the schema root.
    pub async fn scan_containers(&self) -> SyncResult<ContainerIndex> {
        let entries = self
            .directory
            .search(
                &self.config.base_dn,
                SearchScope::OneLevel,
                &Filter::equality("objectClass", CONTAINER_OBJECT_CLASS),
                &["cn"],
            )
            .await
            .map_err(SyncError::ContainerSearch)?;
        debug!(
            "Found {} schema entries under {}",
            entries.len(),
            self.config.base_dn
        );
        Ok(ContainerIndex::from_entries(&entries))
    }

    /// Find the container for the configured schema name, creating it with
    /// the next free ordinal if it does not exist.
    ///
    /// If the create is rejected because the entry already exists, another
    /// writer got there first: the containers are scanned once more and the
    /// entry is reused if it now carries the schema name.
    ///
    /// # Errors
    /// [`SyncError::ContainerSearch`], [`SyncError::ContainerCreate`], and
    /// [`SyncError::OrdinalsExhausted`] when no ordinal is left for a new entry.
    pub async fn resolve_container(&self) -> SyncResult<ResolvedContainer> {
        let name = &self.config.schema_name;
        let index = self.scan_containers().await?;

        if let Some(existing) = index.find(name) {
            info!(
                "Using existing schema index {{{}}} for '{}'",
                existing.ordinal(),
                name
            );
            return Ok(ResolvedContainer {
                container: existing.clone(),
                status: ContainerStatus::Existing,
            });
        }

        let ordinal = index
            .next_ordinal()
            .ok_or_else(|| SyncError::OrdinalsExhausted {
                base_dn: self.config.base_dn.clone(),
            })?;
        let container = SchemaContainer::new(ordinal, name, &self.config.base_dn);
        let dn = container.dn();

        if self.config.dry_run {
            info!("Dry run: would create schema entry {}", dn);
            return Ok(ResolvedContainer {
                container,
                status: ContainerStatus::Planned,
            });
        }

        match self
            .directory
            .add_entry(&dn, container.entry_attributes())
            .await
        {
            Ok(()) => {
                info!("Created schema entry {}", dn);
                Ok(ResolvedContainer {
                    container,
                    status: ContainerStatus::Created,
                })
            }
            Err(source) if source.is_already_exists() => {
                warn!("Schema entry {} appeared concurrently, rescanning", dn);
                let index = self.scan_containers().await?;
                match index.find(name) {
                    Some(existing) => {
                        info!(
                            "Using existing schema index {{{}}} for '{}'",
                            existing.ordinal(),
                            name
                        );
                        Ok(ResolvedContainer {
                            container: existing.clone(),
                            status: ContainerStatus::Existing,
                        })
                    }
                    None => Err(SyncError::ContainerCreate { dn, source }),
                }
            }
            Err(source) => Err(SyncError::ContainerCreate { dn, source }),
        }
    }
}
