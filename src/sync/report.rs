//! Per-definition outcomes and the batch report of a run.

use crate::schema::{SchemaDefinition, SchemaKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to one definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DefinitionOutcome {
    /// Appended as a new value
    Added,
    /// Replaced a stale value sharing its object identifier
    Replaced { previous: String },
    /// Already stored, nothing written
    AlreadyPresent,
    /// The definition could not be processed
    Failed { reason: String },
}

impl DefinitionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DefinitionOutcome::Failed { .. })
    }

    /// Whether the directory was (or in a dry run, would be) modified.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            DefinitionOutcome::Added | DefinitionOutcome::Replaced { .. }
        )
    }
}

/// Report line for one definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionReport {
    pub kind: SchemaKind,
    pub oid: Option<String>,
    pub definition: String,
    #[serde(flatten)]
    pub outcome: DefinitionOutcome,
}

impl DefinitionReport {
    pub fn new(definition: &SchemaDefinition, outcome: DefinitionOutcome) -> Self {
        Self {
            kind: definition.kind(),
            oid: definition.oid().ok().map(str::to_string),
            definition: definition.text().to_string(),
            outcome,
        }
    }

    /// One human-readable status line.
    pub fn status_line(&self) -> String {
        let label = self.kind.label();
        match &self.outcome {
            DefinitionOutcome::Added => format!("Added {}: {}", label, self.definition),
            DefinitionOutcome::Replaced { .. } => {
                format!("Replaced {}: {}", label, self.definition)
            }
            DefinitionOutcome::AlreadyPresent => {
                format!("{} already present: {}", label, self.definition)
            }
            DefinitionOutcome::Failed { reason } => {
                format!("Error adding {} '{}': {}", label, self.definition, reason)
            }
        }
    }
}

/// How the schema container was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    /// An entry with the schema name already existed
    Existing,
    /// The entry was created by this run
    Created,
    /// The entry does not exist and a dry run did not create it
    Planned,
}

/// Outcome counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub added: usize,
    pub replaced: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// Everything a run did, in processing order.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub schema_name: String,
    pub container_dn: String,
    pub container_ordinal: u32,
    pub container_status: ContainerStatus,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<DefinitionReport>,
}

impl SyncReport {
    pub fn new(
        schema_name: impl Into<String>,
        container_dn: impl Into<String>,
        container_ordinal: u32,
        container_status: ContainerStatus,
        dry_run: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            container_dn: container_dn.into(),
            container_ordinal,
            container_status,
            dry_run,
            started_at,
            finished_at: None,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: DefinitionReport) {
        self.results.push(result);
    }

    /// Stamp the finish time.
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn summary(&self) -> ReportSummary {
        self.results
            .iter()
            .fold(ReportSummary::default(), |mut summary, result| {
                match result.outcome {
                    DefinitionOutcome::Added => summary.added += 1,
                    DefinitionOutcome::Replaced { .. } => summary.replaced += 1,
                    DefinitionOutcome::AlreadyPresent => summary.already_present += 1,
                    DefinitionOutcome::Failed { .. } => summary.failed += 1,
                }
                summary
            })
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &DefinitionReport> {
        self.results.iter().filter(|r| r.outcome.is_failure())
    }

    /// Serialize the report, summary included, as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct WithSummary<'a> {
            #[serde(flatten)]
            report: &'a SyncReport,
            summary: ReportSummary,
        }

        serde_json::to_string_pretty(&WithSummary {
            report: self,
            summary: self.summary(),
        })
    }
}
