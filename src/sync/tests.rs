//! Tests for upsert planning, container resolution and batch processing.

use super::plan::{UpsertPlan, plan_upsert};
use super::report::{ContainerStatus, DefinitionOutcome};
use super::SchemaSynchronizer;
use crate::config::SyncConfig;
use crate::directory::{
    AttributeMap, DirectoryError, DirectoryService, Filter, InMemoryDirectory, ModifyOperation,
    SearchEntry, SearchScope,
};
use crate::error::SyncError;
use crate::input::DefinitionSet;
use crate::schema::{SchemaContainer, SchemaDefinition};

const QUOTA_OLD: &str = "( 1.3.6.1.4.1.99999.1 NAME 'nextcloudQuota' DESC 'Old desc' SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 )";
const QUOTA_NEW: &str = "( 1.3.6.1.4.1.99999.1 NAME 'nextcloudQuota' DESC 'Quota for Nextcloud' SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )";
const USER_CLASS: &str = "( 1.3.6.1.4.1.99999.2 NAME 'nextcloudUser' DESC 'Auxiliary class' AUXILIARY MAY ( nextcloudQuota ) )";
const NEXTCLOUD_DN: &str = "cn={0}nextcloud,cn=schema,cn=config";

fn values(texts: &[&str]) -> Vec<Vec<u8>> {
    texts.iter().map(|t| t.as_bytes().to_vec()).collect()
}

fn config(name: &str) -> SyncConfig {
    SyncConfig::builder(name).build().unwrap()
}

async fn directory_with_nextcloud() -> InMemoryDirectory {
    let directory = InMemoryDirectory::with_schema_root().await;
    directory
        .insert_entry(
            NEXTCLOUD_DN,
            [
                ("objectClass", vec!["olcSchemaConfig"]),
                ("cn", vec!["{0}nextcloud"]),
            ],
        )
        .await;
    directory
}

#[test]
fn plan_adds_into_empty_set() {
    let plan = plan_upsert(&[], &SchemaDefinition::object_class(USER_CLASS)).unwrap();
    assert_eq!(
        plan,
        UpsertPlan::Add {
            value: USER_CLASS.as_bytes().to_vec()
        }
    );
}

#[test]
fn plan_skips_whitespace_variants() {
    let stored = values(&["{3}(  1.3.6.1.4.1.99999.2 NAME 'nextcloudUser'\n DESC 'Auxiliary class' AUXILIARY MAY ( nextcloudQuota ) )"]);
    let plan = plan_upsert(&stored, &SchemaDefinition::object_class(USER_CLASS)).unwrap();
    assert_eq!(plan, UpsertPlan::AlreadyPresent);
    assert!(!plan.is_change());
}

#[test]
fn plan_replaces_stale_value_in_place() {
    let other = "( 1.3.6.1.4.1.99999.9 NAME 'other' )";
    let stored = values(&[other, QUOTA_OLD]);
    let plan = plan_upsert(&stored, &SchemaDefinition::attribute_type(QUOTA_NEW)).unwrap();
    assert_eq!(
        plan,
        UpsertPlan::Replace {
            previous: QUOTA_OLD.as_bytes().to_vec(),
            values: values(&[other, QUOTA_NEW]),
        }
    );
}

#[test]
fn plan_keeps_ordering_prefix_and_drops_duplicate_identifiers() {
    let stored = values(&[
        "{0}( 1.3.6.1.4.1.99999.9 NAME 'other' )",
        &format!("{{1}}{}", QUOTA_OLD),
        "{2}( 1.3.6.1.4.1.99999.1 NAME 'nextcloudQuotaDup' )",
    ]);
    let plan = plan_upsert(&stored, &SchemaDefinition::attribute_type(QUOTA_NEW)).unwrap();
    let UpsertPlan::Replace { values: new_values, .. } = plan else {
        panic!("expected a replace, got {:?}", plan);
    };
    assert_eq!(
        new_values,
        values(&[
            "{0}( 1.3.6.1.4.1.99999.9 NAME 'other' )",
            &format!("{{1}}{}", QUOTA_NEW),
        ])
    );
}

#[test]
fn plan_ignores_unparsable_stored_values() {
    let stored = values(&["garbage", "( NAME 'no-oid' )"]);
    let plan = plan_upsert(&stored, &SchemaDefinition::attribute_type(QUOTA_NEW)).unwrap();
    assert!(matches!(plan, UpsertPlan::Add { .. }));
}

#[test]
fn plan_fails_for_new_definition_without_oid() {
    let err = plan_upsert(&[], &SchemaDefinition::attribute_type("( quota NAME 'q' )")).unwrap_err();
    assert_eq!(err.definition, "( quota NAME 'q' )");
}

#[test]
fn plan_matches_present_definition_even_without_oid() {
    let text = "( quota NAME 'q' )";
    let plan = plan_upsert(&values(&[text]), &SchemaDefinition::attribute_type(text)).unwrap();
    assert_eq!(plan, UpsertPlan::AlreadyPresent);
}

#[test]
fn plan_apply_yields_resulting_set() {
    let stored = values(&[QUOTA_OLD]);
    let plan = plan_upsert(&stored, &SchemaDefinition::attribute_type(QUOTA_NEW)).unwrap();
    assert_eq!(plan.apply(stored.clone()), values(&[QUOTA_NEW]));

    let plan = plan_upsert(&stored, &SchemaDefinition::object_class(USER_CLASS)).unwrap();
    assert_eq!(plan.apply(stored), values(&[QUOTA_OLD, USER_CLASS]));
}

#[tokio::test]
async fn resolve_reuses_existing_container() {
    let directory = directory_with_nextcloud().await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));

    let resolved = engine.resolve_container().await.unwrap();
    assert_eq!(resolved.status, ContainerStatus::Existing);
    assert_eq!(resolved.dn(), NEXTCLOUD_DN);
    assert!(directory.added_entries().await.is_empty());
}

#[tokio::test]
async fn resolve_creates_container_with_next_ordinal() {
    let directory = InMemoryDirectory::with_schema_root().await;
    for (dn, cn) in [
        ("cn={0}core,cn=schema,cn=config", "{0}core"),
        ("cn={1}cosine,cn=schema,cn=config", "{1}cosine"),
        ("cn={2}inetorgperson,cn=schema,cn=config", "{2}inetorgperson"),
    ] {
        directory
            .insert_entry(dn, [("objectClass", vec!["olcSchemaConfig"]), ("cn", vec![cn])])
            .await;
    }

    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));
    let resolved = engine.resolve_container().await.unwrap();
    assert_eq!(resolved.status, ContainerStatus::Created);
    assert_eq!(resolved.container.ordinal(), 3);

    let dn = "cn={3}nextcloud,cn=schema,cn=config";
    assert_eq!(directory.added_entries().await, vec![dn.to_string()]);
    let entry = directory.entry(dn).await.unwrap();
    assert_eq!(entry.values("cn"), &[b"{3}nextcloud".to_vec()]);
    assert_eq!(
        entry.values("objectClass"),
        &[b"top".to_vec(), b"olcSchemaConfig".to_vec()]
    );
}

#[tokio::test]
async fn resolve_first_container_gets_ordinal_zero() {
    let directory = InMemoryDirectory::with_schema_root().await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));
    let resolved = engine.resolve_container().await.unwrap();
    assert_eq!(resolved.dn(), NEXTCLOUD_DN);
}

#[tokio::test]
async fn resolve_fails_when_search_fails() {
    let directory = InMemoryDirectory::with_schema_root().await;
    directory.set_unavailable(true).await;
    let engine = SchemaSynchronizer::new(directory, config("nextcloud"));

    let err = engine.resolve_container().await.unwrap_err();
    assert!(matches!(err, SyncError::ContainerSearch(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn resolve_fails_when_create_is_refused() {
    let directory = InMemoryDirectory::with_schema_root().await;
    directory.set_read_only(true).await;
    let engine = SchemaSynchronizer::new(directory, config("nextcloud"));

    let err = engine.resolve_container().await.unwrap_err();
    assert!(
        matches!(err, SyncError::ContainerCreate { ref dn, .. } if dn == NEXTCLOUD_DN)
    );
}

#[tokio::test]
async fn resolve_refuses_to_wrap_the_ordinal() {
    let directory = InMemoryDirectory::with_schema_root().await;
    directory
        .insert_entry(
            "cn={4294967295}last,cn=schema,cn=config",
            [("objectClass", vec!["olcSchemaConfig"]), ("cn", vec!["{4294967295}last"])],
        )
        .await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));

    let err = engine.resolve_container().await.unwrap_err();
    assert!(matches!(err, SyncError::OrdinalsExhausted { ref base_dn } if base_dn == "cn=schema,cn=config"));
    assert!(err.is_fatal());
    assert!(directory.added_entries().await.is_empty());
}

/// A directory that rejects the first container add as a duplicate. When
/// `winner` is set, an entry with that `cn` appears just before the rejection,
/// as if another writer had created it.
#[derive(Clone)]
struct RacingDirectory {
    inner: InMemoryDirectory,
    winner: Option<&'static str>,
}

impl DirectoryService for RacingDirectory {
    async fn search(
        &self,
        base_dn: &str,
        scope: SearchScope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        self.inner.search(base_dn, scope, filter, attributes).await
    }

    async fn add_entry(&self, dn: &str, _attributes: AttributeMap) -> Result<(), DirectoryError> {
        if let Some(cn) = self.winner {
            self.inner
                .insert_entry(
                    &format!("cn={},cn=schema,cn=config", cn),
                    [("objectClass", vec!["olcSchemaConfig"]), ("cn", vec![cn])],
                )
                .await;
        }
        Err(DirectoryError::AlreadyExists { dn: dn.to_string() })
    }

    async fn modify_attribute(
        &self,
        dn: &str,
        operation: ModifyOperation,
        attribute: &str,
        values: Vec<Vec<u8>>,
    ) -> Result<(), DirectoryError> {
        self.inner
            .modify_attribute(dn, operation, attribute, values)
            .await
    }
}

#[tokio::test]
async fn resolve_reuses_container_created_concurrently() {
    let directory = RacingDirectory {
        inner: InMemoryDirectory::with_schema_root().await,
        winner: Some("{0}nextcloud"),
    };
    let engine = SchemaSynchronizer::new(directory, config("nextcloud"));

    let resolved = engine.resolve_container().await.unwrap();
    assert_eq!(resolved.status, ContainerStatus::Existing);
    assert_eq!(resolved.dn(), NEXTCLOUD_DN);
}

#[tokio::test]
async fn resolve_fails_when_duplicate_never_shows_up() {
    let directory = RacingDirectory {
        inner: InMemoryDirectory::with_schema_root().await,
        winner: Some("{0}other"),
    };
    let engine = SchemaSynchronizer::new(directory, config("nextcloud"));

    let err = engine.resolve_container().await.unwrap_err();
    let SyncError::ContainerCreate { dn, source } = err else {
        panic!("expected a create failure, got {:?}", err);
    };
    assert_eq!(dn, NEXTCLOUD_DN);
    assert!(source.is_already_exists());
}

#[tokio::test]
async fn upsert_single_definition() {
    let directory = directory_with_nextcloud().await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));
    let resolved = engine.resolve_container().await.unwrap();

    let definition = SchemaDefinition::object_class(USER_CLASS);
    let outcome = engine.upsert_definition(&resolved, &definition).await.unwrap();
    assert_eq!(outcome, DefinitionOutcome::Added);

    let outcome = engine.upsert_definition(&resolved, &definition).await.unwrap();
    assert_eq!(outcome, DefinitionOutcome::AlreadyPresent);

    let modifications = directory.modifications().await;
    assert_eq!(modifications.len(), 1);
    assert_eq!(modifications[0].operation, ModifyOperation::Add);
    assert_eq!(modifications[0].attribute, "olcObjectClasses");
}

#[tokio::test]
async fn sync_rejects_empty_batch() {
    let directory = directory_with_nextcloud().await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));

    let err = engine.sync(&DefinitionSet::new()).await.unwrap_err();
    assert!(matches!(err, SyncError::NoDefinitions));
    assert!(directory.modifications().await.is_empty());
}

#[tokio::test]
async fn sync_processes_attribute_types_before_object_classes() {
    let directory = directory_with_nextcloud().await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));

    let definitions: DefinitionSet = vec![
        SchemaDefinition::object_class(USER_CLASS),
        SchemaDefinition::attribute_type(QUOTA_NEW),
    ]
    .into_iter()
    .collect();

    let report = engine.sync(&definitions).await.unwrap();
    let attributes: Vec<_> = directory
        .modifications()
        .await
        .into_iter()
        .map(|m| m.attribute)
        .collect();
    assert_eq!(attributes, vec!["olcAttributeTypes", "olcObjectClasses"]);
    assert_eq!(report.summary().added, 2);
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn sync_continues_after_a_failed_definition() {
    let directory = directory_with_nextcloud().await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));

    let definitions: DefinitionSet = vec![
        SchemaDefinition::attribute_type("( not-an-oid NAME 'broken' )"),
        SchemaDefinition::attribute_type(QUOTA_NEW),
    ]
    .into_iter()
    .collect();

    let report = engine.sync(&definitions).await.unwrap();
    assert_eq!(report.results.len(), 2);
    assert!(report.results[0].outcome.is_failure());
    assert_eq!(report.results[0].oid, None);
    assert_eq!(report.results[1].outcome, DefinitionOutcome::Added);
    assert!(report.has_failures());
    assert_eq!(directory.modifications().await.len(), 1);
}

#[tokio::test]
async fn sync_reports_write_failures_per_definition() {
    let directory = directory_with_nextcloud().await;
    directory.set_read_only(true).await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));

    let definitions: DefinitionSet = vec![
        SchemaDefinition::attribute_type(QUOTA_NEW),
        SchemaDefinition::object_class(USER_CLASS),
    ]
    .into_iter()
    .collect();

    let report = engine.sync(&definitions).await.unwrap();
    let summary = report.summary();
    assert_eq!(summary.failed, 2);
    assert_eq!(report.failures().count(), 2);
    let line = report.results[0].status_line();
    assert!(line.starts_with("Error adding AttributeType '( 1.3.6.1.4.1.99999.1"));
    assert!(line.contains("result code 53"));
}

#[tokio::test]
async fn dry_run_writes_nothing_but_reports_outcomes() {
    let directory = InMemoryDirectory::with_schema_root().await;
    let config = SyncConfig::builder("nextcloud").dry_run(true).build().unwrap();
    let engine = SchemaSynchronizer::new(directory.clone(), config);

    let definitions: DefinitionSet = vec![
        SchemaDefinition::attribute_type(QUOTA_OLD),
        SchemaDefinition::attribute_type(QUOTA_NEW),
        SchemaDefinition::attribute_type(QUOTA_NEW),
        SchemaDefinition::object_class(USER_CLASS),
    ]
    .into_iter()
    .collect();

    let report = engine.sync(&definitions).await.unwrap();
    assert!(report.dry_run);
    assert_eq!(report.container_status, ContainerStatus::Planned);
    let outcomes: Vec<_> = report.results.iter().map(|r| r.outcome.clone()).collect();
    assert_eq!(
        outcomes,
        vec![
            DefinitionOutcome::Added,
            DefinitionOutcome::Replaced {
                previous: QUOTA_OLD.to_string()
            },
            DefinitionOutcome::AlreadyPresent,
            DefinitionOutcome::Added,
        ]
    );

    assert!(directory.added_entries().await.is_empty());
    assert!(directory.modifications().await.is_empty());
    assert!(directory.entry(NEXTCLOUD_DN).await.is_none());
}

#[tokio::test]
async fn missing_container_entry_fails_each_definition() {
    let directory = InMemoryDirectory::with_schema_root().await;
    let engine = SchemaSynchronizer::new(directory.clone(), config("nextcloud"));
    let resolved = super::ResolvedContainer {
        container: SchemaContainer::new(7, "ghost", "cn=schema,cn=config"),
        status: ContainerStatus::Existing,
    };

    let err = engine
        .upsert_definition(&resolved, &SchemaDefinition::object_class(USER_CLASS))
        .await
        .unwrap_err();
    assert!(!err.is_fatal());
    assert!(err.to_string().contains("cn={7}ghost,cn=schema,cn=config"));
}
