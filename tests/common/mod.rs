//! Shared fixtures for the integration tests.
//!
//! Every test drives the engine through [`InMemoryDirectory`], seeded with a
//! `cn=config` tree shaped like a stock OpenLDAP install.

#![allow(dead_code)]

use ldap_schema_sync::{DefinitionSet, InMemoryDirectory, SchemaDefinition, SyncConfig};

pub const NEXTCLOUD_DN: &str = "cn={0}nextcloud,cn=schema,cn=config";

pub const QUOTA_OLD: &str = "( 1.3.6.1.4.1.99999.1 NAME 'nextcloudQuota' DESC 'Old description' EQUALITY caseIgnoreMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 SINGLE-VALUE )";
pub const QUOTA_NEW: &str = "( 1.3.6.1.4.1.99999.1 NAME 'nextcloudQuota' DESC 'Nextcloud quota' EQUALITY caseIgnoreMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 SINGLE-VALUE )";
pub const ENABLED: &str = "( 1.3.6.1.4.1.99999.3 NAME 'nextcloudEnabled' DESC 'Nextcloud account enabled' EQUALITY booleanMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.7 SINGLE-VALUE )";
pub const USER_CLASS: &str = "( 1.3.6.1.4.1.99999.2 NAME 'nextcloudUser' DESC 'Nextcloud user' SUP top AUXILIARY MAY ( nextcloudQuota $ nextcloudEnabled ) )";

/// Stock schema entries found on a fresh install.
pub const STOCK_SCHEMAS: [&str; 4] = ["{0}core", "{1}cosine", "{2}nis", "{3}inetorgperson"];

pub fn config(schema_name: &str) -> SyncConfig {
    SyncConfig::builder(schema_name)
        .build()
        .expect("valid test configuration")
}

pub fn dry_run_config(schema_name: &str) -> SyncConfig {
    SyncConfig::builder(schema_name)
        .dry_run(true)
        .build()
        .expect("valid test configuration")
}

pub fn definitions(items: impl IntoIterator<Item = SchemaDefinition>) -> DefinitionSet {
    items.into_iter().collect()
}

/// A directory holding only the schema root.
pub async fn empty_directory() -> InMemoryDirectory {
    InMemoryDirectory::with_schema_root().await
}

/// A directory with the stock schema entries.
pub async fn stock_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::with_schema_root().await;
    for cn in STOCK_SCHEMAS {
        seed_container(&directory, cn, &[], &[]).await;
    }
    directory
}

/// Add a schema container entry holding the given values.
pub async fn seed_container(
    directory: &InMemoryDirectory,
    cn: &str,
    attribute_types: &[&str],
    object_classes: &[&str],
) {
    let dn = format!("cn={},cn=schema,cn=config", cn);
    let mut attributes = vec![("objectClass", vec!["olcSchemaConfig"]), ("cn", vec![cn])];
    if !attribute_types.is_empty() {
        attributes.push(("olcAttributeTypes", attribute_types.to_vec()));
    }
    if !object_classes.is_empty() {
        attributes.push(("olcObjectClasses", object_classes.to_vec()));
    }
    directory.insert_entry(&dn, attributes).await;
}

pub fn as_bytes(values: &[&str]) -> Vec<Vec<u8>> {
    values.iter().map(|v| v.as_bytes().to_vec()).collect()
}
