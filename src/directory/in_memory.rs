//! In-memory directory backend.
//!
//! Holds entries in a map keyed by normalized DN and applies the same
//! add/modify semantics an LDAP server would for the operations the sync engine
//! uses. Every successful mutation is recorded, which makes the backend the
//! workhorse of the test suite and of offline dry runs against an exported
//! tree.
//!
//! Failure injection is available through [`InMemoryDirectory::set_unavailable`]
//! (every operation fails) and [`InMemoryDirectory::set_read_only`] (writes are
//! refused with `unwillingToPerform`).

use super::errors::{
    DirectoryError, RC_ATTRIBUTE_OR_VALUE_EXISTS, RC_UNWILLING_TO_PERFORM,
};
use super::{
    AttributeMap, DirectoryService, Filter, ModifyOperation, SearchEntry, SearchScope,
    normalize_dn, split_dn,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// LDAP result code for `noSuchAttribute`.
const RC_NO_SUCH_ATTRIBUTE: u32 = 16;

/// One successful `modify_attribute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub dn: String,
    pub operation: ModifyOperation,
    pub attribute: String,
    pub values: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct State {
    // normalized dn -> entry
    entries: BTreeMap<String, SearchEntry>,
    modifications: Vec<Modification>,
    added: Vec<String>,
    unavailable: bool,
    read_only: bool,
}

/// Thread-safe in-memory directory.
///
/// Cloning shares the underlying state, so a test can hand one clone to the
/// engine and inspect the recorded mutations through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<State>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding `cn=config` and `cn=schema,cn=config`.
    pub async fn with_schema_root() -> Self {
        let directory = Self::new();
        directory
            .insert_entry(
                "cn=config",
                [("objectClass", vec!["olcGlobal"]), ("cn", vec!["config"])],
            )
            .await;
        directory
            .insert_entry(
                "cn=schema,cn=config",
                [
                    ("objectClass", vec!["olcSchemaConfig"]),
                    ("cn", vec!["schema"]),
                ],
            )
            .await;
        directory
    }

    /// Seed an entry without recording a mutation, replacing any existing one.
    pub async fn insert_entry<'a, I>(&self, dn: &str, attributes: I)
    where
        I: IntoIterator<Item = (&'a str, Vec<&'a str>)>,
    {
        let attributes: AttributeMap = attributes
            .into_iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.into_iter().map(|v| v.as_bytes().to_vec()).collect(),
                )
            })
            .collect();
        let mut state = self.state.write().await;
        state
            .entries
            .insert(normalize_dn(dn), SearchEntry::new(dn, attributes));
    }

    /// Fetch a copy of an entry.
    pub async fn entry(&self, dn: &str) -> Option<SearchEntry> {
        let state = self.state.read().await;
        state.entries.get(&normalize_dn(dn)).cloned()
    }

    /// Values currently stored for an attribute of an entry.
    pub async fn values(&self, dn: &str, attribute: &str) -> Vec<Vec<u8>> {
        self.entry(dn)
            .await
            .map(|entry| entry.values(attribute).to_vec())
            .unwrap_or_default()
    }

    /// All successful attribute modifications, in order.
    pub async fn modifications(&self) -> Vec<Modification> {
        self.state.read().await.modifications.clone()
    }

    /// DNs of entries created through `add_entry`, in order.
    pub async fn added_entries(&self) -> Vec<String> {
        self.state.read().await.added.clone()
    }

    /// Forget recorded mutations while keeping the entries.
    pub async fn clear_history(&self) {
        let mut state = self.state.write().await;
        state.modifications.clear();
        state.added.clear();
    }

    /// Make every operation fail with a connection error.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Make every write fail with `unwillingToPerform`.
    pub async fn set_read_only(&self, read_only: bool) {
        self.state.write().await.read_only = read_only;
    }

    fn check_available(state: &State) -> Result<(), DirectoryError> {
        if state.unavailable {
            return Err(DirectoryError::Connection {
                message: "directory unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn check_writable(state: &State, operation: &str, dn: &str) -> Result<(), DirectoryError> {
        Self::check_available(state)?;
        if state.read_only {
            return Err(DirectoryError::from_result(
                operation,
                dn,
                RC_UNWILLING_TO_PERFORM,
                "directory is read-only",
            ));
        }
        Ok(())
    }

    fn in_scope(candidate: &str, base: &str, scope: SearchScope) -> bool {
        match scope {
            SearchScope::Base => candidate == base,
            SearchScope::OneLevel => split_dn(candidate).1 == Some(base),
            SearchScope::Subtree => {
                candidate == base || candidate.ends_with(&format!(",{}", base))
            }
        }
    }

    fn select_attributes(entry: &SearchEntry, attributes: &[&str]) -> SearchEntry {
        if attributes.is_empty() || attributes.contains(&"*") {
            return entry.clone();
        }
        let selected = entry
            .attributes
            .iter()
            .filter(|(name, _)| attributes.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        SearchEntry::new(entry.dn.clone(), selected)
    }
}

/// The stored spelling of an attribute name, or the given one if absent.
fn attribute_key(entry: &SearchEntry, attribute: &str) -> String {
    entry
        .attributes
        .keys()
        .find(|name| name.eq_ignore_ascii_case(attribute))
        .cloned()
        .unwrap_or_else(|| attribute.to_string())
}

fn attribute_mut<'a>(entry: &'a mut SearchEntry, attribute: &str) -> Option<&'a mut Vec<Vec<u8>>> {
    entry
        .attributes
        .iter_mut()
        .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
        .map(|(_, values)| values)
}

fn remove_attribute(entry: &mut SearchEntry, attribute: &str) -> bool {
    let key = entry
        .attributes
        .keys()
        .find(|name| name.eq_ignore_ascii_case(attribute))
        .cloned();
    match key {
        Some(key) => entry.attributes.remove(&key).is_some(),
        None => false,
    }
}

impl DirectoryService for InMemoryDirectory {
    async fn search(
        &self,
        base_dn: &str,
        scope: SearchScope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let state = self.state.read().await;
        Self::check_available(&state)?;

        let base = normalize_dn(base_dn);
        if scope == SearchScope::Base && !state.entries.contains_key(&base) {
            return Err(DirectoryError::NoSuchObject {
                dn: base_dn.to_string(),
            });
        }

        Ok(state
            .entries
            .iter()
            .filter(|(dn, _)| Self::in_scope(dn, &base, scope))
            .filter(|(_, entry)| filter.matches(&entry.attributes))
            .map(|(_, entry)| Self::select_attributes(entry, attributes))
            .collect())
    }

    async fn add_entry(&self, dn: &str, attributes: AttributeMap) -> Result<(), DirectoryError> {
        let mut state = self.state.write().await;
        Self::check_writable(&state, "add", dn)?;

        let key = normalize_dn(dn);
        if state.entries.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists { dn: dn.to_string() });
        }
        state.entries.insert(key, SearchEntry::new(dn, attributes));
        state.added.push(dn.to_string());
        Ok(())
    }

    async fn modify_attribute(
        &self,
        dn: &str,
        operation: ModifyOperation,
        attribute: &str,
        values: Vec<Vec<u8>>,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.write().await;
        Self::check_writable(&state, "modify", dn)?;

        let entry = state
            .entries
            .get_mut(&normalize_dn(dn))
            .ok_or_else(|| DirectoryError::NoSuchObject { dn: dn.to_string() })?;

        match operation {
            ModifyOperation::Add => {
                if values.is_empty() {
                    return Err(DirectoryError::from_result(
                        "modify",
                        dn,
                        RC_UNWILLING_TO_PERFORM,
                        format!("no values to add to {}", attribute),
                    ));
                }
                let key = attribute_key(entry, attribute);
                let current = entry.attributes.entry(key).or_default();
                if let Some(duplicate) = values.iter().find(|v| current.contains(v)) {
                    return Err(DirectoryError::from_result(
                        "modify",
                        dn,
                        RC_ATTRIBUTE_OR_VALUE_EXISTS,
                        format!(
                            "{}: value #0 provided more than once: {}",
                            attribute,
                            String::from_utf8_lossy(duplicate)
                        ),
                    ));
                }
                current.extend(values.iter().cloned());
            }
            ModifyOperation::Replace => {
                if values.is_empty() {
                    remove_attribute(entry, attribute);
                } else {
                    let key = attribute_key(entry, attribute);
                    entry.attributes.insert(key, values.clone());
                }
            }
            ModifyOperation::Delete => {
                let missing = || {
                    DirectoryError::from_result(
                        "modify",
                        dn,
                        RC_NO_SUCH_ATTRIBUTE,
                        format!("{}: no such value", attribute),
                    )
                };
                if values.is_empty() {
                    if !remove_attribute(entry, attribute) {
                        return Err(missing());
                    }
                } else {
                    let current = attribute_mut(entry, attribute).ok_or_else(missing)?;
                    if values.iter().any(|v| !current.contains(v)) {
                        return Err(missing());
                    }
                    current.retain(|v| !values.contains(v));
                    if current.is_empty() {
                        remove_attribute(entry, attribute);
                    }
                }
            }
        }

        state.modifications.push(Modification {
            dn: dn.to_string(),
            operation,
            attribute: attribute.to_string(),
            values,
        });
        Ok(())
    }
}
