//! Live LDAP backend built on `ldap3`.
//!
//! Connects once, binds, and then serves the engine's requests one at a time
//! over the same connection. `ldapi://` URIs with an empty bind DN use SASL
//! EXTERNAL, which is how a local root process normally reaches `cn=config`;
//! everything else uses a simple bind.

use super::errors::DirectoryError;
use super::{AttributeMap, DirectoryService, Filter, ModifyOperation, SearchEntry, SearchScope};
use ldap3::{Ldap, LdapConnAsync, LdapError, Mod, Scope};
use log::{debug, info};
use std::collections::HashSet;

/// A bound connection to an LDAP server.
#[derive(Clone)]
pub struct LdapDirectory {
    uri: String,
    ldap: Ldap,
}

impl LdapDirectory {
    /// Connect to `uri` and authenticate.
    ///
    /// # Errors
    /// [`DirectoryError::Connection`] when the server cannot be reached and
    /// [`DirectoryError::Bind`] when authentication is rejected.
    pub async fn connect(
        uri: &str,
        bind_dn: &str,
        bind_password: &str,
    ) -> Result<Self, DirectoryError> {
        debug!("Connecting to {}", uri);
        let (conn, mut ldap) =
            LdapConnAsync::new(uri)
                .await
                .map_err(|e| DirectoryError::Connection {
                    message: format!("{}: {}", uri, e),
                })?;
        ldap3::drive!(conn);

        let bind_failed = |e: LdapError| DirectoryError::Bind {
            uri: uri.to_string(),
            message: e.to_string(),
        };
        if bind_dn.is_empty() && uri.starts_with("ldapi://") {
            debug!("Binding with SASL EXTERNAL");
            ldap.sasl_external_bind()
                .await
                .and_then(|res| res.success())
                .map_err(bind_failed)?;
        } else {
            debug!("Simple bind as '{}'", bind_dn);
            ldap.simple_bind(bind_dn, bind_password)
                .await
                .and_then(|res| res.success())
                .map_err(bind_failed)?;
        }
        info!("Bound to {}", uri);

        Ok(Self {
            uri: uri.to_string(),
            ldap,
        })
    }

    /// The URI this connection was opened against.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Unbind and drop the connection.
    pub async fn unbind(mut self) -> Result<(), DirectoryError> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| DirectoryError::Connection {
                message: e.to_string(),
            })
    }
}

fn map_error(operation: &str, dn: &str, error: LdapError) -> DirectoryError {
    match error {
        LdapError::LdapResult { result } => {
            DirectoryError::from_result(operation, dn, result.rc, result.text)
        }
        other => DirectoryError::Connection {
            message: format!("{} {}: {}", operation, dn, other),
        },
    }
}

fn to_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

impl DirectoryService for LdapDirectory {
    async fn search(
        &self,
        base_dn: &str,
        scope: SearchScope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let mut ldap = self.ldap.clone();
        let filter = filter.to_string();
        debug!("search base={} scope={:?} filter={}", base_dn, scope, filter);

        let (entries, _) = ldap
            .search(base_dn, to_scope(scope), &filter, attributes.to_vec())
            .await
            .and_then(|res| res.success())
            .map_err(|e| map_error("search", base_dn, e))?;

        Ok(entries
            .into_iter()
            .map(|raw| {
                let entry = ldap3::SearchEntry::construct(raw);
                let mut attrs: AttributeMap = entry
                    .attrs
                    .into_iter()
                    .map(|(name, values)| {
                        (name, values.into_iter().map(String::into_bytes).collect())
                    })
                    .collect();
                for (name, values) in entry.bin_attrs {
                    attrs.entry(name).or_default().extend(values);
                }
                SearchEntry::new(entry.dn, attrs)
            })
            .collect())
    }

    async fn add_entry(&self, dn: &str, attributes: AttributeMap) -> Result<(), DirectoryError> {
        let mut ldap = self.ldap.clone();
        debug!("add {}", dn);

        let attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = attributes
            .into_iter()
            .map(|(name, values)| (name.into_bytes(), values.into_iter().collect()))
            .collect();

        ldap.add(dn, attrs)
            .await
            .and_then(|res| res.success())
            .map(|_| ())
            .map_err(|e| map_error("add", dn, e))
    }

    async fn modify_attribute(
        &self,
        dn: &str,
        operation: ModifyOperation,
        attribute: &str,
        values: Vec<Vec<u8>>,
    ) -> Result<(), DirectoryError> {
        let mut ldap = self.ldap.clone();
        debug!("modify {} {} {} ({} values)", dn, operation, attribute, values.len());

        let name = attribute.as_bytes().to_vec();
        let values: HashSet<Vec<u8>> = values.into_iter().collect();
        let modification = match operation {
            ModifyOperation::Add => Mod::Add(name, values),
            ModifyOperation::Replace => Mod::Replace(name, values),
            ModifyOperation::Delete => Mod::Delete(name, values),
        };

        ldap.modify(dn, vec![modification])
            .await
            .and_then(|res| res.success())
            .map(|_| ())
            .map_err(|e| map_error("modify", dn, e))
    }
}
