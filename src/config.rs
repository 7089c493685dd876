//! Run configuration.
//!
//! Everything a synchronization run needs to know is carried in a
//! [`SyncConfig`] value handed to the engine; there is no global state.
//!
//! ```rust
//! use ldap_schema_sync::SyncConfig;
//!
//! let config = SyncConfig::builder("nextcloud")
//!     .with_server_uri("ldap://ldap.example.org")
//!     .with_bind("cn=admin,cn=config", "secret")
//!     .dry_run(true)
//!     .build()
//!     .expect("valid configuration");
//! assert_eq!(config.base_dn, "cn=schema,cn=config");
//! ```

use thiserror::Error;

/// Default server URI: the local ldapi socket.
pub const DEFAULT_SERVER_URI: &str = "ldapi:///";

/// Where OpenLDAP keeps schema container entries.
pub const DEFAULT_SCHEMA_BASE_DN: &str = "cn=schema,cn=config";

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("schema name must not be empty")]
    EmptySchemaName,

    #[error("schema name '{name}' contains reserved character '{character}'")]
    ReservedCharacter { name: String, character: char },

    #[error("schema name '{name}' has leading or trailing whitespace")]
    UntrimmedSchemaName { name: String },

    #[error("server URI '{uri}' is not an ldap://, ldaps:// or ldapi:// URI")]
    InvalidServerUri { uri: String },

    #[error("base DN must not be empty")]
    EmptyBaseDn,
}

/// Settings for one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// LDAP server URI
    pub server_uri: String,
    /// Bind DN; empty selects SASL EXTERNAL on ldapi:// or anonymous bind
    pub bind_dn: String,
    /// Bind password
    pub bind_password: String,
    /// Name of the schema snippet, e.g. `nextcloud`
    pub schema_name: String,
    /// Parent of the schema container entries
    pub base_dn: String,
    /// Compute outcomes without writing to the directory
    pub dry_run: bool,
}

impl SyncConfig {
    /// Start building a configuration for the named schema snippet.
    pub fn builder(schema_name: impl Into<String>) -> SyncConfigBuilder {
        SyncConfigBuilder::new(schema_name)
    }

    /// Check the configuration for values the directory would reject.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.schema_name;
        if name.is_empty() {
            return Err(ConfigError::EmptySchemaName);
        }
        if name.trim() != name {
            return Err(ConfigError::UntrimmedSchemaName { name: name.clone() });
        }
        // Characters that would break the `cn={n}name` RDN or its parsing.
        if let Some(character) = name.chars().find(|c| matches!(c, ',' | '=' | '+' | '{' | '}')) {
            return Err(ConfigError::ReservedCharacter {
                name: name.clone(),
                character,
            });
        }

        let uri = self.server_uri.to_ascii_lowercase();
        if !["ldap://", "ldaps://", "ldapi://"]
            .iter()
            .any(|scheme| uri.starts_with(scheme))
        {
            return Err(ConfigError::InvalidServerUri {
                uri: self.server_uri.clone(),
            });
        }

        if self.base_dn.trim().is_empty() {
            return Err(ConfigError::EmptyBaseDn);
        }
        Ok(())
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    fn new(schema_name: impl Into<String>) -> Self {
        Self {
            config: SyncConfig {
                server_uri: DEFAULT_SERVER_URI.to_string(),
                bind_dn: String::new(),
                bind_password: String::new(),
                schema_name: schema_name.into(),
                base_dn: DEFAULT_SCHEMA_BASE_DN.to_string(),
                dry_run: false,
            },
        }
    }

    pub fn with_server_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.server_uri = uri.into();
        self
    }

    pub fn with_bind(mut self, dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.bind_dn = dn.into();
        self.config.bind_password = password.into();
        self
    }

    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.config.base_dn = base_dn.into();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
