//! Configuration for tabula.
//!
//! Looks for `.config/tabula.styx` in the current directory or any parent
//! directory. The file describes which connection each module's entities
//! live on, which modules are force-included, and how to reach every
//! connection.
//!
//! ```text
//! module_connections {
//!     billing reporting
//! }
//! include_modules (vendored_reports)
//! connections {
//!     default { vendor postgresql, url "postgres://localhost/app" }
//!     reporting { vendor mssql, default_schema sales }
//! }
//! ```

use facet::Facet;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Path marker used when `exclude_path` is not set.
pub const DEFAULT_EXCLUDE_PATH: &str = "site-packages";

/// Connection alias used for modules without an explicit mapping.
pub const DEFAULT_ALIAS: &str = "default";

/// Top-level configuration value.
#[derive(Debug, Clone, Default, Facet)]
pub struct Config {
    /// Module label -> connection alias.
    #[facet(default)]
    pub module_connections: IndexMap<String, String>,

    /// Module labels that are reconciled even when they live under the
    /// excluded path.
    #[facet(default)]
    pub include_modules: Vec<String>,

    /// Substring of a module path that marks vendored code.
    #[facet(default)]
    pub exclude_path: Option<String>,

    /// Connection alias -> settings.
    #[facet(default)]
    pub connections: IndexMap<String, ConnectionSettings>,

    /// Reconcile distinct connections on separate threads.
    #[facet(default)]
    pub parallel: Option<bool>,
}

/// Settings for one connection alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Facet)]
pub struct ConnectionSettings {
    /// Vendor identifier, e.g. `postgresql`, `mssql`, `sqlite`.
    pub vendor: String,

    /// Overrides the vendor's conventional default schema.
    #[facet(default)]
    pub default_schema: Option<String>,

    /// Connection string, consumed by the connection source.
    #[facet(default)]
    pub url: Option<String>,
}

impl ConnectionSettings {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            default_schema: None,
            url: None,
        }
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Digest of the settings that shape a vendor handler.
    ///
    /// The URL is not part of the digest, so aliases that differ only in
    /// where they connect share a handler.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.vendor.to_ascii_lowercase().as_bytes());
        hasher.update(&[0]);
        if let Some(schema) = &self.default_schema {
            hasher.update(schema.as_bytes());
        }
        hasher.finalize()
    }
}

impl Config {
    /// The path marker for vendored modules.
    pub fn exclude_path(&self) -> &str {
        self.exclude_path.as_deref().unwrap_or(DEFAULT_EXCLUDE_PATH)
    }

    pub fn parallel(&self) -> bool {
        self.parallel.unwrap_or(false)
    }

    /// Connection alias for a module label, falling back to [`DEFAULT_ALIAS`].
    pub fn alias_for(&self, module_label: &str) -> &str {
        self.module_connections
            .get(module_label)
            .map(String::as_str)
            .unwrap_or(DEFAULT_ALIAS)
    }

    pub fn is_included(&self, module_label: &str) -> bool {
        self.include_modules.iter().any(|m| m == module_label)
    }

    /// Check that every mapped alias has connection settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (module, alias) in &self.module_connections {
            if !self.connections.contains_key(alias) {
                return Err(ConfigError::Invalid(format!(
                    "module '{module}' is mapped to connection '{alias}', which has no settings"
                )));
            }
        }
        for (alias, settings) in &self.connections {
            if settings.vendor.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "connection '{alias}' has an empty vendor"
                )));
            }
        }
        Ok(())
    }
}

/// Parse and validate configuration from styx source.
pub fn from_str(source: &str) -> Result<Config, ConfigError> {
    let config: Config =
        facet_styx::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `.config/tabula.styx`, searching up the directory tree.
pub fn load() -> Result<(Config, PathBuf), ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Path) -> Result<(Config, PathBuf), ConfigError> {
    let config_path = find_config_file(start)?;
    let content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io(e.to_string()))?;

    let config = from_str(&content)?;

    Ok((config, config_path))
}

/// Find `.config/tabula.styx` by searching up the directory tree.
fn find_config_file(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".config/tabula.styx");
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no .config/tabula.styx found in current directory or any parent")]
    NotFound,

    #[error("failed to read .config/tabula.styx: {0}")]
    Io(String),

    #[error("failed to parse .config/tabula.styx: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
