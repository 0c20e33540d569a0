//! SDK configuration file support
//!
//! Handles parsing of `.schema-graph.toml` configuration files and environment variable
//! overrides.

use crate::compiler::{CompileOptions, CreateMode};
use crate::sync::OriginPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".schema-graph.toml";

/// Environment variable overriding the target catalog
pub const ENV_CATALOG: &str = "SCHEMA_GRAPH_CATALOG";

/// Environment variable overriding the target schema
pub const ENV_SCHEMA: &str = "SCHEMA_GRAPH_SCHEMA";

/// Environment variable for the DDL create mode
pub const ENV_CREATE_MODE: &str = "SCHEMA_GRAPH_CREATE_MODE";

/// Environment variable for the foreign key origin policy
pub const ENV_FK_ORIGIN_POLICY: &str = "SCHEMA_GRAPH_FK_ORIGIN_POLICY";

/// Error raised while reading or writing configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid configuration: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Target section: where compiled objects are created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSection {
    /// Catalog overriding the project's catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// Schema overriding the project's schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// DDL generation section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdlSection {
    #[serde(default)]
    pub create_mode: CreateMode,

    /// Emit SET TAGS statements
    #[serde(default = "default_include_tags")]
    pub include_tags: bool,
}

fn default_include_tags() -> bool {
    true
}

impl Default for DdlSection {
    fn default() -> Self {
        Self {
            create_mode: CreateMode::default(),
            include_tags: default_include_tags(),
        }
    }
}

/// Foreign key section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySection {
    #[serde(default)]
    pub origin_policy: OriginPolicy,
}

/// Main configuration structure
///
/// Represents the `.schema-graph.toml` configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub target: TargetSection,

    #[serde(default)]
    pub ddl: DdlSection,

    #[serde(default)]
    pub foreign_keys: ForeignKeySection,
}

impl SdkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a workspace directory
    ///
    /// Looks for `.schema-graph.toml` in the directory and falls back to defaults if it is
    /// missing. Environment overrides are applied either way.
    pub fn load(workspace_path: &Path) -> ConfigResult<Self> {
        let config_path = workspace_path.join(CONFIG_FILENAME);
        let mut config = if config_path.exists() {
            Self::load_file(&config_path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Read a configuration file without applying environment overrides
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a workspace directory
    pub fn save(&self, workspace_path: &Path) -> ConfigResult<()> {
        let config_path = workspace_path.join(CONFIG_FILENAME);
        let content = self.to_toml()?;
        std::fs::write(&config_path, content)
            .map_err(|e| ConfigError::Io(format!("Failed to write config: {}", e)))
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::Serialization(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    ///
    /// Values that do not parse are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(catalog) = lookup(ENV_CATALOG) {
            self.target.catalog = Some(catalog);
        }
        if let Some(schema) = lookup(ENV_SCHEMA) {
            self.target.schema = Some(schema);
        }
        if let Some(mode) = lookup(ENV_CREATE_MODE)
            && let Ok(mode) = mode.parse()
        {
            self.ddl.create_mode = mode;
        }
        if let Some(policy) = lookup(ENV_FK_ORIGIN_POLICY)
            && let Ok(policy) = policy.parse()
        {
            self.foreign_keys.origin_policy = policy;
        }
    }

    /// Compiler options described by this configuration
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            create_mode: self.ddl.create_mode,
            include_tags: self.ddl.include_tags,
            catalog_name: self.target.catalog.clone(),
            schema_name: self.target.schema.clone(),
        }
    }

    pub fn origin_policy(&self) -> OriginPolicy {
        self.foreign_keys.origin_policy
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Schema Graph SDK Configuration

[target]
# Override the catalog and schema stored in the project
# catalog = "main"
# schema = "sales"

[ddl]
# "create", "create_or_replace" (default) or "if_not_exists"
create_mode = "create_or_replace"

# Emit ALTER ... SET TAGS statements for tags and logical names
include_tags = true

[foreign_keys]
# "explicit" (default): trust the origin recorded on each foreign key
# "name_match": treat a foreign key as linked while its name equals the primary key's
origin_policy = "explicit"
"#
}
