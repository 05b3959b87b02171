//! Configuration file parsing.
//!
//! Reads pg-schema-diff.toml configuration files: the default schema for
//! statement rendering, output options, and an optional user-supplied
//! extension-template catalog that replaces the built-ins.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extend::templates::{
    ColumnTemplate, ExtensionCatalog, ExtensionDef, FunctionTemplate, TriggerTemplate,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Extension templates. When any extension is defined here, the whole
    /// user catalog replaces the built-ins.
    #[serde(default)]
    pub extensions: BTreeMap<String, ExtensionDef>,

    #[serde(default)]
    pub extension_columns: BTreeMap<String, ColumnTemplate>,

    #[serde(default)]
    pub extension_triggers: BTreeMap<String, TriggerTemplate>,

    #[serde(default)]
    pub extension_functions: BTreeMap<String, FunctionTemplate>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaConfig {
    /// Objects in this schema render unqualified in emitted statements.
    #[serde(default = "default_schema")]
    pub default: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            default: default_schema(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory for the generated script file.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Write the statement list to `<dir>/schema-sync.sql` in addition to
    /// printing it.
    #[serde(default)]
    pub script: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            script: false,
        }
    }
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build/schema-diff")
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// The extension catalog this run works from: the user-supplied
    /// catalog when the config defines one, the built-ins otherwise.
    pub fn extension_catalog(&self) -> ExtensionCatalog {
        if self.extensions.is_empty() {
            return ExtensionCatalog::built_in();
        }
        ExtensionCatalog {
            extensions: self.extensions.clone(),
            columns: self.extension_columns.clone(),
            triggers: self.extension_triggers.clone(),
            functions: self.extension_functions.clone(),
        }
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.default.is_empty() {
            return Err(ConfigError::Validation(
                "schema.default must not be empty".to_string(),
            ));
        }
        self.extension_catalog()
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))
    }
}
