//! Stack configuration loaded from TOML
//!
//! ```toml
//! stack_name = "gocd-ecs"
//! region = "eu-west-1"
//! disable_rollback = true
//!
//! [parameters]
//! ClusterName = "GoCD"
//!
//! [tags]
//! team = "ci"
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a stack configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Default name of the provider CLI binary
pub const DEFAULT_AWS_CLI: &str = "aws";

/// Where and how to deploy a template
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    pub stack_name: Option<String>,
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Provider CLI to invoke; resolved on `PATH` when not absolute
    pub aws_cli: PathBuf,
    pub disable_rollback: bool,
    /// Capabilities acknowledged in addition to the ones inferred from the template
    pub capabilities: Vec<String>,
    /// Parameter overrides, in declaration order
    pub parameters: IndexMap<String, String>,
    pub tags: IndexMap<String, String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: None,
            region: None,
            profile: None,
            aws_cli: PathBuf::from(DEFAULT_AWS_CLI),
            disable_rollback: false,
            capabilities: Vec::new(),
            parameters: IndexMap::new(),
            tags: IndexMap::new(),
        }
    }
}

impl StackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_stack_name(mut self, name: impl Into<String>) -> Self {
        self.stack_name = Some(name.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_aws_cli(mut self, program: impl Into<PathBuf>) -> Self {
        self.aws_cli = program.into();
        self
    }

    pub fn with_disable_rollback(mut self, disable: bool) -> Self {
        self.disable_rollback = disable;
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Override a parameter; later overrides of the same key win
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Split a `Key=Value` override
pub fn parse_key_value(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", pair)),
    }
}
