//! Submission of finalized templates to a provisioning engine.
//!
//! The engine itself is external: [`ProvisioningEngine`] is the seam, and
//! [`AwsCliEngine`] drives the `aws cloudformation` CLI. This module turns a
//! [`Template`] plus a [`StackConfig`] into a [`StackRequest`] and hands it
//! over. Provider failures come back verbatim in [`SubmitError::Rejected`].

mod aws_cli;

pub use aws_cli::AwsCliEngine;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::StackConfig;
use crate::template::Template;

/// Capability acknowledging that a template creates IAM resources
pub const CAPABILITY_IAM: &str = "CAPABILITY_IAM";

/// Errors raised while submitting a template
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("provisioning engine '{}' not found: {source}", .program.display())]
    EngineNotFound {
        program: PathBuf,
        #[source]
        source: which::Error,
    },

    #[error("failed to run provisioning engine: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{operation} rejected{}: {}", format_status(.status), .stderr.trim_end())]
    Rejected {
        operation: StackOperation,
        status: Option<i32>,
        stderr: String,
    },

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("parameter override '{name}' does not name a declared parameter")]
    UnknownParameter { name: String },

    #[error("no stack name given")]
    MissingStackName,
}

fn format_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" (exit status {})", code),
        None => " (terminated by signal)".to_string(),
    }
}

/// A call made across the engine boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOperation {
    Create,
    Update,
    Delete,
    Validate,
    FetchTemplate,
}

impl StackOperation {
    /// The provider's name for the call
    pub fn as_str(&self) -> &'static str {
        match self {
            StackOperation::Create => "create-stack",
            StackOperation::Update => "update-stack",
            StackOperation::Delete => "delete-stack",
            StackOperation::Validate => "validate-template",
            StackOperation::FetchTemplate => "get-template",
        }
    }
}

impl fmt::Display for StackOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a submission creates a new stack or updates an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Create,
    Update,
}

impl SubmitMode {
    pub fn operation(&self) -> StackOperation {
        match self {
            SubmitMode::Create => StackOperation::Create,
            SubmitMode::Update => StackOperation::Update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSource {
    Value(String),
    /// Keep the value the deployed stack already has
    UsePrevious,
}

/// A parameter value sent with a create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterValue {
    pub key: String,
    pub source: ParameterSource,
}

/// Everything an engine needs to create or update a stack
#[derive(Debug, Clone, PartialEq)]
pub struct StackRequest {
    pub stack_name: String,
    /// Provider JSON of the template
    pub template_body: String,
    pub parameters: Vec<ParameterValue>,
    pub capabilities: Vec<String>,
    pub tags: Vec<(String, String)>,
    /// Only meaningful on create
    pub disable_rollback: bool,
}

/// What the engine reported back
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub operation: StackOperation,
    pub stack_name: String,
    /// Engine stdout, typically the stack id
    pub output: String,
}

/// The external provisioning engine.
///
/// Implementations perform blocking calls and surface provider failures as
/// [`SubmitError::Rejected`] without interpreting them.
pub trait ProvisioningEngine {
    fn create_stack(&self, request: &StackRequest) -> Result<String, SubmitError>;

    fn update_stack(&self, request: &StackRequest) -> Result<String, SubmitError>;

    fn delete_stack(&self, stack_name: &str) -> Result<String, SubmitError>;

    /// Ask the provider to validate a template body
    fn validate_template(&self, template_body: &str) -> Result<String, SubmitError>;

    /// Fetch the template body of a deployed stack as JSON text
    fn fetch_template(&self, stack_name: &str) -> Result<String, SubmitError>;
}

/// Resolve the stack name, or fail with [`SubmitError::MissingStackName`]
pub fn stack_name(config: &StackConfig) -> Result<&str, SubmitError> {
    config
        .stack_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or(SubmitError::MissingStackName)
}

/// Assemble the request for creating or updating a stack from `template`.
///
/// Overrides in `config.parameters` must name declared parameters. On update,
/// parameters marked `UsePreviousValue` without an override keep their
/// deployed value. `CAPABILITY_IAM` is added when the template declares IAM
/// resources.
pub fn stack_request(
    template: &Template,
    config: &StackConfig,
    mode: SubmitMode,
) -> Result<StackRequest, SubmitError> {
    let stack_name = stack_name(config)?.to_string();

    if let Some(name) = config
        .parameters
        .keys()
        .find(|name| template.parameter(name).is_none())
    {
        return Err(SubmitError::UnknownParameter { name: name.clone() });
    }

    let mut parameters = Vec::new();
    for (key, parameter) in template.parameters() {
        let source = match config.parameters.get(key) {
            Some(value) => ParameterSource::Value(value.clone()),
            None if mode == SubmitMode::Update && parameter.use_previous_value => {
                ParameterSource::UsePrevious
            }
            None => continue,
        };
        parameters.push(ParameterValue {
            key: key.clone(),
            source,
        });
    }

    let mut capabilities = config.capabilities.clone();
    if template.requires_iam_capability() && !capabilities.iter().any(|c| c == CAPABILITY_IAM) {
        capabilities.push(CAPABILITY_IAM.to_string());
    }

    Ok(StackRequest {
        stack_name,
        template_body: template.to_provider_json(false)?,
        parameters,
        capabilities,
        tags: config
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        disable_rollback: config.disable_rollback,
    })
}

/// Submit a finalized template to the engine
pub fn submit(
    template: &Template,
    engine: &dyn ProvisioningEngine,
    config: &StackConfig,
    mode: SubmitMode,
) -> Result<Submission, SubmitError> {
    let request = stack_request(template, config, mode)?;
    let operation = mode.operation();
    info!(
        stack = %request.stack_name,
        %operation,
        resources = template.resources().len(),
        capabilities = ?request.capabilities,
        "submitting template"
    );

    let output = match mode {
        SubmitMode::Create => engine.create_stack(&request)?,
        SubmitMode::Update => engine.update_stack(&request)?,
    };

    Ok(Submission {
        operation,
        stack_name: request.stack_name,
        output,
    })
}

/// Delete the configured stack
pub fn delete(
    engine: &dyn ProvisioningEngine,
    config: &StackConfig,
) -> Result<Submission, SubmitError> {
    let stack_name = stack_name(config)?.to_string();
    info!(stack = %stack_name, "deleting stack");
    let output = engine.delete_stack(&stack_name)?;
    Ok(Submission {
        operation: StackOperation::Delete,
        stack_name,
        output,
    })
}
