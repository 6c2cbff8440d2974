//! Provisioning engine backed by the `aws cloudformation` CLI

use std::path::PathBuf;
use std::process::Command;

use serde_json::{json, Value};
use tracing::debug;

use super::{
    ParameterSource, ProvisioningEngine, StackOperation, StackRequest, SubmitError,
};
use crate::config::StackConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct AwsCliEngine {
    pub program: PathBuf,
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Return the command line instead of running it
    pub dry_run: bool,
}

impl AwsCliEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            region: None,
            profile: None,
            dry_run: false,
        }
    }

    pub fn from_config(config: &StackConfig) -> Self {
        Self {
            program: config.aws_cli.clone(),
            region: config.region.clone(),
            profile: config.profile.clone(),
            dry_run: false,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Arguments after the program name for `operation`
    fn args(&self, operation: StackOperation) -> Vec<String> {
        let mut args = vec!["cloudformation".to_string(), operation.to_string()];
        if let Some(region) = &self.region {
            args.extend(["--region".to_string(), region.clone()]);
        }
        if let Some(profile) = &self.profile {
            args.extend(["--profile".to_string(), profile.clone()]);
        }
        args
    }

    fn stack_args(&self, operation: StackOperation, request: &StackRequest) -> Vec<String> {
        let mut args = self.args(operation);
        args.extend([
            "--stack-name".to_string(),
            request.stack_name.clone(),
            "--template-body".to_string(),
            request.template_body.clone(),
        ]);

        if !request.parameters.is_empty() {
            let parameters: Vec<Value> = request
                .parameters
                .iter()
                .map(|p| match &p.source {
                    ParameterSource::Value(value) => {
                        json!({"ParameterKey": p.key, "ParameterValue": value})
                    }
                    ParameterSource::UsePrevious => {
                        json!({"ParameterKey": p.key, "UsePreviousValue": true})
                    }
                })
                .collect();
            args.extend(["--parameters".to_string(), Value::from(parameters).to_string()]);
        }

        if !request.capabilities.is_empty() {
            args.push("--capabilities".to_string());
            args.extend(request.capabilities.iter().cloned());
        }

        if !request.tags.is_empty() {
            let tags: Vec<Value> = request
                .tags
                .iter()
                .map(|(key, value)| json!({"Key": key, "Value": value}))
                .collect();
            args.extend(["--tags".to_string(), Value::from(tags).to_string()]);
        }

        if operation == StackOperation::Create && request.disable_rollback {
            args.push("--disable-rollback".to_string());
        }
        args
    }

    fn run(&self, operation: StackOperation, args: Vec<String>) -> Result<String, SubmitError> {
        if self.dry_run {
            let mut argv = vec![self.program.display().to_string()];
            argv.extend(args);
            return Ok(shell_words::join(argv));
        }

        let program = which::which(&self.program).map_err(|source| SubmitError::EngineNotFound {
            program: self.program.clone(),
            source,
        })?;
        debug!(program = %program.display(), %operation, "invoking provisioning engine");

        let output = Command::new(&program).args(&args).output()?;
        if !output.status.success() {
            return Err(SubmitError::Rejected {
                operation,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

impl ProvisioningEngine for AwsCliEngine {
    fn create_stack(&self, request: &StackRequest) -> Result<String, SubmitError> {
        let operation = StackOperation::Create;
        self.run(operation, self.stack_args(operation, request))
    }

    fn update_stack(&self, request: &StackRequest) -> Result<String, SubmitError> {
        let operation = StackOperation::Update;
        self.run(operation, self.stack_args(operation, request))
    }

    fn delete_stack(&self, stack_name: &str) -> Result<String, SubmitError> {
        let operation = StackOperation::Delete;
        let mut args = self.args(operation);
        args.extend(["--stack-name".to_string(), stack_name.to_string()]);
        self.run(operation, args)
    }

    fn validate_template(&self, template_body: &str) -> Result<String, SubmitError> {
        let operation = StackOperation::Validate;
        let mut args = self.args(operation);
        args.extend(["--template-body".to_string(), template_body.to_string()]);
        self.run(operation, args)
    }

    fn fetch_template(&self, stack_name: &str) -> Result<String, SubmitError> {
        let operation = StackOperation::FetchTemplate;
        let mut args = self.args(operation);
        args.extend(
            ["--stack-name", stack_name, "--query", "TemplateBody", "--output", "json"]
                .map(String::from),
        );
        self.run(operation, args)
    }
}
