//! cfn-stack - Typed CloudFormation template builder
//!
//! This library declares parameters, outputs and resources of a
//! CloudFormation template, checks that every reference resolves, serializes
//! the result to provider JSON and submits it to a provisioning engine.
//!
//! # Example
//!
//! ```rust
//! use cfn_stack::{expand, TemplateSource};
//!
//! let json = expand(&TemplateSource::Builtin("gocd-ecs".to_string()), true).unwrap();
//! assert!(json.contains("AWS::ECS::Cluster"));
//! ```

pub mod catalog;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod lint;
pub mod resources;
pub mod stacks;
pub mod template;

use std::path::PathBuf;

use thiserror::Error;

pub use catalog::{ActionCatalog, CatalogError};
pub use config::{ConfigError, StackConfig};
pub use engine::{
    submit, AwsCliEngine, ProvisioningEngine, StackRequest, Submission, SubmitError, SubmitMode,
};
pub use error::{EntityKind, TemplateError};
pub use lint::{LintCategory, LintWarning};
pub use template::{Expr, Output, Parameter, Resource, Template, TemplateBuilder};

/// Errors that can occur anywhere between loading a template and submitting it
#[derive(Debug, Error)]
pub enum StackError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("{0}")]
    Submit(#[from] SubmitError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Catalog(#[from] CatalogError),

    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown built-in template '{name}' (available: {})", .available.join(", "))]
    UnknownTemplate {
        name: String,
        available: Vec<String>,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{count} lint warning(s)")]
    LintFailed { count: usize },
}

/// Where a template comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// One of the templates in [`stacks`]
    Builtin(String),
    /// A CloudFormation JSON document on disk
    File(PathBuf),
}

/// Load and finalize a template
pub fn load_template(source: &TemplateSource) -> Result<Template, StackError> {
    match source {
        TemplateSource::Builtin(name) => match stacks::builtin(name) {
            Some(template) => Ok(template?),
            None => Err(StackError::UnknownTemplate {
                name: name.clone(),
                available: stacks::names().map(String::from).collect(),
            }),
        },
        TemplateSource::File(path) => {
            let content = std::fs::read_to_string(path).map_err(|source| StackError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(Template::from_json(&content)?)
        }
    }
}

/// Load a template and serialize it to provider JSON
pub fn expand(source: &TemplateSource, pretty: bool) -> Result<String, StackError> {
    let template = load_template(source)?;
    Ok(template.to_provider_json(pretty)?)
}

/// Changes between another template body and the provider JSON of `template`
///
/// `deployed` may also be a JSON string holding the body, as the provider
/// returns it for stacks created from text.
pub fn diff_against(template: &Template, deployed: &str) -> Result<Vec<diff::Change>, StackError> {
    let deployed = match serde_json::from_str::<serde_json::Value>(deployed)? {
        serde_json::Value::String(body) => serde_json::from_str::<serde_json::Value>(&body)?,
        value => value,
    };
    Ok(diff::diff(&deployed, &template.to_provider_value()?))
}
