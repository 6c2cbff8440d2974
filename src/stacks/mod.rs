//! Built-in stack templates

pub mod gocd_ecs;

use crate::error::TemplateError;
use crate::template::Template;

type StackFn = fn() -> Result<Template, TemplateError>;

const BUILTIN: &[(&str, StackFn)] = &[(gocd_ecs::NAME, gocd_ecs::template)];

/// Build a built-in template by name
pub fn builtin(name: &str) -> Option<Result<Template, TemplateError>> {
    BUILTIN
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, build)| build())
}

/// Names of all built-in templates
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}
