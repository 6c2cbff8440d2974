//! Lint engine for detecting template defects the provider would only report
//! at submission time.
//!
//! Runs on a finalized template: policy statements without a valid effect,
//! action strings missing from the action catalog, malformed resource type
//! tags, parameters nothing refers to, and `Fn::GetAtt` on a parameter.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::catalog::{ActionCatalog, ActionStatus};
use crate::template::{Expr, Reference, Template};

/// A lint warning about a template defect
#[derive(Debug)]
pub struct LintWarning {
    pub category: LintCategory,
    pub message: String,
}

/// Category of lint defect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintCategory {
    Policy,
    Action,
    ResourceType,
    Parameter,
    Reference,
}

impl fmt::Display for LintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintCategory::Policy => write!(f, "policy"),
            LintCategory::Action => write!(f, "action"),
            LintCategory::ResourceType => write!(f, "resource-type"),
            LintCategory::Parameter => write!(f, "parameter"),
            LintCategory::Reference => write!(f, "reference"),
        }
    }
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Run all lint checks on a finalized template.
pub fn check(template: &Template, catalog: &ActionCatalog) -> Vec<LintWarning> {
    let mut warnings = Vec::new();
    check_resource_types(template, &mut warnings);
    check_policies(template, catalog, &mut warnings);
    check_unused_parameters(template, &mut warnings);
    check_attribute_targets(template, &mut warnings);
    warnings
}

// ── Resource types ────────────────────────────────────────────────

fn check_resource_types(template: &Template, warnings: &mut Vec<LintWarning>) {
    for (name, resource) in template.resources() {
        if !is_valid_type_tag(&resource.type_tag) {
            warnings.push(LintWarning {
                category: LintCategory::ResourceType,
                message: format!(
                    "resource \"{}\" has malformed type \"{}\" (expected Vendor::Service::Resource)",
                    name, resource.type_tag
                ),
            });
        }
    }
}

/// `Vendor::Service::Resource`, `Custom::Name`, or a `...::MODULE` type
fn is_valid_type_tag(tag: &str) -> bool {
    let segments: Vec<&str> = tag.split("::").collect();
    let well_formed = segments
        .iter()
        .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()));
    if !well_formed {
        return false;
    }
    match segments.as_slice() {
        ["Custom", _] => true,
        [_, _, _] => true,
        [_, _, _, "MODULE"] => true,
        _ => false,
    }
}

// ── Policies ──────────────────────────────────────────────────────

fn check_policies(template: &Template, catalog: &ActionCatalog, warnings: &mut Vec<LintWarning>) {
    for (name, resource) in template.resources() {
        if !resource.type_tag.starts_with("AWS::IAM::") {
            continue;
        }

        let mut documents: Vec<(String, &Expr)> = Vec::new();
        for key in ["AssumeRolePolicyDocument", "PolicyDocument"] {
            if let Some(document) = resource.properties.get(key) {
                documents.push((key.to_string(), document));
            }
        }
        if let Some(policies) = resource.properties.get("Policies").and_then(Expr::as_list) {
            for (index, policy) in policies.iter().enumerate() {
                let label = policy
                    .get("PolicyName")
                    .and_then(Expr::as_str)
                    .map(|n| format!("policy \"{}\"", n))
                    .unwrap_or_else(|| format!("policy #{}", index + 1));
                match policy.get("PolicyDocument") {
                    Some(document) => documents.push((label, document)),
                    None => warnings.push(LintWarning {
                        category: LintCategory::Policy,
                        message: format!("resource \"{}\" {} has no PolicyDocument", name, label),
                    }),
                }
            }
        }

        for (label, document) in documents {
            check_policy_document(name, &label, document, catalog, warnings);
        }
    }
}

fn check_policy_document(
    resource: &str,
    label: &str,
    document: &Expr,
    catalog: &ActionCatalog,
    warnings: &mut Vec<LintWarning>,
) {
    // A single statement may be written without the surrounding list
    let statements: Vec<&Expr> = match document.get("Statement") {
        Some(Expr::List(items)) => items.iter().collect(),
        Some(single @ Expr::Map(_)) => vec![single],
        _ => {
            warnings.push(LintWarning {
                category: LintCategory::Policy,
                message: format!("resource \"{}\" {} has no statements", resource, label),
            });
            return;
        }
    };

    for (index, statement) in statements.into_iter().enumerate() {
        let location = format!("resource \"{}\" {} statement #{}", resource, label, index + 1);

        match statement.get("Effect").and_then(Expr::as_str) {
            Some("Allow") | Some("Deny") => {}
            Some(other) => warnings.push(LintWarning {
                category: LintCategory::Policy,
                message: format!("{} has invalid effect \"{}\"", location, other),
            }),
            None => warnings.push(LintWarning {
                category: LintCategory::Policy,
                message: format!("{} does not name an effect", location),
            }),
        }

        let actions: Vec<&str> = match statement.get("Action").or_else(|| statement.get("NotAction")) {
            Some(Expr::List(items)) => items.iter().filter_map(Expr::as_str).collect(),
            Some(Expr::String(single)) => vec![single.as_str()],
            _ => {
                warnings.push(LintWarning {
                    category: LintCategory::Policy,
                    message: format!("{} has no actions", location),
                });
                continue;
            }
        };

        for action in actions {
            if let Some(message) = describe_action_status(catalog.lookup(action), action) {
                warnings.push(LintWarning {
                    category: LintCategory::Action,
                    message: format!("{}: {}", location, message),
                });
            }
        }
    }
}

fn describe_action_status(status: ActionStatus, action: &str) -> Option<String> {
    match status {
        ActionStatus::Known => None,
        ActionStatus::Malformed => Some(format!(
            "\"{}\" is not of the form service:Action",
            action
        )),
        ActionStatus::UnknownService { service } => Some(format!(
            "\"{}\" uses service \"{}\" which is not in the action catalog",
            action, service
        )),
        ActionStatus::UnknownAction { service } => Some(format!(
            "\"{}\" is not a known {} action",
            action, service
        )),
    }
}

// ── Parameters and references ─────────────────────────────────────

fn all_references(template: &Template) -> Vec<Reference> {
    let mut references = Vec::new();
    for resource in template.resources().values() {
        for value in resource.properties.values() {
            references.extend(value.references());
        }
        references.extend(resource.attributes.values().flat_map(value_references));
    }
    for output in template.outputs().values() {
        references.extend(output.value.references());
        if let Some(export) = &output.export {
            references.extend(export.name.references());
        }
    }
    references.extend(template.sections().values().flat_map(value_references));
    references
}

/// References inside passed-through JSON such as `Conditions`
fn value_references(value: &Value) -> Vec<Reference> {
    Expr::try_from(value.clone())
        .map(|expr| expr.references())
        .unwrap_or_default()
}

fn check_unused_parameters(template: &Template, warnings: &mut Vec<LintWarning>) {
    let used: HashSet<String> = all_references(template)
        .into_iter()
        .map(|r| r.target().to_string())
        .collect();

    for name in template.parameters().keys() {
        if !used.contains(name) {
            warnings.push(LintWarning {
                category: LintCategory::Parameter,
                message: format!("parameter \"{}\" is declared but never referenced", name),
            });
        }
    }
}

fn check_attribute_targets(template: &Template, warnings: &mut Vec<LintWarning>) {
    for reference in all_references(template) {
        if let Reference::GetAtt {
            resource,
            attribute,
        } = reference
        {
            if template.parameter(&resource).is_some() {
                warnings.push(LintWarning {
                    category: LintCategory::Reference,
                    message: format!(
                        "Fn::GetAtt \"{}.{}\" targets a parameter; only resources have attributes",
                        resource, attribute
                    ),
                });
            }
        }
    }
}
