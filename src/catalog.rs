//! IAM action catalog for checking policy action strings
//!
//! Policy actions are free-form `service:Action` strings that only the
//! provider validates. The catalog lets lint catch typos locally. Matching is
//! case-insensitive, as IAM itself is, and `*` wildcards are honoured.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read action catalog file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse action catalog TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Known actions, keyed by lowercase service prefix
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    /// Optional name for the catalog
    pub name: Option<String>,
    services: HashMap<String, HashSet<String>>,
}

/// How an action string relates to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Known,
    /// Not of the form `service:Action`
    Malformed,
    UnknownService { service: String },
    UnknownAction { service: String },
}

#[derive(Deserialize)]
struct TomlCatalog {
    metadata: Option<TomlMetadata>,
    services: HashMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
}

/// Actions used by the built-in stacks plus the common read-only calls
const DEFAULT_CATALOG: &str = r#"
[metadata]
name = "default"

[services]
ec2 = [
    "AttachVolume", "CreateTags", "CreateVolume", "DeleteTags", "DescribeImages",
    "DescribeInstances", "DescribeSpotInstanceRequests", "DescribeSubnets",
    "DescribeVolumes", "RequestSpotInstances", "RunInstances", "StartInstances",
    "StopInstances", "TerminateInstances",
]
ecs = [
    "CreateCluster", "DeleteCluster", "DeregisterContainerInstance",
    "DeregisterTaskDefinition", "DescribeClusters", "DescribeContainerInstances",
    "DescribeTaskDefinition", "DescribeTasks", "DiscoverPollEndpoint",
    "ListClusters", "ListContainerInstances", "ListTasks", "Poll",
    "RegisterContainerInstance", "RegisterTaskDefinition", "RunTask", "StartTask",
    "StartTelemetrySession", "StopTask", "SubmitContainerStateChange",
    "SubmitTaskStateChange",
]
iam = ["GetInstanceProfile", "GetRole", "ListRoles", "PassRole"]
logs = ["CreateLogGroup", "CreateLogStream", "DescribeLogStreams", "PutLogEvents"]
sts = ["AssumeRole", "GetCallerIdentity"]
"#;

impl ActionCatalog {
    /// Load a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a catalog from a TOML string
    pub fn from_str(content: &str) -> Result<Self, CatalogError> {
        let parsed: TomlCatalog = toml::from_str(content)?;

        let services = parsed
            .services
            .into_iter()
            .map(|(service, actions)| {
                let actions = actions.iter().map(|a| a.to_ascii_lowercase()).collect();
                (service.to_ascii_lowercase(), actions)
            })
            .collect();

        Ok(ActionCatalog {
            name: parsed.metadata.and_then(|m| m.name),
            services,
        })
    }

    /// Merge another catalog's services into this one
    pub fn extend(&mut self, other: ActionCatalog) {
        for (service, actions) in other.services {
            self.services.entry(service).or_default().extend(actions);
        }
    }

    pub fn contains_service(&self, service: &str) -> bool {
        self.services.contains_key(&service.to_ascii_lowercase())
    }

    /// Classify an action string
    pub fn lookup(&self, action: &str) -> ActionStatus {
        if action == "*" {
            return ActionStatus::Known;
        }

        let Some((service, name)) = action.split_once(':') else {
            return ActionStatus::Malformed;
        };
        if !is_action_token(service) || !is_action_token(name) || service.contains('*') {
            return ActionStatus::Malformed;
        }

        let Some(actions) = self.services.get(&service.to_ascii_lowercase()) else {
            return ActionStatus::UnknownService {
                service: service.to_string(),
            };
        };

        let pattern = name.to_ascii_lowercase();
        let known = if pattern.contains('*') || pattern.contains('?') {
            actions.iter().any(|candidate| wildcard_match(&pattern, candidate))
        } else {
            actions.contains(&pattern)
        };

        if known {
            ActionStatus::Known
        } else {
            ActionStatus::UnknownAction {
                service: service.to_string(),
            }
        }
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::from_str(DEFAULT_CATALOG).expect("Default catalog should be valid TOML")
    }
}

fn is_action_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '*' | '?'))
}

/// Match `*` (any run) and `?` (one character) wildcards
fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    let (mut p, mut c) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == candidate[c]) {
            p += 1;
            c += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, c));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            c = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&ch| ch == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_covers_builtin_stack() {
        let catalog = ActionCatalog::default();
        for action in crate::stacks::gocd_ecs::EC2_INSTANCE_ACTIONS
            .iter()
            .chain(crate::stacks::gocd_ecs::ECS_INSTANCE_ACTIONS)
            .chain(crate::stacks::gocd_ecs::ECS_AGENT_ACTIONS)
        {
            assert_eq!(catalog.lookup(action), ActionStatus::Known, "{}", action);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = ActionCatalog::default();
        assert_eq!(catalog.lookup("EC2:RunInstances"), ActionStatus::Known);
        assert_eq!(catalog.lookup("ec2:runinstances"), ActionStatus::Known);
    }

    #[test]
    fn test_unknown_action_and_service() {
        let catalog = ActionCatalog::default();
        assert_eq!(
            catalog.lookup("ec2:runInstance"),
            ActionStatus::UnknownAction {
                service: "ec2".to_string()
            }
        );
        assert_eq!(
            catalog.lookup("dynamodb:GetItem"),
            ActionStatus::UnknownService {
                service: "dynamodb".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_actions() {
        let catalog = ActionCatalog::default();
        assert_eq!(catalog.lookup("RunInstances"), ActionStatus::Malformed);
        assert_eq!(catalog.lookup("ec2:"), ActionStatus::Malformed);
        assert_eq!(catalog.lookup("ec2:run instances"), ActionStatus::Malformed);
    }

    #[test]
    fn test_wildcards() {
        let catalog = ActionCatalog::default();
        assert_eq!(catalog.lookup("*"), ActionStatus::Known);
        assert_eq!(catalog.lookup("ec2:Describe*"), ActionStatus::Known);
        assert_eq!(catalog.lookup("ecs:*"), ActionStatus::Known);
        assert!(matches!(
            catalog.lookup("ec2:Frobnicate*"),
            ActionStatus::UnknownAction { .. }
        ));
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("describe*", "describeinstances"));
        assert!(wildcard_match("*instances", "runinstances"));
        assert!(wildcard_match("s?op*", "stopinstances"));
        assert!(!wildcard_match("describe*", "runinstances"));
    }

    #[test]
    fn test_parse_and_extend() {
        let extra = ActionCatalog::from_str(
            r#"
[services]
dynamodb = ["GetItem"]
"#,
        )
        .expect("Should parse");
        assert_eq!(extra.name, None);

        let mut catalog = ActionCatalog::default();
        catalog.extend(extra);
        assert!(catalog.contains_service("DynamoDB"));
        assert_eq!(catalog.lookup("dynamodb:getItem"), ActionStatus::Known);
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = ActionCatalog::from_str("this is not valid toml {{{{");
        assert!(matches!(result, Err(CatalogError::ParseError(_))));
    }
}
