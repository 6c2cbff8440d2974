//! Structural diff between two template documents.
//!
//! Compares provider JSON value trees key by key so a local template can be
//! checked against a file or against the body of a deployed stack.

use std::fmt;

use serde_json::Value;

/// What happened at a path
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    Added(Value),
    Removed(Value),
    Modified { before: Value, after: Value },
}

/// A single difference, located by a dotted path such as
/// `Resources.Cluster.Properties.ClusterName`
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub path: String,
    pub kind: ChangeKind,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ChangeKind::Added(value) => write!(f, "+ {}: {}", self.path, value),
            ChangeKind::Removed(value) => write!(f, "- {}: {}", self.path, value),
            ChangeKind::Modified { before, after } => {
                write!(f, "~ {}: {} -> {}", self.path, before, after)
            }
        }
    }
}

/// Compute the changes that turn `before` into `after`.
///
/// Object keys are visited in `after` order, then keys only `before` has.
/// Arrays are compared position by position.
pub fn diff(before: &Value, after: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_at(String::new(), before, after, &mut changes);
    changes
}

fn diff_at(path: String, before: &Value, after: &Value, changes: &mut Vec<Change>) {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, new_value) in new {
                let child = join_key(&path, key);
                match old.get(key) {
                    Some(old_value) => diff_at(child, old_value, new_value, changes),
                    None => changes.push(Change {
                        path: child,
                        kind: ChangeKind::Added(new_value.clone()),
                    }),
                }
            }
            for (key, old_value) in old {
                if !new.contains_key(key) {
                    changes.push(Change {
                        path: join_key(&path, key),
                        kind: ChangeKind::Removed(old_value.clone()),
                    });
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            for index in 0..old.len().max(new.len()) {
                let child = format!("{}[{}]", path, index);
                match (old.get(index), new.get(index)) {
                    (Some(o), Some(n)) => diff_at(child, o, n, changes),
                    (None, Some(n)) => changes.push(Change {
                        path: child,
                        kind: ChangeKind::Added(n.clone()),
                    }),
                    (Some(o), None) => changes.push(Change {
                        path: child,
                        kind: ChangeKind::Removed(o.clone()),
                    }),
                    (None, None) => {}
                }
            }
        }
        _ if before != after => changes.push(Change {
            path,
            kind: ChangeKind::Modified {
                before: before.clone(),
                after: after.clone(),
            },
        }),
        _ => {}
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_documents() {
        let doc = json!({"Resources": {"A": {"Type": "AWS::ECS::Cluster"}}});
        assert!(diff(&doc, &doc).is_empty());
    }

    #[test]
    fn test_added_removed_modified() {
        let before = json!({
            "Parameters": {"Old": {"Type": "String"}},
            "Resources": {"Cluster": {"Type": "AWS::ECS::Cluster", "Properties": {"ClusterName": "A"}}}
        });
        let after = json!({
            "Resources": {
                "Cluster": {"Type": "AWS::ECS::Cluster", "Properties": {"ClusterName": "B"}},
                "User": {"Type": "AWS::IAM::User"}
            }
        });

        let changes = diff(&before, &after);
        assert_eq!(
            changes,
            vec![
                Change {
                    path: "Resources.Cluster.Properties.ClusterName".to_string(),
                    kind: ChangeKind::Modified {
                        before: json!("A"),
                        after: json!("B")
                    },
                },
                Change {
                    path: "Resources.User".to_string(),
                    kind: ChangeKind::Added(json!({"Type": "AWS::IAM::User"})),
                },
                Change {
                    path: "Parameters".to_string(),
                    kind: ChangeKind::Removed(json!({"Old": {"Type": "String"}})),
                },
            ]
        );
    }

    #[test]
    fn test_array_positions() {
        let before = json!({"Action": ["ecs:poll", "ecs:stopTask"]});
        let after = json!({"Action": ["ecs:poll"]});
        let changes = diff(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "Action[1]");
        assert_eq!(changes[0].to_string(), r#"- Action[1]: "ecs:stopTask""#);
    }

    #[test]
    fn test_type_change_is_modification() {
        let changes = diff(&json!({"Roles": "A"}), &json!({"Roles": ["A"]}));
        assert_eq!(changes[0].to_string(), r#"~ Roles: "A" -> ["A"]"#);
    }
}
