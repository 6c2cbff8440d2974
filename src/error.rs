//! Error types for template declaration and finalization

use std::fmt;

use thiserror::Error;

/// The kind of entity a logical name was declared as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Parameter,
    Output,
    Resource,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Parameter => write!(f, "parameter"),
            EntityKind::Output => write!(f, "output"),
            EntityKind::Resource => write!(f, "resource"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    /// A logical name collides with an earlier declaration
    #[error("duplicate logical name '{name}': {kind} collides with an existing {existing}")]
    DuplicateName {
        name: String,
        kind: EntityKind,
        existing: EntityKind,
    },

    /// A reference expression names an entity that was never declared
    #[error("unresolved reference to '{name}' from {referrer_kind} '{referrer}'{}", format_suggestions(.suggestions))]
    UnresolvedReference {
        name: String,
        referrer_kind: EntityKind,
        referrer: String,
        suggestions: Vec<String>,
    },

    /// The template JSON could not be read
    #[error("invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl TemplateError {
    /// Create a duplicate name error
    pub fn duplicate(name: impl Into<String>, kind: EntityKind, existing: EntityKind) -> Self {
        Self::DuplicateName {
            name: name.into(),
            kind,
            existing,
        }
    }

    /// Create an unresolved reference error
    pub fn unresolved(
        name: impl Into<String>,
        referrer_kind: EntityKind,
        referrer: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::UnresolvedReference {
            name: name.into(),
            referrer_kind,
            referrer: referrer.into(),
            suggestions,
        }
    }

    /// The logical name the error is about, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::DuplicateName { name, .. } => Some(name),
            Self::UnresolvedReference { name, .. } => Some(name),
            Self::Json(_) => None,
        }
    }

    /// Get suggestions if available
    pub fn suggestions(&self) -> Option<&[String]> {
        match self {
            Self::UnresolvedReference { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_display() {
        let err = TemplateError::duplicate("Role", EntityKind::Resource, EntityKind::Resource);
        assert_eq!(
            err.to_string(),
            "duplicate logical name 'Role': resource collides with an existing resource"
        );
        assert_eq!(err.name(), Some("Role"));
    }

    #[test]
    fn test_unresolved_display_with_suggestions() {
        let err = TemplateError::unresolved(
            "Clster",
            EntityKind::Output,
            "ClusterArn",
            vec!["Cluster".to_string()],
        );
        let message = err.to_string();
        assert!(message.contains("'Clster'"));
        assert!(message.contains("output 'ClusterArn'"));
        assert!(message.contains("did you mean Cluster?"));
    }

    #[test]
    fn test_unresolved_display_without_suggestions() {
        let err = TemplateError::unresolved("Missing", EntityKind::Output, "Out", vec![]);
        assert_eq!(
            err.to_string(),
            "unresolved reference to 'Missing' from output 'Out'"
        );
    }
}
