//! Template builder: accumulates declarations and finalizes them

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::document::{Output, Parameter, Resource, Template, DEFAULT_FORMAT_VERSION};
use super::expr::{Expr, Reference};
use crate::error::{EntityKind, TemplateError};
use crate::resources::ResourceKind;

/// Pseudo parameters the provider defines for every stack
pub const PSEUDO_PARAMETERS: &[&str] = &[
    "AWS::AccountId",
    "AWS::NotificationARNs",
    "AWS::NoValue",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

/// Builder for a [`Template`].
///
/// Parameters and resources share one namespace; outputs have their own.
/// Names are checked as they are declared, references only at
/// [`finalize`](TemplateBuilder::finalize), so declarations may refer
/// forward.
#[derive(Debug)]
pub struct TemplateBuilder {
    format_version: String,
    description: Option<String>,
    sections: IndexMap<String, Value>,
    parameters: IndexMap<String, Parameter>,
    outputs: IndexMap<String, Output>,
    resources: IndexMap<String, Resource>,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self {
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
            description: None,
            sections: IndexMap::new(),
            parameters: IndexMap::new(),
            outputs: IndexMap::new(),
            resources: IndexMap::new(),
        }
    }
}

impl TemplateBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the template format version
    pub fn with_format_version(mut self, version: impl Into<String>) -> Self {
        self.format_version = version.into();
        self
    }

    /// Set the template description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set a top-level section the builder does not model, such as
    /// `Mappings`, `Conditions` or `Transform`
    pub fn with_section(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sections.insert(name.into(), value.into());
        self
    }

    /// Declare a parameter
    pub fn declare_parameter(
        &mut self,
        name: impl Into<String>,
        parameter: Parameter,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        self.ensure_unique(&name, EntityKind::Parameter)?;
        debug!(name = %name, param_type = %parameter.param_type, "declared parameter");
        self.parameters.insert(name, parameter);
        Ok(())
    }

    /// Declare an output.
    ///
    /// Outputs are a separate namespace from parameters and resources, so an
    /// output may share a resource's name.
    pub fn declare_output(
        &mut self,
        name: impl Into<String>,
        output: Output,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        self.ensure_unique(&name, EntityKind::Output)?;
        debug!(name = %name, "declared output");
        self.outputs.insert(name, output);
        Ok(())
    }

    /// Declare a resource from its type tag and opaque properties
    pub fn declare_resource(
        &mut self,
        name: impl Into<String>,
        resource: Resource,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        self.ensure_unique(&name, EntityKind::Resource)?;
        debug!(name = %name, type_tag = %resource.type_tag, "declared resource");
        self.resources.insert(name, resource);
        Ok(())
    }

    /// Declare a typed resource
    pub fn declare<K: ResourceKind>(
        &mut self,
        name: impl Into<String>,
        kind: K,
    ) -> Result<(), TemplateError> {
        self.declare_resource(name, kind.into_resource())
    }

    /// Whether a logical name is already taken by a parameter or resource
    pub fn is_declared(&self, name: &str) -> bool {
        self.parameters.contains_key(name) || self.resources.contains_key(name)
    }

    fn ensure_unique(&self, name: &str, kind: EntityKind) -> Result<(), TemplateError> {
        let existing = match kind {
            EntityKind::Output => self.outputs.contains_key(name).then_some(EntityKind::Output),
            EntityKind::Parameter | EntityKind::Resource => {
                if self.parameters.contains_key(name) {
                    Some(EntityKind::Parameter)
                } else if self.resources.contains_key(name) {
                    Some(EntityKind::Resource)
                } else {
                    None
                }
            }
        };

        match existing {
            Some(existing) => Err(TemplateError::duplicate(name, kind, existing)),
            None => Ok(()),
        }
    }

    /// Every reference that does not resolve, resources first then outputs,
    /// each in declaration order
    pub fn unresolved_references(&self) -> Vec<TemplateError> {
        let defined = self.defined_names();
        let mut unresolved = Vec::new();

        for (name, resource) in &self.resources {
            for value in resource.properties.values() {
                self.check_expr(value, EntityKind::Resource, name, &defined, &mut unresolved);
            }
            for dependency in &resource.depends_on {
                if !self.resources.contains_key(dependency) {
                    let candidates: HashSet<String> = self.resources.keys().cloned().collect();
                    unresolved.push(TemplateError::unresolved(
                        dependency.as_str(),
                        EntityKind::Resource,
                        name.as_str(),
                        find_similar(&candidates, dependency, 2),
                    ));
                }
            }
        }

        for (name, output) in &self.outputs {
            self.check_expr(&output.value, EntityKind::Output, name, &defined, &mut unresolved);
            if let Some(export) = &output.export {
                self.check_expr(&export.name, EntityKind::Output, name, &defined, &mut unresolved);
            }
        }

        unresolved
    }

    fn check_expr(
        &self,
        expr: &Expr,
        referrer_kind: EntityKind,
        referrer: &str,
        defined: &HashSet<String>,
        unresolved: &mut Vec<TemplateError>,
    ) {
        for reference in expr.references() {
            let target = reference.target();
            if defined.contains(target) {
                continue;
            }
            let suggestions = match reference {
                Reference::GetAtt { .. } => {
                    let resources: HashSet<String> = self.resources.keys().cloned().collect();
                    find_similar(&resources, target, 2)
                }
                Reference::Ref(_) => find_similar(defined, target, 2),
            };
            unresolved.push(TemplateError::unresolved(
                target,
                referrer_kind,
                referrer,
                suggestions,
            ));
        }
    }

    fn defined_names(&self) -> HashSet<String> {
        self.parameters
            .keys()
            .chain(self.resources.keys())
            .cloned()
            .chain(PSEUDO_PARAMETERS.iter().map(|p| p.to_string()))
            .collect()
    }

    /// Resolve all references and produce the immutable template
    pub fn finalize(self) -> Result<Template, TemplateError> {
        if let Some(err) = self.unresolved_references().into_iter().next() {
            return Err(err);
        }

        debug!(
            parameters = self.parameters.len(),
            outputs = self.outputs.len(),
            resources = self.resources.len(),
            "finalized template"
        );

        Ok(Template::assemble(
            self.format_version,
            self.description,
            self.sections,
            self.parameters,
            self.outputs,
            self.resources,
        ))
    }
}

/// Compute Levenshtein edit distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Find declared names within a maximum edit distance, closest first
fn find_similar(defined: &HashSet<String>, target: &str, max_distance: usize) -> Vec<String> {
    let mut candidates: Vec<(String, usize)> = defined
        .iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            if dist <= max_distance && dist > 0 {
                Some((name.clone(), dist))
            } else {
                None
            }
        })
        .collect();

    candidates.sort_by(|(a_name, a_dist), (b_name, b_dist)| {
        a_dist.cmp(b_dist).then_with(|| a_name.cmp(b_name))
    });
    candidates
        .into_iter()
        .map(|(name, _)| name)
        .take(3)
        .collect()
}
