//! Typed resource kinds
//!
//! Each kind knows its provider type tag and lowers its fields into the
//! property map the builder stores. The builder never inspects properties;
//! the provider validates them at submission.

pub mod ecs;
pub mod iam;

use indexmap::IndexMap;

use crate::template::{Expr, Resource};

pub use ecs::Cluster;
pub use iam::{
    AccessKey, Effect, InstanceProfile, Policy, PolicyDocument, PolicyStatement, Principal, Role,
    User, POLICY_VERSION,
};

/// A resource type with typed properties
pub trait ResourceKind {
    /// Provider type tag, e.g. `AWS::ECS::Cluster`
    const TYPE: &'static str;

    /// Lower the typed fields into a property map
    fn properties(self) -> IndexMap<String, Expr>;

    fn into_resource(self) -> Resource
    where
        Self: Sized,
    {
        Resource::new(Self::TYPE).with_properties(self.properties())
    }
}

/// Insert a property only when it is set
pub(crate) fn insert_opt(
    properties: &mut IndexMap<String, Expr>,
    key: &str,
    value: Option<Expr>,
) {
    if let Some(value) = value {
        properties.insert(key.to_string(), value);
    }
}

/// Insert a list property only when it is non-empty
pub(crate) fn insert_list<T: Into<Expr>>(
    properties: &mut IndexMap<String, Expr>,
    key: &str,
    items: Vec<T>,
) {
    if !items.is_empty() {
        properties.insert(key.to_string(), Expr::list(items));
    }
}
