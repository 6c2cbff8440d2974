//! ECS resources

use indexmap::IndexMap;

use super::{insert_list, insert_opt, ResourceKind};
use crate::template::Expr;

/// `AWS::ECS::Cluster`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    pub cluster_name: Option<Expr>,
    /// Capacity providers such as `FARGATE` or `FARGATE_SPOT`
    pub capacity_providers: Vec<Expr>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<Expr>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    pub fn with_capacity_provider(mut self, provider: impl Into<Expr>) -> Self {
        self.capacity_providers.push(provider.into());
        self
    }
}

impl ResourceKind for Cluster {
    const TYPE: &'static str = "AWS::ECS::Cluster";

    fn properties(self) -> IndexMap<String, Expr> {
        let mut properties = IndexMap::new();
        insert_opt(&mut properties, "ClusterName", self.cluster_name);
        insert_list(&mut properties, "CapacityProviders", self.capacity_providers);
        properties
    }
}
