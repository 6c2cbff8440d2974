//! IAM resources and inline policy documents

use std::fmt;

use indexmap::IndexMap;

use super::{insert_list, insert_opt, ResourceKind};
use crate::template::Expr;

/// Policy language version written by [`PolicyDocument::new`]
pub const POLICY_VERSION: &str = "2012-10-17";

/// Whether a statement grants or denies its actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a trust policy statement applies to
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    /// Service principals such as `ec2.amazonaws.com`
    Service(Vec<String>),
    /// Account or role ARNs
    Aws(Vec<Expr>),
    /// `"*"`
    Any,
}

impl Principal {
    pub fn service<I, T>(services: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Principal::Service(services.into_iter().map(Into::into).collect())
    }
}

impl From<Principal> for Expr {
    fn from(principal: Principal) -> Self {
        let (key, values) = match principal {
            Principal::Any => return Expr::from("*"),
            Principal::Service(services) => ("Service", Expr::list(services)),
            Principal::Aws(arns) => ("AWS", Expr::List(arns)),
        };
        let mut map = IndexMap::new();
        map.insert(key.to_string(), values);
        Expr::Map(map)
    }
}

/// One statement of a policy document
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub principal: Option<Principal>,
    pub actions: Vec<String>,
    pub resources: Vec<Expr>,
}

impl PolicyStatement {
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            principal: None,
            actions: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn allow() -> Self {
        Self::new(Effect::Allow)
    }

    pub fn deny() -> Self {
        Self::new(Effect::Deny)
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_actions<I, T>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn with_resources<I, T>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }
}

impl From<PolicyStatement> for Expr {
    fn from(statement: PolicyStatement) -> Self {
        let mut map = IndexMap::new();
        map.insert("Effect".to_string(), Expr::from(statement.effect.as_str()));
        insert_opt(&mut map, "Principal", statement.principal.map(Expr::from));
        insert_list(&mut map, "Action", statement.actions);
        insert_list(&mut map, "Resource", statement.resources);
        Expr::Map(map)
    }
}

/// A policy document: version and statements
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDocument {
    pub version: Option<String>,
    pub statements: Vec<PolicyStatement>,
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyDocument {
    /// A document at the current policy language version
    pub fn new() -> Self {
        Self {
            version: Some(POLICY_VERSION.to_string()),
            statements: Vec::new(),
        }
    }

    /// A document without a `Version` key
    pub fn unversioned() -> Self {
        Self {
            version: None,
            statements: Vec::new(),
        }
    }

    pub fn with_statement(mut self, statement: PolicyStatement) -> Self {
        self.statements.push(statement);
        self
    }
}

impl From<PolicyDocument> for Expr {
    fn from(document: PolicyDocument) -> Self {
        let mut map = IndexMap::new();
        insert_opt(&mut map, "Version", document.version.map(Expr::from));
        map.insert("Statement".to_string(), Expr::list(document.statements));
        Expr::Map(map)
    }
}

/// A named inline policy attached to a user or role
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub name: String,
    pub document: PolicyDocument,
}

impl Policy {
    pub fn new(name: impl Into<String>, document: PolicyDocument) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }
}

impl From<Policy> for Expr {
    fn from(policy: Policy) -> Self {
        let mut map = IndexMap::new();
        map.insert("PolicyName".to_string(), Expr::from(policy.name));
        map.insert("PolicyDocument".to_string(), Expr::from(policy.document));
        Expr::Map(map)
    }
}

/// `AWS::IAM::User`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub user_name: Option<Expr>,
    pub policies: Vec<Policy>,
    pub managed_policy_arns: Vec<Expr>,
}

impl User {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<Expr>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn with_managed_policy(mut self, arn: impl Into<Expr>) -> Self {
        self.managed_policy_arns.push(arn.into());
        self
    }
}

impl ResourceKind for User {
    const TYPE: &'static str = "AWS::IAM::User";

    fn properties(self) -> IndexMap<String, Expr> {
        let mut properties = IndexMap::new();
        insert_opt(&mut properties, "UserName", self.user_name);
        insert_list(&mut properties, "Policies", self.policies);
        insert_list(&mut properties, "ManagedPolicyArns", self.managed_policy_arns);
        properties
    }
}

/// `AWS::IAM::AccessKey`
#[derive(Debug, Clone, PartialEq)]
pub struct AccessKey {
    pub user_name: Expr,
    /// `Active` or `Inactive`; the provider defaults to `Active`
    pub status: Option<Expr>,
}

impl AccessKey {
    pub fn for_user(user_name: impl Into<Expr>) -> Self {
        Self {
            user_name: user_name.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<Expr>) -> Self {
        self.status = Some(status.into());
        self
    }
}

impl ResourceKind for AccessKey {
    const TYPE: &'static str = "AWS::IAM::AccessKey";

    fn properties(self) -> IndexMap<String, Expr> {
        let mut properties = IndexMap::new();
        properties.insert("UserName".to_string(), self.user_name);
        insert_opt(&mut properties, "Status", self.status);
        properties
    }
}

/// `AWS::IAM::Role`
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub assume_role_policy: PolicyDocument,
    pub policies: Vec<Policy>,
    pub managed_policy_arns: Vec<Expr>,
}

impl Role {
    pub fn new(assume_role_policy: PolicyDocument) -> Self {
        Self {
            assume_role_policy,
            policies: Vec::new(),
            managed_policy_arns: Vec::new(),
        }
    }

    /// A role that the given service principals may assume
    pub fn assumable_by<I, T>(services: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::new(
            PolicyDocument::unversioned().with_statement(
                PolicyStatement::allow()
                    .with_principal(Principal::service(services))
                    .with_actions(["sts:AssumeRole"]),
            ),
        )
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn with_managed_policy(mut self, arn: impl Into<Expr>) -> Self {
        self.managed_policy_arns.push(arn.into());
        self
    }
}

impl ResourceKind for Role {
    const TYPE: &'static str = "AWS::IAM::Role";

    fn properties(self) -> IndexMap<String, Expr> {
        let mut properties = IndexMap::new();
        properties.insert(
            "AssumeRolePolicyDocument".to_string(),
            Expr::from(self.assume_role_policy),
        );
        insert_list(&mut properties, "Policies", self.policies);
        insert_list(&mut properties, "ManagedPolicyArns", self.managed_policy_arns);
        properties
    }
}

/// `AWS::IAM::InstanceProfile`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceProfile {
    pub roles: Vec<Expr>,
    pub path: Option<Expr>,
}

impl InstanceProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: impl Into<Expr>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<Expr>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl ResourceKind for InstanceProfile {
    const TYPE: &'static str = "AWS::IAM::InstanceProfile";

    fn properties(self) -> IndexMap<String, Expr> {
        let mut properties = IndexMap::new();
        insert_opt(&mut properties, "Path", self.path);
        insert_list(&mut properties, "Roles", self.roles);
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_statement_key_order() {
        let statement = PolicyStatement::allow()
            .with_actions(["ecs:poll"])
            .with_resources(["*"]);
        let text = serde_json::to_string(&Expr::from(statement)).unwrap();
        assert_eq!(
            text,
            r#"{"Effect":"Allow","Action":["ecs:poll"],"Resource":["*"]}"#
        );
    }

    #[test]
    fn test_assumable_role_trust_policy() {
        let resource = Role::assumable_by(["ec2.amazonaws.com"]).into_resource();
        assert_eq!(
            serde_json::to_value(&resource.properties["AssumeRolePolicyDocument"]).unwrap(),
            json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {"Service": ["ec2.amazonaws.com"]},
                    "Action": ["sts:AssumeRole"]
                }]
            })
        );
    }

    #[test]
    fn test_inline_policy_shape() {
        let policy = Policy::new(
            "ManageECSInstances",
            PolicyDocument::new().with_statement(
                PolicyStatement::deny()
                    .with_actions(["ecs:stopTask"])
                    .with_resources(["*"]),
            ),
        );
        assert_eq!(
            serde_json::to_value(Expr::from(policy)).unwrap(),
            json!({
                "PolicyName": "ManageECSInstances",
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{"Effect": "Deny", "Action": ["ecs:stopTask"], "Resource": ["*"]}]
                }
            })
        );
    }

    #[test]
    fn test_any_principal() {
        assert_eq!(Expr::from(Principal::Any), Expr::from("*"));
    }

    #[test]
    fn test_access_key_references_user() {
        let resource = AccessKey::for_user(Expr::reference("PluginUser")).into_resource();
        assert_eq!(resource.type_tag, "AWS::IAM::AccessKey");
        assert_eq!(
            resource.properties["UserName"],
            Expr::reference("PluginUser")
        );
    }

    #[test]
    fn test_instance_profile_roles() {
        let resource = InstanceProfile::new()
            .with_role(Expr::reference("Role"))
            .into_resource();
        assert_eq!(
            serde_json::to_value(&resource.properties).unwrap(),
            json!({"Roles": [{"Ref": "Role"}]})
        );
    }
}
