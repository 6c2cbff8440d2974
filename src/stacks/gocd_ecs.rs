//! ECS cluster and IAM identities for the GoCD ECS elastic agent plugin.
//!
//! The plugin runs as `GoCDECSPluginUser` (its access key is exported as
//! outputs) and launches container instances with the
//! `GoCDEC2OptimizedInstanceProfile`, whose role lets the ECS agent register
//! with the cluster.

use crate::error::TemplateError;
use crate::resources::{
    AccessKey, Cluster, InstanceProfile, Policy, PolicyDocument, PolicyStatement, Role, User,
};
use crate::template::{Expr, Output, Parameter, Template, TemplateBuilder};

pub const NAME: &str = "gocd-ecs";

pub const CLUSTER_NAME_PARAMETER: &str = "ClusterName";
pub const DEFAULT_CLUSTER_NAME: &str = "GoCD";

/// EC2 permissions the plugin needs to launch and retire container instances
pub const EC2_INSTANCE_ACTIONS: &[&str] = &[
    "ec2:runInstances",
    "ec2:createTags",
    "ec2:terminateInstances",
    "ec2:describeInstances",
    "ec2:describeSubnets",
    "ec2:createVolume",
    "ec2:attachVolume",
    "ec2:stopInstances",
    "ec2:startInstances",
    "ec2:requestSpotInstances",
    "ec2:describeSpotInstanceRequests",
    "ec2:deleteTags",
    "iam:PassRole",
    "iam:GetRole",
];

/// ECS permissions the plugin needs to schedule agent tasks
pub const ECS_INSTANCE_ACTIONS: &[&str] = &[
    "ecs:describeClusters",
    "ecs:deregisterContainerInstance",
    "ecs:describeContainerInstances",
    "ecs:listContainerInstances",
    "ecs:registerTaskDefinition",
    "ecs:deregisterTaskDefinition",
    "ecs:startTask",
    "ecs:stopTask",
    "ecs:listTasks",
    "ecs:describeTasks",
    "ecs:describeTaskDefinition",
];

/// Permissions of the ECS agent running on each container instance
pub const ECS_AGENT_ACTIONS: &[&str] = &[
    "ecs:describeClusters",
    "ecs:discoverPollEndpoint",
    "ecs:registerContainerInstance",
    "ecs:deregisterContainerInstance",
    "ecs:poll",
    "ecs:startTelemetrySession",
    "ecs:submitContainerStateChange",
    "ecs:submitTaskStateChange",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

fn allow_all(actions: &[&str]) -> PolicyDocument {
    PolicyDocument::new().with_statement(
        PolicyStatement::allow()
            .with_actions(actions.iter().copied())
            .with_resources(["*"]),
    )
}

/// Build the stack template
pub fn template() -> Result<Template, TemplateError> {
    let mut builder = TemplateBuilder::new();

    builder.declare_parameter(
        CLUSTER_NAME_PARAMETER,
        Parameter::string()
            .with_description("The name of the ECS cluster")
            .with_default(DEFAULT_CLUSTER_NAME)
            .with_use_previous_value(true),
    )?;

    builder.declare_output("AccessKey", Output::new(Expr::reference("AccessKey")))?;
    builder.declare_output(
        "SecretKey",
        Output::new(Expr::get_att("AccessKey", "SecretAccessKey")),
    )?;
    builder.declare_output(
        "GoCDEC2OptimizedRole",
        Output::new(Expr::get_att("GoCDEC2OptimizedRole", "Arn")),
    )?;
    builder.declare_output(
        "GoCDEC2OptimizedInstanceProfile",
        Output::new(Expr::get_att("GoCDEC2OptimizedInstanceProfile", "Arn")),
    )?;

    builder.declare(
        "GoCDECSCluster",
        Cluster::new().with_name(Expr::reference(CLUSTER_NAME_PARAMETER)),
    )?;

    builder.declare(
        "AccessKey",
        AccessKey::for_user(Expr::reference("GoCDECSPluginUser")),
    )?;

    builder.declare(
        "GoCDECSPluginUser",
        User::new()
            .with_policy(Policy::new(
                "ManageEC2Instances",
                allow_all(EC2_INSTANCE_ACTIONS),
            ))
            .with_policy(Policy::new(
                "ManageECSInstances",
                allow_all(ECS_INSTANCE_ACTIONS),
            )),
    )?;

    builder.declare(
        "GoCDEC2OptimizedRole",
        Role::assumable_by(["ec2.amazonaws.com"]).with_policy(Policy::new(
            "AllowECSAgentToManageContainers",
            allow_all(ECS_AGENT_ACTIONS),
        )),
    )?;

    builder.declare(
        "GoCDEC2OptimizedInstanceProfile",
        InstanceProfile::new().with_role(Expr::reference("GoCDEC2OptimizedRole")),
    )?;

    builder.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_finalizes() {
        let template = template().expect("Stack should finalize");
        assert_eq!(template.parameters().len(), 1);
        assert_eq!(template.outputs().len(), 4);
        assert_eq!(template.resources().len(), 5);
        assert!(template.requires_iam_capability());
    }

    #[test]
    fn test_cluster_name_keeps_previous_value() {
        let template = template().unwrap();
        let parameter = template.parameter(CLUSTER_NAME_PARAMETER).unwrap();
        assert!(parameter.use_previous_value);
        assert_eq!(
            parameter.default,
            Some(serde_json::Value::from(DEFAULT_CLUSTER_NAME))
        );
    }

    #[test]
    fn test_action_lists_have_no_duplicates() {
        for actions in [EC2_INSTANCE_ACTIONS, ECS_INSTANCE_ACTIONS, ECS_AGENT_ACTIONS] {
            let mut seen = std::collections::HashSet::new();
            for action in actions {
                assert!(seen.insert(action), "duplicate action {}", action);
            }
        }
    }
}
