//! The built-in GoCD ECS stack expands to the expected CloudFormation document

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use cfn_stack::stacks::{self, gocd_ecs};
use cfn_stack::{ActionCatalog, Template};

fn expanded() -> Value {
    gocd_ecs::template()
        .expect("Stack should finalize")
        .to_provider_value()
        .unwrap()
}

fn allow_all(actions: &[&str]) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{"Effect": "Allow", "Action": actions, "Resource": ["*"]}]
    })
}

#[test]
fn test_expanded_document() {
    let expected = json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Parameters": {
            "ClusterName": {
                "Description": "The name of the ECS cluster",
                "Type": "String",
                "Default": "GoCD"
            }
        },
        "Outputs": {
            "AccessKey": {"Value": {"Ref": "AccessKey"}},
            "SecretKey": {"Value": {"Fn::GetAtt": ["AccessKey", "SecretAccessKey"]}},
            "GoCDEC2OptimizedRole": {"Value": {"Fn::GetAtt": ["GoCDEC2OptimizedRole", "Arn"]}},
            "GoCDEC2OptimizedInstanceProfile": {
                "Value": {"Fn::GetAtt": ["GoCDEC2OptimizedInstanceProfile", "Arn"]}
            }
        },
        "Resources": {
            "GoCDECSCluster": {
                "Type": "AWS::ECS::Cluster",
                "Properties": {"ClusterName": {"Ref": "ClusterName"}}
            },
            "AccessKey": {
                "Type": "AWS::IAM::AccessKey",
                "Properties": {"UserName": {"Ref": "GoCDECSPluginUser"}}
            },
            "GoCDECSPluginUser": {
                "Type": "AWS::IAM::User",
                "Properties": {
                    "Policies": [
                        {
                            "PolicyName": "ManageEC2Instances",
                            "PolicyDocument": allow_all(gocd_ecs::EC2_INSTANCE_ACTIONS)
                        },
                        {
                            "PolicyName": "ManageECSInstances",
                            "PolicyDocument": allow_all(gocd_ecs::ECS_INSTANCE_ACTIONS)
                        }
                    ]
                }
            },
            "GoCDEC2OptimizedRole": {
                "Type": "AWS::IAM::Role",
                "Properties": {
                    "AssumeRolePolicyDocument": {
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": {"Service": ["ec2.amazonaws.com"]},
                            "Action": ["sts:AssumeRole"]
                        }]
                    },
                    "Policies": [{
                        "PolicyName": "AllowECSAgentToManageContainers",
                        "PolicyDocument": allow_all(gocd_ecs::ECS_AGENT_ACTIONS)
                    }]
                }
            },
            "GoCDEC2OptimizedInstanceProfile": {
                "Type": "AWS::IAM::InstanceProfile",
                "Properties": {"Roles": [{"Ref": "GoCDEC2OptimizedRole"}]}
            }
        }
    });

    assert_eq!(expanded(), expected);
}

#[test]
fn test_declaration_order_is_kept() {
    let value = expanded();
    let keys = |section: &str| -> Vec<String> {
        value[section].as_object().unwrap().keys().cloned().collect()
    };

    assert_eq!(
        keys("Resources"),
        vec![
            "GoCDECSCluster",
            "AccessKey",
            "GoCDECSPluginUser",
            "GoCDEC2OptimizedRole",
            "GoCDEC2OptimizedInstanceProfile",
        ]
    );
    assert_eq!(
        keys("Outputs"),
        vec![
            "AccessKey",
            "SecretKey",
            "GoCDEC2OptimizedRole",
            "GoCDEC2OptimizedInstanceProfile",
        ]
    );
}

#[test]
fn test_action_counts() {
    assert_eq!(gocd_ecs::EC2_INSTANCE_ACTIONS.len(), 14);
    assert_eq!(gocd_ecs::ECS_INSTANCE_ACTIONS.len(), 11);
    assert_eq!(gocd_ecs::ECS_AGENT_ACTIONS.len(), 10);
}

#[test]
fn test_model_json_keeps_use_previous_value() {
    let template = gocd_ecs::template().unwrap();
    let model: Value = serde_json::from_str(&template.to_json(false).unwrap()).unwrap();
    assert_eq!(
        model["Parameters"]["ClusterName"]["UsePreviousValue"],
        json!(true)
    );

    let reparsed = Template::from_json(&template.to_json(false).unwrap()).unwrap();
    assert_eq!(reparsed, template);
}

#[test]
fn test_builtin_registry_and_lint() {
    assert_eq!(stacks::names().collect::<Vec<_>>(), vec!["gocd-ecs"]);

    let template = stacks::builtin("gocd-ecs").unwrap().unwrap();
    let warnings = cfn_stack::lint::check(&template, &ActionCatalog::default());
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
}
