//! Integration tests for the lint command's checks

use std::path::Path;

use cfn_stack::lint::{self, LintCategory};
use cfn_stack::resources::{Policy, PolicyDocument, PolicyStatement, User};
use cfn_stack::template::{Expr, Resource, TemplateBuilder};
use cfn_stack::{ActionCatalog, Template};

#[test]
fn test_true_positives_all_categories() {
    let source = include_str!("lint-fixtures/true-positives.json");
    let template = Template::from_json(source).expect("Should finalize");
    let warnings = lint::check(&template, &ActionCatalog::default());

    let categories: Vec<LintCategory> = warnings.iter().map(|w| w.category).collect();
    assert_eq!(
        categories,
        vec![
            LintCategory::ResourceType,
            LintCategory::Policy,
            LintCategory::Action,
            LintCategory::Parameter,
            LintCategory::Reference,
        ],
        "got: {:?}",
        warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>()
    );

    let rendered: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
    assert!(rendered[0].starts_with("[resource-type] resource \"Cluster\""));
    assert!(rendered[1].contains("invalid effect \"Permit\""));
    assert!(rendered[2].contains("\"ecs:listTask\" is not a known ecs action"));
    assert!(rendered[3].contains("\"Forgotten\""));
    assert!(rendered[4].contains("ClusterName.Arn"));
}

#[test]
fn test_true_negatives_clean() {
    let source = include_str!("lint-fixtures/true-negatives.json");
    let template = Template::from_json(source).expect("Should finalize");
    let warnings = lint::check(&template, &ActionCatalog::default());

    assert!(
        warnings.is_empty(),
        "Expected no warnings for true-negatives, got: {:?}",
        warnings
            .iter()
            .map(|w| format!("{}: {}", w.category, w.message))
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_extra_catalog_accepts_more_services() {
    let mut builder = TemplateBuilder::new();
    builder
        .declare(
            "Reader",
            User::new().with_policy(Policy::new(
                "ReadTable",
                PolicyDocument::new().with_statement(
                    PolicyStatement::allow()
                        .with_actions(["dynamodb:GetItem", "dynamodb:Query"])
                        .with_resources([Expr::get_att("Table", "Arn")]),
                ),
            )),
        )
        .unwrap();
    builder
        .declare_resource("Table", Resource::new("AWS::DynamoDB::Table"))
        .unwrap();
    let template = builder.finalize().unwrap();

    let mut catalog = ActionCatalog::default();
    assert_eq!(lint::check(&template, &catalog).len(), 2);

    let extra =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/lint-fixtures/extra-actions.toml");
    let extra = ActionCatalog::from_file(&extra).expect("Should load catalog");
    assert_eq!(extra.name.as_deref(), Some("dynamodb"));
    catalog.extend(extra);
    assert!(lint::check(&template, &catalog).is_empty());
}
