//! Submission through the provisioning engine seam with a recording engine

use std::cell::RefCell;

use pretty_assertions::assert_eq;

use cfn_stack::engine::{
    self, ParameterSource, ParameterValue, StackOperation, CAPABILITY_IAM,
};
use cfn_stack::stacks::gocd_ecs;
use cfn_stack::{
    submit, ProvisioningEngine, StackConfig, StackRequest, SubmitError, SubmitMode,
};

/// Records every call and answers with a canned result
#[derive(Default)]
struct RecordingEngine {
    calls: RefCell<Vec<(StackOperation, String)>>,
    requests: RefCell<Vec<StackRequest>>,
    reject_with: Option<String>,
}

impl RecordingEngine {
    fn rejecting(stderr: &str) -> Self {
        Self {
            reject_with: Some(stderr.to_string()),
            ..Self::default()
        }
    }

    fn answer(&self, operation: StackOperation, subject: &str) -> Result<String, SubmitError> {
        self.calls
            .borrow_mut()
            .push((operation, subject.to_string()));
        match &self.reject_with {
            Some(stderr) => Err(SubmitError::Rejected {
                operation,
                status: Some(254),
                stderr: stderr.clone(),
            }),
            None => Ok(format!("arn:aws:cloudformation:stack/{}", subject)),
        }
    }
}

impl ProvisioningEngine for RecordingEngine {
    fn create_stack(&self, request: &StackRequest) -> Result<String, SubmitError> {
        self.requests.borrow_mut().push(request.clone());
        self.answer(StackOperation::Create, &request.stack_name)
    }

    fn update_stack(&self, request: &StackRequest) -> Result<String, SubmitError> {
        self.requests.borrow_mut().push(request.clone());
        self.answer(StackOperation::Update, &request.stack_name)
    }

    fn delete_stack(&self, stack_name: &str) -> Result<String, SubmitError> {
        self.answer(StackOperation::Delete, stack_name)
    }

    fn validate_template(&self, template_body: &str) -> Result<String, SubmitError> {
        self.answer(StackOperation::Validate, template_body)
    }

    fn fetch_template(&self, stack_name: &str) -> Result<String, SubmitError> {
        self.answer(StackOperation::FetchTemplate, stack_name)
    }
}

fn config() -> StackConfig {
    StackConfig::new()
        .with_stack_name("gocd")
        .with_tag("team", "ci")
}

#[test]
fn test_create_submits_provider_json() {
    let template = gocd_ecs::template().unwrap();
    let engine = RecordingEngine::default();

    let submission = submit(&template, &engine, &config(), SubmitMode::Create).unwrap();
    assert_eq!(submission.operation, StackOperation::Create);
    assert_eq!(submission.stack_name, "gocd");
    assert_eq!(submission.output, "arn:aws:cloudformation:stack/gocd");

    let requests = engine.requests.borrow();
    let request = &requests[0];
    assert_eq!(
        request.template_body,
        template.to_provider_json(false).unwrap()
    );
    assert!(request.parameters.is_empty());
    assert_eq!(request.capabilities, vec![CAPABILITY_IAM.to_string()]);
    assert_eq!(request.tags, vec![("team".to_string(), "ci".to_string())]);
}

#[test]
fn test_update_uses_previous_cluster_name() {
    let template = gocd_ecs::template().unwrap();
    let engine = RecordingEngine::default();

    submit(&template, &engine, &config(), SubmitMode::Update).unwrap();
    assert_eq!(
        engine.requests.borrow()[0].parameters,
        vec![ParameterValue {
            key: gocd_ecs::CLUSTER_NAME_PARAMETER.to_string(),
            source: ParameterSource::UsePrevious,
        }]
    );
}

#[test]
fn test_update_with_override() {
    let template = gocd_ecs::template().unwrap();
    let engine = RecordingEngine::default();
    let config = config().with_parameter("ClusterName", "Builds");

    submit(&template, &engine, &config, SubmitMode::Update).unwrap();
    assert_eq!(
        engine.requests.borrow()[0].parameters[0].source,
        ParameterSource::Value("Builds".to_string())
    );
}

#[test]
fn test_unknown_parameter_never_reaches_engine() {
    let template = gocd_ecs::template().unwrap();
    let engine = RecordingEngine::default();
    let config = config().with_parameter("ClusterNmae", "Builds");

    let err = submit(&template, &engine, &config, SubmitMode::Create).unwrap_err();
    assert!(matches!(err, SubmitError::UnknownParameter { .. }));
    assert!(engine.calls.borrow().is_empty());
}

#[test]
fn test_rejection_is_passed_through() {
    let template = gocd_ecs::template().unwrap();
    let engine = RecordingEngine::rejecting(
        "An error occurred (AlreadyExistsException): Stack [gocd] already exists",
    );

    let err = submit(&template, &engine, &config(), SubmitMode::Create).unwrap_err();
    match err {
        SubmitError::Rejected {
            operation, stderr, ..
        } => {
            assert_eq!(operation, StackOperation::Create);
            assert_eq!(
                stderr,
                "An error occurred (AlreadyExistsException): Stack [gocd] already exists"
            );
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_delete_requires_stack_name() {
    let engine = RecordingEngine::default();
    assert!(matches!(
        engine::delete(&engine, &StackConfig::new()),
        Err(SubmitError::MissingStackName)
    ));

    let submission = engine::delete(&engine, &config()).unwrap();
    assert_eq!(submission.operation, StackOperation::Delete);
    assert_eq!(
        engine.calls.borrow().as_slice(),
        &[(StackOperation::Delete, "gocd".to_string())]
    );
}
