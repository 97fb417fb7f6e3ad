mod common;

use std::collections::VecDeque;

use careportal::cli::{
    run_wizard, ConfirmationResponse, PromptContext, PromptResponse, StepInteraction,
    WizardOutcome,
};
use careportal::forms::{Banner, WizardPhase, WizardShell};
use careportal::gateway::{MemoryGateway, SubmitFailure};
use careportal::registration::PractitionerRegistration;
use common::created;
use serde_json::{json, Value};

#[derive(Default)]
struct ScriptedInteraction {
    answers: VecDeque<PromptResponse>,
    confirmations: VecDeque<ConfirmationResponse>,
    retries: VecDeque<bool>,
    prompted: Vec<String>,
    errors_seen: Vec<String>,
}

impl ScriptedInteraction {
    fn answering(answers: Vec<PromptResponse>) -> Self {
        Self {
            answers: answers.into(),
            ..Self::default()
        }
    }
}

impl StepInteraction for ScriptedInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> Result<PromptResponse, dialoguer::Error> {
        self.prompted.push(context.field.path.to_string());
        if let Some(error) = context.field.error {
            self.errors_seen.push(error.to_string());
        }
        Ok(self.answers.pop_front().unwrap_or(PromptResponse::Cancel))
    }

    fn confirm(&mut self, _summary: &[(String, String)]) -> Result<ConfirmationResponse, dialoguer::Error> {
        Ok(self
            .confirmations
            .pop_front()
            .unwrap_or(ConfirmationResponse::Submit))
    }

    fn retry(&mut self, _banner: &Banner) -> Result<bool, dialoguer::Error> {
        Ok(self.retries.pop_front().unwrap_or(false))
    }
}

fn value(v: Value) -> PromptResponse {
    PromptResponse::Value(v)
}

fn practitioner_script() -> Vec<PromptResponse> {
    vec![
        value(json!("General Practice")),
        value(json!("MED0001234567")),
        value(json!(12)),
        value(json!(40)),
    ]
}

#[tokio::test]
async fn scripted_run_submits_once() {
    let gateway = MemoryGateway::with_script(vec![Ok(created(5))]);
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    let mut ui = ScriptedInteraction::answering(practitioner_script());

    let outcome = run_wizard(&mut shell, &gateway, &mut ui).await.unwrap();

    assert_eq!(outcome, WizardOutcome::Completed(created(5)));
    assert_eq!(gateway.call_count(), 1);
    assert_eq!(
        ui.prompted,
        vec![
            "professional.specialty",
            "professional.licenseNumber",
            "placement.clinicId",
            "placement.userId"
        ]
    );
}

#[tokio::test]
async fn cancel_at_first_prompt_submits_nothing() {
    let gateway = MemoryGateway::new();
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    let mut ui = ScriptedInteraction::answering(vec![PromptResponse::Cancel]);

    let outcome = run_wizard(&mut shell, &gateway, &mut ui).await.unwrap();

    assert_eq!(outcome, WizardOutcome::Cancelled);
    assert_eq!(shell.phase(), WizardPhase::Cancelled);
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn invalid_step_is_prompted_again_with_errors() {
    let gateway = MemoryGateway::new();
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    let mut answers = vec![PromptResponse::Keep, value(json!("MED0001234567"))];
    answers.extend(practitioner_script());
    let mut ui = ScriptedInteraction::answering(answers);

    let outcome = run_wizard(&mut shell, &gateway, &mut ui).await.unwrap();

    assert!(matches!(outcome, WizardOutcome::Completed(_)));
    assert_eq!(ui.errors_seen, vec!["Specialty is required"]);
}

#[tokio::test]
async fn back_from_second_step_revisits_the_first() {
    let gateway = MemoryGateway::new();
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    let mut answers = practitioner_script();
    answers.insert(2, PromptResponse::Back);
    let mut ui = ScriptedInteraction::answering(answers);
    ui.answers.insert(3, PromptResponse::Keep);
    ui.answers.insert(4, PromptResponse::Keep);

    let outcome = run_wizard(&mut shell, &gateway, &mut ui).await.unwrap();

    assert!(matches!(outcome, WizardOutcome::Completed(_)));
    assert_eq!(ui.prompted.len(), 7);
    assert_eq!(ui.prompted[3], "professional.specialty");
}

#[tokio::test]
async fn transient_failure_is_retried_on_request() {
    let gateway = MemoryGateway::with_script(vec![
        Err(SubmitFailure::Transient {
            status: Some(503),
            message: "The portal is temporarily unavailable".into(),
        }),
        Ok(created(9)),
    ]);
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    let mut ui = ScriptedInteraction::answering(practitioner_script());
    ui.retries.push_back(true);

    let outcome = run_wizard(&mut shell, &gateway, &mut ui).await.unwrap();

    assert_eq!(outcome, WizardOutcome::Completed(created(9)));
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn declined_retry_reports_failure() {
    let gateway = MemoryGateway::with_script(vec![Err(SubmitFailure::Transient {
        status: None,
        message: "connection refused".into(),
    })]);
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    let mut ui = ScriptedInteraction::answering(practitioner_script());

    let outcome = run_wizard(&mut shell, &gateway, &mut ui).await.unwrap();

    assert_eq!(outcome, WizardOutcome::Failed("connection refused".into()));
    assert_eq!(shell.field("professional.specialty"), Some(&json!("General Practice")));
}
