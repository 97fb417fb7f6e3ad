mod common;

use std::sync::{Arc, Mutex};

use careportal::forms::{
    BannerKind, NextOutcome, Progress, Resolution, WizardFlow, WizardPhase, WizardShell,
};
use careportal::gateway::{classify_response, HttpMethod, MemoryGateway, RemoteGateway, SubmitFailure};
use careportal::registration::{ClinicRegistration, ConsentWizard, PractitionerRegistration};
use chrono::NaiveDate;
use common::{clinic_answers, created, fill, practitioner_answers};
use proptest::prelude::*;
use serde_json::json;

fn ticket_of(outcome: NextOutcome) -> careportal::forms::SubmissionTicket {
    match outcome {
        NextOutcome::Submit(ticket) => ticket,
        other => panic!("expected a submission ticket, got {other:?}"),
    }
}

/// Fills and advances through every step but the last, then fills the last.
fn ready_to_submit<F: WizardFlow>(shell: &mut WizardShell<F>, answers: &[Vec<(&str, serde_json::Value)>]) {
    let last = answers.len() - 1;
    for (index, step) in answers.iter().enumerate() {
        fill(shell, step);
        if index < last {
            assert_eq!(
                shell.next().unwrap(),
                NextOutcome::Advanced { to: index + 1 },
                "step {index} should be clean"
            );
        }
    }
}

#[test]
fn empty_legal_name_blocks_first_step() {
    let mut shell = WizardShell::new(ClinicRegistration::new());
    fill(&mut shell, &clinic_answers()[0][1..]);

    let outcome = shell.next().unwrap();

    assert!(matches!(outcome, NextOutcome::Invalid(_)));
    assert_eq!(shell.state().current_step, 0);
    assert_eq!(
        shell.state().errors.get("legalName"),
        Some("Legal name is required")
    );
}

#[test]
fn practitioner_flow_submits_once_and_completes() {
    let completed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completed);
    let mut shell = WizardShell::new(PractitionerRegistration::new())
        .on_complete(move |resource| sink.lock().unwrap().push(resource.id()));

    ready_to_submit(&mut shell, &practitioner_answers());
    let ticket = ticket_of(shell.next().unwrap());

    assert!(shell.is_submitting());
    assert_eq!(ticket.request().method, HttpMethod::Post);
    assert_eq!(ticket.request().path, "/practitioners/");
    assert_eq!(
        ticket.request().body,
        json!({
            "specialty": "General Practice",
            "license_number": "MED0001234567",
            "clinic_id": 12,
            "user_id": 40,
            "is_active": true
        })
    );

    let resolution = shell.resolve(ticket.id(), Ok(created(77)));

    assert!(matches!(resolution, Resolution::Completed(_)));
    assert!(!shell.is_submitting());
    assert_eq!(shell.phase(), WizardPhase::Submitted);
    assert_eq!(*completed.lock().unwrap(), vec![Some("77".to_string())]);
}

#[tokio::test]
async fn server_field_errors_land_on_their_fields() {
    let gateway = MemoryGateway::with_script(vec![classify_response(
        422,
        &json!({ "errors": { "abn": "invalid" } }),
    )]);
    let mut shell = WizardShell::new(ClinicRegistration::new());
    ready_to_submit(&mut shell, &clinic_answers());

    let progress = shell.next_with(&gateway).await.unwrap();

    assert!(matches!(progress, Progress::Submission(Resolution::Rejected(_))));
    assert_eq!(shell.state().errors.get("abn"), Some("invalid"));
    assert_eq!(shell.state().current_step, 0);
    assert!(!shell.is_submitting());
    assert_eq!(
        shell.field("organisationDetails.legalName"),
        Some(&json!("Harbour Family Practice Pty Ltd"))
    );
    assert_eq!(shell.field("identifiers.hpio"), Some(&json!("8003 6212 3456 7892")));
    assert!(shell.state().banner.is_none());
}

#[tokio::test]
async fn unmatched_server_errors_surface_in_a_banner() {
    let gateway = MemoryGateway::with_script(vec![classify_response(
        400,
        &json!({ "detail": [{ "loc": ["body", "region"], "msg": "unsupported region" }] }),
    )]);
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    ready_to_submit(&mut shell, &practitioner_answers());

    shell.next_with(&gateway).await.unwrap();

    let banner = shell.state().banner.clone().expect("banner shown");
    assert_eq!(banner.kind, BannerKind::Rejected);
    assert!(banner.message.contains("unsupported region"));
    assert_eq!(shell.state().current_step, 1);
}

#[tokio::test]
async fn second_next_while_in_flight_issues_nothing() {
    let gateway = MemoryGateway::new();
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    ready_to_submit(&mut shell, &practitioner_answers());

    let ticket = ticket_of(shell.next().unwrap());
    assert_eq!(shell.next().unwrap(), NextOutcome::Busy);
    assert_eq!(shell.retry().unwrap(), NextOutcome::Busy);

    let outcome = gateway.submit(ticket.request(), ticket.id()).await;
    assert!(matches!(
        shell.resolve(ticket.id(), outcome),
        Resolution::Completed(_)
    ));
    assert_eq!(gateway.call_count(), 1);
    assert_eq!(gateway.request_ids(), vec![ticket.id()]);
    assert_eq!(shell.next().unwrap(), NextOutcome::Closed);
}

#[test]
fn results_after_teardown_are_ignored() {
    let completed = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&completed);
    let mut shell = WizardShell::new(PractitionerRegistration::new())
        .on_complete(move |_| *sink.lock().unwrap() += 1);
    ready_to_submit(&mut shell, &practitioner_answers());
    let ticket = ticket_of(shell.next().unwrap());

    shell.teardown();

    assert_eq!(shell.resolve(ticket.id(), Ok(created(1))), Resolution::Ignored);
    assert_eq!(*completed.lock().unwrap(), 0);
    assert_eq!(shell.phase(), WizardPhase::TornDown);
}

#[test]
fn cancelled_submission_can_be_retried_with_a_new_ticket() {
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    ready_to_submit(&mut shell, &practitioner_answers());
    let first = ticket_of(shell.next().unwrap());

    assert!(shell.cancel_submission());
    assert_eq!(shell.phase(), WizardPhase::Editing);
    assert_eq!(shell.resolve(first.id(), Ok(created(1))), Resolution::Ignored);

    let second = ticket_of(shell.retry().unwrap());
    assert_ne!(first.id(), second.id());
    assert!(matches!(
        shell.resolve(second.id(), Ok(created(2))),
        Resolution::Completed(_)
    ));
}

#[test]
fn transient_failure_keeps_answers_and_offers_retry() {
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    ready_to_submit(&mut shell, &practitioner_answers());
    let ticket = ticket_of(shell.next().unwrap());

    let resolution = shell.resolve(
        ticket.id(),
        Err(SubmitFailure::Transient {
            status: Some(503),
            message: "The portal is temporarily unavailable".into(),
        }),
    );

    let Resolution::Failed(banner) = resolution else {
        panic!("expected a failure banner");
    };
    assert!(banner.retryable);
    assert_eq!(shell.field("placement.userId"), Some(&json!(40)));
    assert!(matches!(shell.retry().unwrap(), NextOutcome::Submit(_)));
}

#[test]
fn back_never_validates() {
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    fill(&mut shell, &practitioner_answers()[0]);
    shell.next().unwrap();

    assert!(shell.back());
    assert_eq!(shell.state().current_step, 0);
    assert!(shell.state().errors.is_empty());
    assert!(!shell.back());
}

/// Fills every clinic step and advances to the declarations step.
fn clinic_on_last_step() -> WizardShell<ClinicRegistration> {
    let mut shell = WizardShell::new(ClinicRegistration::new());
    ready_to_submit(&mut shell, &clinic_answers());
    assert_eq!(shell.state().current_step, 5);
    shell
}

#[test]
fn invalid_edit_to_an_earlier_step_is_not_submitted() {
    let mut shell = clinic_on_last_step();
    shell
        .set_field("organisationDetails.abn", "12345678901")
        .unwrap();

    let outcome = shell.next().unwrap();

    assert!(matches!(outcome, NextOutcome::Invalid(_)));
    assert_eq!(shell.state().current_step, 0);
    assert_eq!(
        shell.state().errors.get("abn"),
        Some("ABN checksum is invalid")
    );
    assert!(!shell.is_submitting());
    assert_eq!(shell.phase(), WizardPhase::Editing);
}

#[test]
fn blank_required_edit_to_an_earlier_step_is_a_validation_error() {
    let mut shell = clinic_on_last_step();
    shell
        .set_field("organisationDetails.legalName", "")
        .unwrap();

    let outcome = shell.next().unwrap();

    assert!(matches!(outcome, NextOutcome::Invalid(_)));
    assert_eq!(shell.state().current_step, 0);
    assert_eq!(
        shell.state().errors.get("legalName"),
        Some("Legal name is required")
    );
}

#[test]
fn valid_edit_to_an_earlier_step_still_submits() {
    let mut shell = clinic_on_last_step();
    shell
        .set_field("identifiers.hpio", "8003621234567892")
        .unwrap();

    let ticket = ticket_of(shell.next().unwrap());

    assert_eq!(ticket.request().body["hpio"], json!("8003621234567892"));
    assert_eq!(shell.state().current_step, 5);
}

#[test]
fn jumping_ahead_is_limited_to_clean_steps() {
    let mut shell = WizardShell::new(ClinicRegistration::new());
    let answers = clinic_answers();
    fill(&mut shell, &answers[0]);
    shell.next().unwrap();
    fill(&mut shell, &answers[1]);
    shell.next().unwrap();

    shell.go_to(0).unwrap();
    assert!(shell.go_to(2).is_ok());
    assert!(shell.go_to(4).is_err());

    shell.go_to(0).unwrap();
    shell
        .set_field("accreditation.certificateNumber", "AG-2290")
        .unwrap();
    assert!(shell.go_to(2).is_err());
    assert!(shell.go_to(1).is_ok());
}

#[test]
fn edit_mode_puts_to_the_record() {
    let initial = json!({
        "professional": { "specialty": "Paediatrics", "licenseNumber": "MED0009876543" },
        "placement": { "clinicId": 3, "userId": 9 }
    });
    let mut shell = WizardShell::edit(PractitionerRegistration::new(), "15", initial);

    assert_eq!(shell.next().unwrap(), NextOutcome::Advanced { to: 1 });
    let ticket = ticket_of(shell.next().unwrap());

    assert_eq!(ticket.request().method, HttpMethod::Put);
    assert_eq!(ticket.request().path, "/practitioners/15");
}

#[test]
fn consent_without_sharing_sends_null_third_party() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let mut shell = WizardShell::new(ConsentWizard::new(today));
    fill(
        &mut shell,
        &[
            ("scope.dataType", json!("vitals")),
            ("scope.purpose", json!("Remote monitoring")),
        ],
    );
    shell.next().unwrap();
    fill(
        &mut shell,
        &[
            ("sharing.shareWithThirdParty", json!(false)),
            ("sharing.thirdParty", json!("Ignored Pty Ltd")),
        ],
    );

    let ticket = ticket_of(shell.next().unwrap());

    assert_eq!(ticket.request().path, "/consent");
    assert_eq!(ticket.request().body["third_party"], json!(null));
    assert_eq!(ticket.request().body["expiry_date"], json!(null));
}

#[test]
fn edits_are_refused_while_submitting() {
    let mut shell = WizardShell::new(PractitionerRegistration::new());
    ready_to_submit(&mut shell, &practitioner_answers());
    ticket_of(shell.next().unwrap());

    assert!(shell.set_field("placement.userId", 41).is_err());
    assert_eq!(shell.field("placement.userId"), Some(&json!(40)));
}

proptest! {
    #[test]
    fn blank_required_field_always_errors(blank in "[ \t]{0,6}") {
        let mut shell = WizardShell::new(PractitionerRegistration::new());
        fill(&mut shell, &practitioner_answers()[0]);
        shell.set_field("professional.specialty", blank).unwrap();

        prop_assert!(matches!(shell.next().unwrap(), NextOutcome::Invalid(_)));
        prop_assert_eq!(shell.state().errors.get("specialty"), Some("Specialty is required"));
    }

    #[test]
    fn assembly_is_idempotent(
        specialty in "[A-Za-z][A-Za-z ]{0,40}",
        clinic in 1u64..100_000,
        user in 1u64..100_000,
    ) {
        let flow = PractitionerRegistration::new();
        let store = careportal::forms::FieldStore::from_value(json!({
            "professional": { "specialty": specialty, "licenseNumber": "NMW0001234567" },
            "placement": { "clinicId": clinic, "userId": user }
        }));

        let first = flow.assemble(&store).unwrap();
        let second = flow.assemble(&store).unwrap();
        prop_assert_eq!(first, second);
    }
}
