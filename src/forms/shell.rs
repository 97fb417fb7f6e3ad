//! Wizard shell: owns [`WizardState`] and drives a [`WizardFlow`].
//!
//! The shell is synchronous. Reaching the end of the last clean step hands
//! out a [`SubmissionTicket`]; the host sends it through a gateway and feeds
//! the outcome back with [`WizardShell::resolve`]. Only the pending ticket is
//! honoured, so duplicate submissions, user cancels and teardown all fall out
//! of the same check. [`WizardShell::next_with`] wraps that loop for hosts
//! that just want to await the gateway.

use std::fmt;

use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::field::FieldDescriptor;
use super::flow::{WizardFlow, WizardMode};
use super::path::FieldPath;
use super::step::{Advance, StepController, StepDefinition};
use super::store::FieldStore;
use super::validation::FieldErrors;
use crate::errors::WizardError;
use crate::gateway::{RemoteGateway, RemoteResource, SubmitFailure, SubmitRequest};

const GENERIC_FAILURE: &str =
    "The submission could not be completed. Your answers are kept; please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Editing,
    Submitting,
    Submitted,
    Cancelled,
    TornDown,
}

impl fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WizardPhase::Editing => "editing",
            WizardPhase::Submitting => "submitting",
            WizardPhase::Submitted => "submitted",
            WizardPhase::Cancelled => "cancelled",
            WizardPhase::TornDown => "torn down",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// Network or server trouble; the user may retry.
    Transient,
    /// The backend rejected data it did not attribute to a visible field.
    Rejected,
    /// Anything else; shown with a generic message.
    Failure,
    Notice,
}

/// Dismissible message shown above the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone)]
pub struct WizardState {
    pub current_step: usize,
    pub fields: FieldStore,
    pub errors: FieldErrors,
    pub submitting: bool,
    pub banner: Option<Banner>,
    pub phase: WizardPhase,
}

/// A submission the host must send and then resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionTicket {
    id: Uuid,
    request: SubmitRequest,
}

impl SubmissionTicket {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &SubmitRequest {
        &self.request
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    Advanced { to: usize },
    Invalid(FieldErrors),
    Submit(SubmissionTicket),
    /// A submission is already in flight; nothing was issued.
    Busy,
    /// The wizard finished, was cancelled or torn down.
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Completed(RemoteResource),
    Rejected(FieldErrors),
    Failed(Banner),
    /// The ticket is stale (cancelled, torn down or superseded).
    Ignored,
}

/// What [`WizardShell::next_with`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Navigation(NextOutcome),
    Submission(Resolution),
}

/// Read-only projection of the current step for rendering.
#[derive(Debug)]
pub struct StepView<'a> {
    pub index: usize,
    pub total: usize,
    pub title: &'a str,
    pub fields: Vec<FieldView<'a>>,
    pub banner: Option<&'a Banner>,
    pub submitting: bool,
    pub is_last: bool,
}

#[derive(Debug)]
pub struct FieldView<'a> {
    pub descriptor: &'a FieldDescriptor,
    pub path: FieldPath,
    pub value: Option<&'a Value>,
    pub error: Option<&'a str>,
}

type CompleteCallback = Box<dyn FnMut(&RemoteResource) + Send>;
type CancelCallback = Box<dyn FnMut() + Send>;

pub struct WizardShell<F: WizardFlow> {
    flow: F,
    mode: WizardMode,
    controller: StepController,
    state: WizardState,
    pending: Option<Uuid>,
    on_complete: Option<CompleteCallback>,
    on_cancel: Option<CancelCallback>,
}

impl<F: WizardFlow> WizardShell<F> {
    pub fn new(flow: F) -> Self {
        Self::build(flow, WizardMode::Create, FieldStore::new())
    }

    /// Edit flow: the store starts from `initial` and completion issues a PUT.
    pub fn edit(flow: F, id: impl Into<String>, initial: Value) -> Self {
        Self::build(
            flow,
            WizardMode::Edit { id: id.into() },
            FieldStore::from_value(initial),
        )
    }

    fn build(flow: F, mode: WizardMode, fields: FieldStore) -> Self {
        let controller = StepController::new(flow.steps().len());
        debug!(wizard = flow.name(), steps = controller.len(), "wizard mounted");
        Self {
            flow,
            mode,
            controller,
            state: WizardState {
                current_step: 0,
                fields,
                errors: FieldErrors::new(),
                submitting: false,
                banner: None,
                phase: WizardPhase::Editing,
            },
            pending: None,
            on_complete: None,
            on_cancel: None,
        }
    }

    pub fn on_complete<C>(mut self, callback: C) -> Self
    where
        C: FnMut(&RemoteResource) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn on_cancel<C>(mut self, callback: C) -> Self
    where
        C: FnMut() + Send + 'static,
    {
        self.on_cancel = Some(Box::new(callback));
        self
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    pub fn mode(&self) -> &WizardMode {
        &self.mode
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn phase(&self) -> WizardPhase {
        self.state.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.state.submitting
    }

    pub fn current_step(&self) -> &StepDefinition {
        &self.flow.steps()[self.controller.index()]
    }

    pub fn field(&self, path: &str) -> Option<&Value> {
        FieldPath::parse(path)
            .ok()
            .and_then(|path| self.state.fields.get(&path))
    }

    /// Single write path for user input. Clears the edited field's error and
    /// the clean status of its step.
    pub fn set_field(&mut self, path: &str, value: impl Into<Value>) -> Result<(), WizardError> {
        self.ensure_editing()?;
        let path = FieldPath::parse(path)?;
        self.state.fields.set(&path, value.into());
        self.after_edit(&path);
        Ok(())
    }

    pub fn clear_field(&mut self, path: &str) -> Result<(), WizardError> {
        self.ensure_editing()?;
        let path = FieldPath::parse(path)?;
        self.state.fields.remove(&path);
        self.after_edit(&path);
        Ok(())
    }

    fn after_edit(&mut self, path: &FieldPath) {
        if let Some(owner) = self.owning_step(path) {
            self.state.errors.remove(path.leaf());
            self.controller.invalidate_from(owner);
        }
    }

    fn owning_step(&self, path: &FieldPath) -> Option<usize> {
        self.flow.steps().iter().position(|step| step.owns(path))
    }

    /// Validates the current step and advances, or on the last step starts a
    /// submission.
    pub fn next(&mut self) -> Result<NextOutcome, WizardError> {
        match self.state.phase {
            WizardPhase::Editing => {}
            WizardPhase::Submitting => {
                debug!(wizard = self.flow.name(), "submission already in flight");
                return Ok(NextOutcome::Busy);
            }
            _ => return Ok(NextOutcome::Closed),
        }

        let errors = self
            .flow
            .validate(self.controller.index(), &self.state.fields);
        self.state.errors = errors.clone();

        match self.controller.next(errors) {
            Advance::Blocked(errors) => Ok(NextOutcome::Invalid(errors)),
            Advance::Moved { to } => {
                self.sync_step();
                Ok(NextOutcome::Advanced { to })
            }
            Advance::AtLastStep => self.begin_submission(),
            Advance::Unverified { from } => self.revalidate_from(from),
        }
    }

    /// Re-checks steps edited after they validated. Stops on the first step
    /// with errors and moves there; submits when all of them are clean.
    fn revalidate_from(&mut self, from: usize) -> Result<NextOutcome, WizardError> {
        for index in from..self.controller.len() {
            let errors = self.flow.validate(index, &self.state.fields);
            if !errors.is_empty() {
                debug!(
                    wizard = self.flow.name(),
                    step = index,
                    errors = errors.len(),
                    "edited step no longer validates"
                );
                self.controller.rewind_to(index);
                self.sync_step();
                self.state.errors = errors.clone();
                return Ok(NextOutcome::Invalid(errors));
            }
            self.controller.mark_clean(index);
        }
        self.begin_submission()
    }

    /// User-triggered resubmission after a transient failure.
    pub fn retry(&mut self) -> Result<NextOutcome, WizardError> {
        if self
            .state
            .banner
            .as_ref()
            .map_or(false, |banner| banner.retryable)
        {
            self.state.banner = None;
        }
        self.next()
    }

    pub fn back(&mut self) -> bool {
        if self.state.phase != WizardPhase::Editing {
            return false;
        }
        let moved = self.controller.back();
        self.sync_step();
        moved
    }

    pub fn go_to(&mut self, index: usize) -> Result<(), WizardError> {
        self.ensure_editing()?;
        self.controller.go_to(index)?;
        self.sync_step();
        Ok(())
    }

    fn begin_submission(&mut self) -> Result<NextOutcome, WizardError> {
        let payload = self.flow.assemble(&self.state.fields).map_err(|err| {
            error!(wizard = self.flow.name(), error = %err, "assembler found data the validator accepted");
            err
        })?;
        let body = serde_json::to_value(&payload)?;
        let request = self.flow.request(&self.mode, body);
        let id = Uuid::new_v4();

        self.pending = Some(id);
        self.state.submitting = true;
        self.state.phase = WizardPhase::Submitting;
        self.state.banner = None;
        info!(
            wizard = self.flow.name(),
            method = %request.method,
            path = %request.path,
            ticket = %id,
            "submission started"
        );
        Ok(NextOutcome::Submit(SubmissionTicket { id, request }))
    }

    /// Applies the gateway outcome for `ticket`.
    pub fn resolve(
        &mut self,
        ticket: Uuid,
        outcome: Result<RemoteResource, SubmitFailure>,
    ) -> Resolution {
        if self.state.phase == WizardPhase::TornDown || self.pending != Some(ticket) {
            debug!(wizard = self.flow.name(), %ticket, "ignoring stale submission result");
            return Resolution::Ignored;
        }
        self.pending = None;
        self.state.submitting = false;

        match outcome {
            Ok(resource) => {
                self.state.phase = WizardPhase::Submitted;
                self.state.errors.clear();
                info!(wizard = self.flow.name(), id = ?resource.id(), "submission completed");
                if let Some(callback) = self.on_complete.as_mut() {
                    callback(&resource);
                }
                Resolution::Completed(resource)
            }
            Err(SubmitFailure::Rejected {
                status,
                field_errors,
                message,
            }) => {
                self.state.phase = WizardPhase::Editing;
                warn!(
                    wizard = self.flow.name(),
                    status,
                    fields = field_errors.len(),
                    "submission rejected"
                );
                self.apply_rejection(field_errors, message);
                Resolution::Rejected(self.state.errors.clone())
            }
            Err(SubmitFailure::Transient { status, message }) => {
                self.state.phase = WizardPhase::Editing;
                warn!(wizard = self.flow.name(), ?status, %message, "transient submission failure");
                let banner = Banner {
                    kind: BannerKind::Transient,
                    message,
                    retryable: true,
                };
                self.state.banner = Some(banner.clone());
                Resolution::Failed(banner)
            }
            Err(SubmitFailure::Unknown { status, message }) => {
                self.state.phase = WizardPhase::Editing;
                warn!(wizard = self.flow.name(), ?status, %message, "submission failed");
                let banner = Banner {
                    kind: BannerKind::Failure,
                    message: GENERIC_FAILURE.to_string(),
                    retryable: false,
                };
                self.state.banner = Some(banner.clone());
                Resolution::Failed(banner)
            }
        }
    }

    /// Maps server-reported errors onto fields via their remote keys and
    /// moves back to the first affected step. Field values are untouched.
    fn apply_rejection(&mut self, field_errors: FieldErrors, message: Option<String>) {
        let mut first_step: Option<usize> = None;
        let mut unmatched = Vec::new();

        for (key, text) in field_errors.iter() {
            let located = self.flow.steps().iter().enumerate().find_map(|(index, step)| {
                step.fields
                    .iter()
                    .find(|field| field.remote_key == key || field.name == key)
                    .map(|field| (index, field.name))
            });
            match located {
                Some((index, name)) => {
                    self.state.errors.insert(name, text);
                    first_step = Some(first_step.map_or(index, |current| current.min(index)));
                }
                None => unmatched.push(format!("{}: {}", key, text)),
            }
        }

        if let Some(step) = first_step {
            self.controller.invalidate_from(step);
            self.controller.rewind_to(step);
            self.sync_step();
        }

        let mut lines: Vec<String> = message.into_iter().collect();
        lines.extend(unmatched);
        if !lines.is_empty() {
            self.state.banner = Some(Banner {
                kind: BannerKind::Rejected,
                message: lines.join("\n"),
                retryable: false,
            });
        }
    }

    /// User-visible cancel of an in-flight submission. The pending ticket is
    /// dropped, so its eventual result is ignored.
    pub fn cancel_submission(&mut self) -> bool {
        if self.state.phase != WizardPhase::Submitting {
            return false;
        }
        info!(wizard = self.flow.name(), "submission cancelled by user");
        self.pending = None;
        self.state.submitting = false;
        self.state.phase = WizardPhase::Editing;
        self.state.banner = Some(Banner {
            kind: BannerKind::Notice,
            message: "Submission cancelled. Your answers are kept.".into(),
            retryable: false,
        });
        true
    }

    /// Abandons the wizard and notifies the host.
    pub fn cancel(&mut self) -> bool {
        if matches!(
            self.state.phase,
            WizardPhase::Submitted | WizardPhase::Cancelled | WizardPhase::TornDown
        ) {
            return false;
        }
        self.pending = None;
        self.state.submitting = false;
        self.state.phase = WizardPhase::Cancelled;
        debug!(wizard = self.flow.name(), "wizard cancelled");
        if let Some(callback) = self.on_cancel.as_mut() {
            callback();
        }
        true
    }

    /// The host view is going away; later results are dropped silently.
    pub fn teardown(&mut self) {
        self.pending = None;
        self.state.submitting = false;
        self.state.phase = WizardPhase::TornDown;
        debug!(wizard = self.flow.name(), "wizard torn down");
    }

    pub fn dismiss_banner(&mut self) {
        self.state.banner = None;
    }

    /// Runs [`next`](Self::next) and, when it yields a ticket, awaits the
    /// gateway and resolves the result.
    pub async fn next_with<G>(&mut self, gateway: &G) -> Result<Progress, WizardError>
    where
        G: RemoteGateway + ?Sized,
    {
        match self.next()? {
            NextOutcome::Submit(ticket) => {
                let outcome = gateway.submit(ticket.request(), ticket.id()).await;
                Ok(Progress::Submission(self.resolve(ticket.id(), outcome)))
            }
            other => Ok(Progress::Navigation(other)),
        }
    }

    pub fn render(&self) -> StepView<'_> {
        let step = self.current_step();
        let fields = step
            .fields
            .iter()
            .map(|descriptor| {
                let path = step.path_of(descriptor);
                FieldView {
                    value: self.state.fields.get(&path),
                    error: self.state.errors.get(descriptor.name),
                    descriptor,
                    path,
                }
            })
            .collect();

        StepView {
            index: self.controller.index(),
            total: self.controller.len(),
            title: step.title,
            fields,
            banner: self.state.banner.as_ref(),
            submitting: self.state.submitting,
            is_last: self.controller.is_last(),
        }
    }

    /// Label/value pairs for every field across all steps, for a review page.
    pub fn summary(&self) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        for step in self.flow.steps() {
            for field in &step.fields {
                let value = self
                    .state
                    .fields
                    .get(&step.path_of(field))
                    .map(display_value)
                    .unwrap_or_else(|| "[unfilled]".to_string());
                entries.push((field.label.to_string(), value));
            }
        }
        entries
    }

    fn ensure_editing(&self) -> Result<(), WizardError> {
        if self.state.phase == WizardPhase::Editing {
            Ok(())
        } else {
            Err(WizardError::NotEditable(self.state.phase))
        }
    }

    fn sync_step(&mut self) {
        self.state.current_step = self.controller.index();
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) if text.trim().is_empty() => "[unfilled]".to_string(),
        Value::String(text) => text.clone(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Null => "[unfilled]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::field::FieldDescriptor;
    use crate::forms::flow::{read_section, required, AssemblyError};
    use crate::gateway::HttpMethod;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct TestFlow {
        steps: Vec<StepDefinition>,
    }

    #[derive(Deserialize)]
    struct One {
        name: String,
    }

    #[derive(Deserialize)]
    struct Two {
        code: String,
    }

    #[derive(Serialize)]
    struct Payload {
        display_name: String,
        code: String,
    }

    impl TestFlow {
        fn new() -> Self {
            Self {
                steps: vec![
                    StepDefinition::new(
                        "one",
                        "Step one",
                        "one",
                        vec![FieldDescriptor::text("name", "Name").with_remote_key("display_name")],
                    ),
                    StepDefinition::new(
                        "two",
                        "Step two",
                        "two",
                        vec![FieldDescriptor::text("code", "Code")],
                    ),
                ],
            }
        }
    }

    impl WizardFlow for TestFlow {
        type Payload = Payload;

        fn name(&self) -> &'static str {
            "test"
        }

        fn steps(&self) -> &[StepDefinition] {
            &self.steps
        }

        fn collection(&self) -> &'static str {
            "/things/"
        }

        fn assemble(&self, store: &FieldStore) -> Result<Payload, AssemblyError> {
            let one: One = read_section(store, "one")?;
            let two: Two = read_section(store, "two")?;
            Ok(Payload {
                display_name: required("one", "name", &one.name)?,
                code: required("two", "code", &two.code)?,
            })
        }
    }

    fn filled_shell() -> WizardShell<TestFlow> {
        let mut shell = WizardShell::new(TestFlow::new());
        shell.set_field("one.name", "Ada").unwrap();
        shell.set_field("two.code", "X1").unwrap();
        shell
    }

    fn ticket_of(outcome: NextOutcome) -> SubmissionTicket {
        match outcome {
            NextOutcome::Submit(ticket) => ticket,
            other => panic!("expected a ticket, got {:?}", other),
        }
    }

    #[test]
    fn edit_clears_the_field_error() {
        let mut shell = WizardShell::new(TestFlow::new());
        assert!(matches!(shell.next().unwrap(), NextOutcome::Invalid(_)));
        assert_eq!(shell.state().errors.get("name"), Some("Name is required"));

        shell.set_field("one.name", "Ada").unwrap();
        assert!(shell.state().errors.get("name").is_none());
    }

    #[test]
    fn last_step_issues_a_post_ticket() {
        let mut shell = filled_shell();
        assert_eq!(shell.next().unwrap(), NextOutcome::Advanced { to: 1 });
        let ticket = ticket_of(shell.next().unwrap());

        assert_eq!(ticket.request().method, HttpMethod::Post);
        assert_eq!(ticket.request().path, "/things/");
        assert_eq!(
            ticket.request().body,
            json!({ "display_name": "Ada", "code": "X1" })
        );
        assert!(shell.is_submitting());
        assert_eq!(shell.next().unwrap(), NextOutcome::Busy);
    }

    #[test]
    fn edit_mode_issues_put() {
        let mut shell = WizardShell::edit(
            TestFlow::new(),
            "17",
            json!({ "one": { "name": "Ada" }, "two": { "code": "X1" } }),
        );
        shell.next().unwrap();
        let ticket = ticket_of(shell.next().unwrap());
        assert_eq!(ticket.request().method, HttpMethod::Put);
        assert_eq!(ticket.request().path, "/things/17");
    }

    #[test]
    fn rejection_maps_remote_keys_and_rewinds() {
        let mut shell = filled_shell();
        shell.next().unwrap();
        let ticket = ticket_of(shell.next().unwrap());

        let resolution = shell.resolve(
            ticket.id(),
            Err(SubmitFailure::Rejected {
                status: 422,
                field_errors: [("display_name", "already taken"), ("owner", "unknown")]
                    .into_iter()
                    .collect(),
                message: None,
            }),
        );

        assert!(matches!(resolution, Resolution::Rejected(_)));
        assert_eq!(shell.state().errors.get("name"), Some("already taken"));
        assert_eq!(shell.state().current_step, 0);
        assert_eq!(shell.field("one.name"), Some(&json!("Ada")));
        let banner = shell.state().banner.clone().unwrap();
        assert_eq!(banner.kind, BannerKind::Rejected);
        assert!(banner.message.contains("owner: unknown"));
        assert!(shell.go_to(1).is_err());
    }

    #[test]
    fn callbacks_fire_once() {
        let completed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&completed);
        let mut shell = filled_shell().on_complete(move |resource| {
            sink.lock().unwrap().push(resource.id());
        });
        shell.next().unwrap();
        let ticket = ticket_of(shell.next().unwrap());
        let resource = RemoteResource {
            status: 201,
            body: json!({ "id": 3 }),
        };
        assert!(matches!(
            shell.resolve(ticket.id(), Ok(resource.clone())),
            Resolution::Completed(_)
        ));
        assert_eq!(shell.resolve(ticket.id(), Ok(resource)), Resolution::Ignored);
        assert_eq!(*completed.lock().unwrap(), vec![Some("3".to_string())]);
        assert_eq!(shell.phase(), WizardPhase::Submitted);
        assert_eq!(shell.next().unwrap(), NextOutcome::Closed);
    }

    #[test]
    fn cancel_notifies_host_and_blocks_edits() {
        let cancelled = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&cancelled);
        let mut shell = WizardShell::new(TestFlow::new()).on_cancel(move || {
            *counter.lock().unwrap() += 1;
        });
        assert!(shell.cancel());
        assert!(!shell.cancel());
        assert_eq!(*cancelled.lock().unwrap(), 1);
        assert!(matches!(
            shell.set_field("one.name", "late"),
            Err(WizardError::NotEditable(WizardPhase::Cancelled))
        ));
    }

    #[test]
    fn user_cancel_of_submission_drops_the_ticket() {
        let mut shell = filled_shell();
        shell.next().unwrap();
        let ticket = ticket_of(shell.next().unwrap());
        assert!(shell.cancel_submission());
        assert!(!shell.is_submitting());
        assert_eq!(
            shell.resolve(
                ticket.id(),
                Ok(RemoteResource {
                    status: 201,
                    body: json!({})
                })
            ),
            Resolution::Ignored
        );
        assert_eq!(shell.phase(), WizardPhase::Editing);
        let banner = shell.state().banner.clone().unwrap();
        assert_eq!(banner.kind, BannerKind::Notice);
        assert!(!banner.retryable);
    }

    #[test]
    fn summary_marks_unfilled_fields() {
        let mut shell = WizardShell::new(TestFlow::new());
        shell.set_field("one.name", "Ada").unwrap();
        assert_eq!(
            shell.summary(),
            vec![
                ("Name".to_string(), "Ada".to_string()),
                ("Code".to_string(), "[unfilled]".to_string()),
            ]
        );
    }
}
