//! Drives a [`WizardShell`] from an interactive front end until it completes,
//! fails or is cancelled.

use tracing::debug;

use super::interaction::{ConfirmationResponse, PromptContext, PromptResponse, StepInteraction};
use super::output;
use super::CliError;
use crate::forms::{NextOutcome, Progress, Resolution, WizardFlow, WizardShell};
use crate::gateway::{RemoteGateway, RemoteResource};

#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    Completed(RemoteResource),
    Cancelled,
    Failed(String),
}

enum StepInput {
    Done,
    Back,
    Cancel,
}

pub async fn run_wizard<F, G, I>(
    shell: &mut WizardShell<F>,
    gateway: &G,
    ui: &mut I,
) -> Result<WizardOutcome, CliError>
where
    F: WizardFlow,
    G: RemoteGateway + ?Sized,
    I: StepInteraction,
{
    let mut resubmit = false;
    loop {
        if !resubmit {
            match collect_step(shell, ui)? {
                StepInput::Done => {}
                StepInput::Back => {
                    shell.back();
                    continue;
                }
                StepInput::Cancel => {
                    shell.cancel();
                    return Ok(WizardOutcome::Cancelled);
                }
            }

            if shell.render().is_last {
                match ui.confirm(&shell.summary())? {
                    ConfirmationResponse::Submit => {}
                    ConfirmationResponse::Back => continue,
                    ConfirmationResponse::Cancel => {
                        shell.cancel();
                        return Ok(WizardOutcome::Cancelled);
                    }
                }
            }
        }
        resubmit = false;

        match shell.next_with(gateway).await? {
            Progress::Navigation(NextOutcome::Advanced { to }) => {
                debug!(step = to, "advanced");
            }
            Progress::Navigation(NextOutcome::Invalid(errors)) => {
                output::warning(format!("{} field(s) need attention", errors.len()));
            }
            Progress::Navigation(NextOutcome::Submit(_)) | Progress::Navigation(NextOutcome::Busy) => {}
            Progress::Navigation(NextOutcome::Closed) | Progress::Submission(Resolution::Ignored) => {
                return Ok(WizardOutcome::Cancelled);
            }
            Progress::Submission(Resolution::Completed(resource)) => {
                return Ok(WizardOutcome::Completed(resource));
            }
            Progress::Submission(Resolution::Rejected(errors)) => {
                output::warning(format!(
                    "The portal rejected {} answer(s); please review them",
                    errors.len()
                ));
                if let Some(banner) = shell.state().banner.as_ref() {
                    output::banner(banner);
                }
            }
            Progress::Submission(Resolution::Failed(banner)) => {
                if banner.retryable && ui.retry(&banner)? {
                    shell.dismiss_banner();
                    resubmit = true;
                } else {
                    return Ok(WizardOutcome::Failed(banner.message));
                }
            }
        }
    }
}

fn collect_step<F, I>(shell: &mut WizardShell<F>, ui: &mut I) -> Result<StepInput, CliError>
where
    F: WizardFlow,
    I: StepInteraction,
{
    let field_count = {
        let view = shell.render();
        output::section(format!("Step {} of {}: {}", view.index + 1, view.total, view.title));
        if let Some(banner) = view.banner {
            output::banner(banner);
        }
        view.fields.len()
    };

    let mut position = 0;
    while position < field_count {
        let (path, response) = {
            let view = shell.render();
            let field = &view.fields[position];
            let context = PromptContext {
                field,
                step_title: view.title,
                step_index: view.index,
                step_total: view.total,
            };
            (field.path.to_string(), ui.prompt_field(&context)?)
        };

        match response {
            PromptResponse::Value(value) => shell.set_field(&path, value)?,
            PromptResponse::Clear => shell.clear_field(&path)?,
            PromptResponse::Keep => {}
            PromptResponse::Back if position == 0 => return Ok(StepInput::Back),
            PromptResponse::Back => {
                position -= 1;
                continue;
            }
            PromptResponse::Cancel => return Ok(StepInput::Cancel),
        }
        position += 1;
    }
    Ok(StepInput::Done)
}
