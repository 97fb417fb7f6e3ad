//! Terminal front end for the care portal wizards.

pub mod interaction;
pub mod output;
pub mod runner;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, ConfigManager};
use crate::errors::{ConfigError, GatewayError, WizardError};
use crate::forms::{WizardFlow, WizardShell};
use crate::gateway::{HttpGateway, MemoryGateway, RemoteGateway};
use crate::registration::{ClinicRegistration, ConsentWizard, PractitionerRegistration};
use crate::utils::build_info;

pub use interaction::{
    ConfirmationResponse, PromptContext, PromptResponse, StepInteraction, TerminalInteraction,
};
pub use runner::{run_wizard, WizardOutcome};

const USAGE: &str = "\
Usage: careportal_cli <wizard> [options]

Wizards:
  clinic         Register a clinic (six steps)
  practitioner   Register a practitioner against a clinic
  consent        Record a data-sharing consent

Options:
  --offline        Submit to an in-memory portal instead of the API
  --api-url <URL>  Override the configured API base URL
  --plain          Disable colours
  --version        Print build information
  --help           Print this message

Inside a prompt, type :back, :clear or :cancel.";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0} (run with --help for usage)")]
    Usage(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardKind {
    Clinic,
    Practitioner,
    Consent,
}

impl std::str::FromStr for WizardKind {
    type Err = CliError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "clinic" => Ok(WizardKind::Clinic),
            "practitioner" => Ok(WizardKind::Practitioner),
            "consent" => Ok(WizardKind::Consent),
            other => Err(CliError::Usage(format!("Unknown wizard `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub wizard: WizardKind,
    pub offline: bool,
    pub api_url: Option<String>,
    pub plain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(CliOptions),
    Help,
    Version,
}

pub fn parse_args<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut wizard = None;
    let mut offline = false;
    let mut api_url = None;
    let mut plain = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--offline" => offline = true,
            "--plain" => plain = true,
            "--api-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| CliError::Usage("--api-url needs a value".into()))?;
                api_url = Some(url);
            }
            flag if flag.starts_with('-') => {
                return Err(CliError::Usage(format!("Unknown option `{flag}`")));
            }
            name if wizard.is_none() => wizard = Some(name.parse()?),
            extra => return Err(CliError::Usage(format!("Unexpected argument `{extra}`"))),
        }
    }

    let wizard = wizard.ok_or_else(|| CliError::Usage("Missing wizard name".into()))?;
    Ok(Command::Run(CliOptions {
        wizard,
        offline,
        api_url,
        plain,
    }))
}

/// Entry point used by the `careportal_cli` binary; `args` excludes the
/// program name.
pub async fn run_cli<I>(args: I) -> Result<(), CliError>
where
    I: IntoIterator<Item = String>,
{
    let options = match parse_args(args)? {
        Command::Help => {
            println!("{USAGE}");
            return Ok(());
        }
        Command::Version => {
            println!("{}", build_info::current());
            return Ok(());
        }
        Command::Run(options) => options,
    };

    let config = load_config(&options)?;
    output::set_preferences(output::OutputPreferences {
        plain: config.plain_output,
    });

    let gateway: Box<dyn RemoteGateway> = if options.offline {
        info!("using in-memory portal");
        Box::new(MemoryGateway::new())
    } else {
        info!(api = %config.api_base_url, "using portal API");
        Box::new(HttpGateway::from_config(&config)?)
    };

    let outcome = match options.wizard {
        WizardKind::Clinic => drive(ClinicRegistration::new(), &*gateway).await?,
        WizardKind::Practitioner => drive(PractitionerRegistration::new(), &*gateway).await?,
        WizardKind::Consent => {
            let today = chrono::Local::now().date_naive();
            drive(ConsentWizard::new(today), &*gateway).await?
        }
    };

    match outcome {
        WizardOutcome::Completed(resource) => {
            match resource.id() {
                Some(id) => output::success(format!("Submitted. Reference: {id}")),
                None => output::success("Submitted."),
            }
            Ok(())
        }
        WizardOutcome::Cancelled => {
            output::info("Wizard cancelled. Nothing was submitted.");
            Ok(())
        }
        WizardOutcome::Failed(message) => {
            output::error(format!("Submission failed: {message}"));
            Ok(())
        }
    }
}

/// Stored config plus environment and flag overrides. A platform without a
/// config directory falls back to defaults; invalid values are an error.
fn load_config(options: &CliOptions) -> Result<Config, CliError> {
    let stored = match ConfigManager::new() {
        Ok(manager) => manager.load()?,
        Err(err) => {
            warn!(error = %err, "falling back to default configuration");
            Config::default()
        }
    };
    let mut config = stored
        .with_env_overrides()
        .with_overrides(options.api_url.clone(), None);
    config.validate()?;
    if options.plain {
        config.plain_output = true;
    }
    Ok(config)
}

async fn drive<F: WizardFlow>(
    flow: F,
    gateway: &dyn RemoteGateway,
) -> Result<WizardOutcome, CliError> {
    let mut shell = WizardShell::new(flow);
    let mut ui = TerminalInteraction::new();
    run_wizard(&mut shell, gateway, &mut ui).await
}
