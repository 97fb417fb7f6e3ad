use thiserror::Error;

use crate::forms::flow::AssemblyError;
use crate::forms::path::FieldPathError;
use crate::forms::shell::WizardPhase;
use crate::forms::step::NavigationError;

/// Error type for wizard operations that cannot be expressed as ordinary
/// validation outcomes.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Invalid field path: {0}")]
    FieldPath(#[from] FieldPathError),
    #[error("Navigation refused: {0}")]
    Navigation(#[from] NavigationError),
    #[error("Payload assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("Wizard is not accepting edits while {0}")]
    NotEditable(WizardPhase),
    #[error("Payload serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failures raised while constructing a remote gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid URL: {0}")]
    Url(String),
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failures reading or writing the CLI configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration directory available on this platform")]
    NoConfigDir,
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid configuration value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}
