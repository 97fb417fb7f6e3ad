//! Contract implemented by concrete wizards.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::step::StepDefinition;
use super::store::FieldStore;
use super::validation::{validate_step, FieldErrors};
use crate::gateway::{HttpMethod, SubmitRequest};

/// Signals a validator defect: the assembler found data the validator should
/// have rejected.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("required field `{section}.{field}` is missing")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },
    #[error("section `{section}` cannot be read: {message}")]
    Section {
        section: &'static str,
        message: String,
    },
    #[error("field `{section}.{field}` is malformed: {message}")]
    InvalidField {
        section: &'static str,
        field: &'static str,
        message: String,
    },
}

/// Whether the wizard creates a new record or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardMode {
    Create,
    Edit { id: String },
}

/// High-level wizard contract.
///
/// Implementations describe their steps and turn the accumulated store into a
/// request payload once the last step is clean.
pub trait WizardFlow {
    type Payload: Serialize;

    fn name(&self) -> &'static str;

    /// Ordered step definitions; never empty.
    fn steps(&self) -> &[StepDefinition];

    /// Backend collection path, e.g. `/clinics/`.
    fn collection(&self) -> &'static str;

    /// Validates a single step. Out-of-range indices are clean.
    fn validate(&self, step_index: usize, store: &FieldStore) -> FieldErrors {
        self.steps()
            .get(step_index)
            .map(|step| validate_step(step, store))
            .unwrap_or_default()
    }

    /// Projects the store into the backend's request body.
    fn assemble(&self, store: &FieldStore) -> Result<Self::Payload, AssemblyError>;

    /// POST to the collection for creates, PUT to `<collection>/<id>` for edits.
    fn request(&self, mode: &WizardMode, body: Value) -> SubmitRequest {
        match mode {
            WizardMode::Create => SubmitRequest {
                method: HttpMethod::Post,
                path: self.collection().to_string(),
                body,
            },
            WizardMode::Edit { id } => SubmitRequest {
                method: HttpMethod::Put,
                path: format!("{}/{}", self.collection().trim_end_matches('/'), id),
                body,
            },
        }
    }
}

/// Reads one step's section into its typed schema.
pub fn read_section<T: DeserializeOwned>(
    store: &FieldStore,
    section: &'static str,
) -> Result<T, AssemblyError> {
    let value = store
        .section(section)
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value).map_err(|err| AssemblyError::Section {
        section,
        message: err.to_string(),
    })
}

/// Trims a required text value, failing on blank input.
pub fn required(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> Result<String, AssemblyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AssemblyError::MissingField { section, field })
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trims an optional text value; blank becomes `None`.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
