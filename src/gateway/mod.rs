//! Remote gateway: the single network call a wizard makes on completion.
//!
//! The shell depends on the [`RemoteGateway`] trait only; [`HttpGateway`]
//! talks to the portal API and [`MemoryGateway`] replays scripted responses.

mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::MemoryGateway;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::forms::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Post => f.write_str("POST"),
            HttpMethod::Put => f.write_str("PUT"),
        }
    }
}

/// One create/update call. `path` is relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Value,
}

/// The record the backend created or updated.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResource {
    pub status: u16,
    pub body: Value,
}

impl RemoteResource {
    pub fn id(&self) -> Option<String> {
        match self.body.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Why a submission did not go through.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitFailure {
    /// The backend refused the data and said which fields were wrong.
    #[error("submission rejected with status {status}")]
    Rejected {
        status: u16,
        field_errors: FieldErrors,
        message: Option<String>,
    },
    /// Network trouble or a server-side error; the user may retry.
    #[error("temporary failure: {message}")]
    Transient { status: Option<u16>, message: String },
    #[error("unexpected failure: {message}")]
    Unknown { status: Option<u16>, message: String },
}

impl SubmitFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitFailure::Transient { .. })
    }
}

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Issues the request. `request_id` is forwarded for tracing and
    /// idempotency on the server side.
    async fn submit(
        &self,
        request: &SubmitRequest,
        request_id: Uuid,
    ) -> Result<RemoteResource, SubmitFailure>;
}

/// Maps an HTTP status and decoded JSON body onto the submission outcome.
pub fn classify_response(status: u16, body: &Value) -> Result<RemoteResource, SubmitFailure> {
    match status {
        200..=299 => Ok(RemoteResource {
            status,
            body: body.clone(),
        }),
        408 | 429 | 500..=599 => Err(SubmitFailure::Transient {
            status: Some(status),
            message: detail_message(body)
                .unwrap_or_else(|| "The service is temporarily unavailable".to_string()),
        }),
        400..=499 => {
            let field_errors = extract_field_errors(body);
            if field_errors.is_empty() {
                Err(SubmitFailure::Unknown {
                    status: Some(status),
                    message: detail_message(body).unwrap_or_else(|| {
                        format!("The request was not accepted (status {})", status)
                    }),
                })
            } else {
                Err(SubmitFailure::Rejected {
                    status,
                    field_errors,
                    message: detail_message(body),
                })
            }
        }
        _ => Err(SubmitFailure::Unknown {
            status: Some(status),
            message: format!("Unexpected response status {}", status),
        }),
    }
}

/// Reads per-field messages from `{"errors": {...}}` or FastAPI's
/// `{"detail": [{"loc": [...], "msg": "..."}]}` shape.
pub fn extract_field_errors(body: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if let Some(map) = body.get("errors").and_then(Value::as_object) {
        for (field, message) in map {
            let text = match message {
                Value::String(text) => text.clone(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; "),
                other => other.to_string(),
            };
            errors.insert(field.clone(), text);
        }
    }

    if let Some(items) = body.get("detail").and_then(Value::as_array) {
        for item in items {
            let field = item
                .get("loc")
                .and_then(Value::as_array)
                .and_then(|loc| loc.last())
                .and_then(Value::as_str);
            let message = item.get("msg").and_then(Value::as_str);
            if let (Some(field), Some(message)) = (field, message) {
                errors.insert(field, message);
            }
        }
    }

    errors
}

fn detail_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("detail").and_then(Value::as_str))
        .map(str::to_string)
}
