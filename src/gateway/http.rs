use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::{classify_response, HttpMethod, RemoteGateway, RemoteResource, SubmitFailure, SubmitRequest};
use crate::config::Config;
use crate::errors::GatewayError;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Gateway backed by the portal's REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let cleaned = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(cleaned)
            .map_err(|err| GatewayError::Url(format!("`{}`: {}", cleaned, err)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::Url(format!(
                "URL must use http or https scheme, got: {}",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        info!(base_url = cleaned, "portal gateway ready");
        Ok(Self {
            client,
            base_url: cleaned.to_string(),
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(
            &config.api_base_url,
            config.auth_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn submit(
        &self,
        request: &SubmitRequest,
        request_id: Uuid,
    ) -> Result<RemoteResource, SubmitFailure> {
        let url = self.endpoint(&request.path);
        debug!(method = %request.method, %url, %request_id, "sending submission");

        let builder = match request.method {
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
        };
        let mut builder = builder
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(&request.body);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(transport_failure)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_failure)?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(body) => body,
                Err(err) if (200..300).contains(&status) => {
                    return Err(SubmitFailure::Unknown {
                        status: Some(status),
                        message: format!("Response body is not JSON: {}", err),
                    });
                }
                Err(_) => Value::Null,
            }
        };

        classify_response(status, &body)
    }
}

fn transport_failure(err: reqwest::Error) -> SubmitFailure {
    let status = err.status().map(|status| status.as_u16());
    if err.is_timeout() || err.is_connect() || err.is_request() {
        SubmitFailure::Transient {
            status,
            message: format!("Could not reach the portal: {}", err),
        }
    } else {
        SubmitFailure::Unknown {
            status,
            message: err.to_string(),
        }
    }
}
