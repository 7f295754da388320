//! HTTP utilities for provider REST API calls
//!
//! Both providers speak JSON over HTTPS with bearer tokens and report errors
//! as `{"error": {"code", "message", ...}}`. Responses are classified here:
//! throttling becomes [`ApiError::Throttled`], every other failure is fatal.

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Error reasons GCP uses on 403 responses that are really rate limits
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// Source of bearer tokens for API calls
#[async_trait]
pub trait AccessToken: Send + Sync {
    async fn token(&self) -> Result<String, ApiError>;
}

/// Fixed token, for pre-issued credentials and tests
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessToken for StaticToken {
    async fn token(&self) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }
}

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull `error.message` out of a provider error body
fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    error
        .get("message")
        .and_then(|v| v.as_str())
        .or_else(|| error.as_str())
        .map(|s| s.to_string())
}

/// Whether a GCP-style error body lists a rate-limit reason
fn has_rate_limit_reason(body: &Value) -> bool {
    let reasons = body
        .get("error")
        .and_then(|e| e.get("errors"))
        .and_then(|e| e.as_array());

    reasons.is_some_and(|errors| {
        errors.iter().any(|e| {
            e.get("reason")
                .and_then(|r| r.as_str())
                .is_some_and(|r| RATE_LIMIT_REASONS.contains(&r))
        })
    })
}

/// Map a non-success response to an [`ApiError`]
pub fn classify_status(status: StatusCode, body: &str) -> ApiError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = error_message(&parsed).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    let throttled = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && has_rate_limit_reason(&parsed));

    if throttled {
        ApiError::Throttled {
            status: status.as_u16(),
            message,
        }
    } else {
        ApiError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

/// HTTP client wrapper for provider API calls
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("cloudinv/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request with optional query parameters
    pub async fn get(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        Self::read_json(response).await
    }

    /// POST a form body (token endpoints)
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value, ApiError> {
        tracing::debug!("POST {}", url);

        let response = self.client.post(url).form(form).send().await?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(classify_status(status, &body));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}
