use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{EmbeddingInvoker, InvokeOutcome};
use crate::config::FunctionsConfig;
use crate::error::WorkerError;
use crate::models::EntityType;
use crate::payload::EmbeddingRequest;

const MAX_ERROR_BODY: usize = 1024;

/// Calls the hosted embedding functions over HTTP.
pub struct FunctionInvoker {
    client: reqwest::Client,
    config: FunctionsConfig,
}

impl FunctionInvoker {
    pub fn new(config: FunctionsConfig, timeout: Duration) -> Result<Self, WorkerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| WorkerError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn url_for(&self, entity_type: EntityType) -> String {
        let function = match entity_type {
            EntityType::Candidate => &self.config.candidate_function,
            EntityType::JobPosting => &self.config.job_function,
        };
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), function)
    }
}

#[async_trait]
impl EmbeddingInvoker for FunctionInvoker {
    async fn invoke(&self, request: &EmbeddingRequest) -> InvokeOutcome {
        let url = self.url_for(request.entity_type());

        let resp = match self
            .client
            .post(&url)
            .bearer_auth(&self.config.service_key)
            .json(request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return InvokeOutcome::failure(format!("Request to {url} failed: {e}")),
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                return InvokeOutcome::failure(format!(
                    "Reading response from {url} failed (HTTP {}): {e}",
                    status.as_u16()
                ));
            }
        };

        if !status.is_success() {
            return InvokeOutcome::failure(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&body)
            ));
        }

        interpret_body(&body)
    }
}

/// Only the stored error text is bounded; decisions are made on the full body.
fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY).collect()
}

/// A 2xx can still carry an application-level failure: `{"success": false}` or a
/// non-null `error`.
fn interpret_body(body: &str) -> InvokeOutcome {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return InvokeOutcome::success(),
    };

    let error = match value.get("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    match (value.get("success").and_then(Value::as_bool), error) {
        (Some(false), error) => InvokeOutcome::failure(
            error
                .map(|e| truncate(&e))
                .unwrap_or_else(|| "Embedding function reported failure".to_string()),
        ),
        (_, Some(error)) => InvokeOutcome::failure(truncate(&error)),
        _ => InvokeOutcome::success(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_plain_bodies_are_success() {
        assert_eq!(interpret_body(""), InvokeOutcome::success());
        assert_eq!(interpret_body("ok"), InvokeOutcome::success());
        assert_eq!(interpret_body(r#"{"success": true}"#), InvokeOutcome::success());
        assert_eq!(interpret_body(r#"{"error": null}"#), InvokeOutcome::success());
    }

    #[test]
    fn reported_failures_are_failures() {
        assert_eq!(
            interpret_body(r#"{"success": false, "error": "model unavailable"}"#),
            InvokeOutcome::failure("model unavailable")
        );
        assert_eq!(
            interpret_body(r#"{"success": false}"#),
            InvokeOutcome::failure("Embedding function reported failure")
        );
        assert_eq!(
            interpret_body(r#"{"error": {"code": 42}}"#),
            InvokeOutcome::failure(r#"{"code":42}"#)
        );
    }

    #[test]
    fn long_failure_body_is_failure_with_bounded_error() {
        let body = serde_json::json!({ "success": false, "error": "x".repeat(5000) }).to_string();
        let outcome = interpret_body(&body);
        assert!(!outcome.success);
        assert_eq!(outcome.error.unwrap().len(), MAX_ERROR_BODY);
    }
}
