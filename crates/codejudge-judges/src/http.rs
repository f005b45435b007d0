//! Shared request plumbing for the HTTP judges.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::JudgeError;

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, JudgeError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| JudgeError::Config(format!("failed to build HTTP client: {e}")))
}

/// Send `request` and decode a JSON body, classifying failures.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    timeout_secs: u64,
) -> Result<T, JudgeError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            JudgeError::Timeout(timeout_secs)
        } else {
            JudgeError::NetworkError(e.to_string())
        }
    })?;

    let status = response.status().as_u16();
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            * 1000;
        return Err(JudgeError::RateLimited {
            retry_after_ms: retry_after,
        });
    }
    if status == 401 || status == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(JudgeError::AuthenticationFailed(body));
    }
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        return Err(JudgeError::ApiError {
            status,
            message: body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| JudgeError::Protocol(format!("failed to parse response: {e}")))
}
