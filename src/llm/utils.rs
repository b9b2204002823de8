use crate::llm::{ApiError, ApiErrorContext, RateLimitHandler};
use anyhow::Result;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
}

/// Prefer the `error.message` field of a JSON error body over the raw text
fn error_message(response_text: &str) -> String {
    serde_json::from_str::<ErrorBody>(response_text)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| response_text.to_string())
}

/// Check response error and extract rate limit information.
/// Returns Ok(Response) if successful, or an error with rate limit context if not.
pub async fn check_response_error<T: RateLimitHandler + std::fmt::Debug + Send + Sync + 'static>(
    response: Response,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limits = T::from_response(&response);
    let response_text = response
        .text()
        .await
        .map_err(|e| ApiError::NetworkError(e.to_string()))?;
    let message = error_message(&response_text);

    let error = match status {
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit(message),
        StatusCode::UNAUTHORIZED => ApiError::Authentication(message),
        StatusCode::BAD_REQUEST => ApiError::InvalidRequest(message),
        status if status.is_server_error() => ApiError::ServiceError(message),
        _ => ApiError::Unknown(format!("Status {status}: {message}")),
    };

    Err(ApiErrorContext {
        error,
        rate_limits: Some(rate_limits),
    }
    .into())
}

/// Handle retryable errors and rate limiting.
/// Returns true if the error is retryable and we should continue the retry loop.
/// Returns false if we should exit the retry loop.
///
/// `attempts` is the number of retries already made.
pub async fn handle_retryable_error<
    T: RateLimitHandler + std::fmt::Debug + Send + Sync + 'static,
>(
    error: &anyhow::Error,
    attempts: u32,
    max_retries: u32,
) -> bool {
    if attempts >= max_retries {
        return false;
    }

    let Some(ctx) = error.downcast_ref::<ApiErrorContext<T>>() else {
        return false;
    };

    match &ctx.error {
        ApiError::RateLimit(_) => {
            let delay = match &ctx.rate_limits {
                Some(rate_limits) => rate_limits.get_retry_delay(),
                None => Duration::from_secs(2u64.pow(attempts)),
            };
            warn!(
                "Rate limit hit (attempt {}/{}), waiting {} seconds before retry",
                attempts + 1,
                max_retries,
                delay.as_secs()
            );
            sleep(delay).await;
            true
        }
        ApiError::ServiceError(_) | ApiError::NetworkError(_) => {
            let delay = Duration::from_secs(2u64.pow(attempts));
            warn!(
                "Error: {} (attempt {}/{}), retrying in {} seconds",
                error,
                attempts + 1,
                max_retries,
                delay.as_secs()
            );
            sleep(delay).await;
            true
        }
        _ => {
            warn!("Not retrying request: {}", error);
            false
        }
    }
}

/// Helper for extracting rate limit information from response headers
pub fn extract_rate_limit_header<T: std::str::FromStr>(
    headers: &reqwest::header::HeaderMap,
    name: &str,
) -> Option<T> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}
