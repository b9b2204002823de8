use crate::llm::recording::APIRecorder;
use crate::llm::streaming::{HttpChunkStream, SseFragmentSource};
use crate::llm::{
    utils, ApiError, ApiErrorContext, FragmentSource, LLMProvider, LLMRequest, RateLimitHandler,
};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Serialize, Clone)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<OpenRouterMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Clone)]
struct OpenRouterMessage {
    role: String,
    content: String,
}

/// Rate limit information for OpenRouter
///
/// OpenRouter doesn't provide detailed rate limit information in response headers,
/// only an optional `Retry-After` on 429 responses.
#[derive(Debug)]
struct OpenRouterRateLimitInfo {
    status_code: StatusCode,
    retry_after: Option<Duration>,
}

impl RateLimitHandler for OpenRouterRateLimitInfo {
    fn from_response(response: &Response) -> Self {
        Self {
            status_code: response.status(),
            retry_after: utils::extract_rate_limit_header::<u64>(
                response.headers(),
                "retry-after",
            )
            .map(Duration::from_secs),
        }
    }

    fn get_retry_delay(&self) -> Duration {
        if let Some(retry_after) = self.retry_after {
            return retry_after;
        }
        if self.status_code == StatusCode::TOO_MANY_REQUESTS
            || self.status_code == StatusCode::PAYMENT_REQUIRED
        {
            Duration::from_secs(5)
        } else if self.status_code.is_server_error() {
            Duration::from_secs(2)
        } else {
            Duration::from_secs(1)
        }
    }

    fn log_status(&self) {
        if self.status_code == StatusCode::TOO_MANY_REQUESTS {
            debug!("OpenRouter rate limit hit. Status code: {}", self.status_code);
        } else {
            debug!("OpenRouter request status: {}", self.status_code);
        }
    }
}

/// Streams chat completions from OpenRouter
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution
    site_url: String,
    /// Sent as `X-Title`
    app_title: String,
    recorder: Option<Arc<APIRecorder>>,
}

impl OpenRouterClient {
    pub fn default_base_url() -> String {
        "https://openrouter.ai/api/v1".to_string()
    }

    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        site_url: String,
        app_title: String,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url,
            site_url,
            app_title,
            recorder: None,
        }
    }

    /// Record every streamed response to the given file
    pub fn with_recorder<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.recorder = Some(Arc::new(APIRecorder::new(path)));
        self
    }

    fn build_request(&self, request: &LLMRequest) -> OpenRouterRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(OpenRouterMessage {
            role: "system".to_string(),
            content: request.system_prompt.clone(),
        });
        messages.extend(request.messages.iter().map(|msg| OpenRouterMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }));

        OpenRouterRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
        }
    }

    async fn send_with_retry(&self, request: &OpenRouterRequest) -> Result<Response> {
        let mut attempts = 0;

        loop {
            match self.try_send_request(request).await {
                Ok((response, rate_limits)) => {
                    rate_limits.log_status();
                    return Ok(response);
                }
                Err(e) => {
                    if utils::handle_retryable_error::<OpenRouterRateLimitInfo>(
                        &e,
                        attempts,
                        MAX_RETRIES,
                    )
                    .await
                    {
                        attempts += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn try_send_request(
        &self,
        request: &OpenRouterRequest,
    ) -> Result<(Response, OpenRouterRateLimitInfo)> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "Sending streaming request to {} with {} messages",
            url,
            request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.app_title)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiErrorContext::<OpenRouterRateLimitInfo> {
                error: ApiError::NetworkError(e.to_string()),
                rate_limits: None,
            })?;

        let response = utils::check_response_error::<OpenRouterRateLimitInfo>(response).await?;
        let rate_limits = OpenRouterRateLimitInfo::from_response(&response);
        Ok((response, rate_limits))
    }
}

#[async_trait]
impl LLMProvider for OpenRouterClient {
    async fn stream_message(&self, request: LLMRequest) -> Result<Box<dyn FragmentSource>> {
        let openrouter_request = self.build_request(&request);
        let response = self.send_with_retry(&openrouter_request).await?;

        if let Some(recorder) = &self.recorder {
            recorder.start_recording(serde_json::to_value(&openrouter_request)?)?;
        }

        Ok(Box::new(SseFragmentSource::new(
            HttpChunkStream::new(response),
            self.recorder.clone(),
        )))
    }
}
