//! Scripted provider for tests of the turn orchestrator and the chat session
use crate::llm::{ApiError, FragmentSource, LLMProvider, LLMRequest};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One step of a scripted fragment stream
#[derive(Debug, Clone)]
pub enum Step {
    Fragment(String),
    /// The stream fails with a network error
    Fail(String),
    /// The stream never produces anything again
    Hang,
}

struct ScriptedSource {
    steps: VecDeque<Step>,
}

#[async_trait]
impl FragmentSource for ScriptedSource {
    async fn next_fragment(&mut self) -> Result<Option<String>> {
        match self.steps.pop_front() {
            None => Ok(None),
            Some(Step::Fragment(text)) => Ok(Some(text)),
            Some(Step::Fail(message)) => Err(ApiError::NetworkError(message).into()),
            Some(Step::Hang) => std::future::pending().await,
        }
    }
}

/// Provider that answers each request with the next scripted turn
#[derive(Default)]
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<Result<Vec<Step>, String>>>,
    requests: Arc<Mutex<Vec<LLMRequest>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fragments<S: AsRef<str>>(self, fragments: &[S]) -> Self {
        self.with_steps(
            fragments
                .iter()
                .map(|fragment| Step::Fragment(fragment.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn with_steps(self, steps: Vec<Step>) -> Self {
        self.turns.lock().unwrap().push_back(Ok(steps));
        self
    }

    /// The next request fails before any fragment is produced
    pub fn with_handshake_error(self, message: &str) -> Self {
        self.turns.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    /// Handle to the requests received, usable after the provider was moved
    pub fn requests(&self) -> Arc<Mutex<Vec<LLMRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn stream_message(&self, request: LLMRequest) -> Result<Box<dyn FragmentSource>> {
        self.requests.lock().unwrap().push(request);

        match self.turns.lock().unwrap().pop_front() {
            Some(Ok(steps)) => Ok(Box::new(ScriptedSource {
                steps: steps.into(),
            })),
            Some(Err(message)) => Err(ApiError::ServiceError(message).into()),
            None => Err(anyhow::anyhow!("No more scripted turns")),
        }
    }
}
