//! Streaming infrastructure for the LLM transport
//!
//! Byte chunks come either from a live HTTP response or from a recorded
//! session. Both go through the same [`SseFragmentSource`], which re-frames the
//! bytes into SSE lines and extracts the text fragments of an OpenAI compatible
//! chat completion stream.

use crate::llm::recording::{APIRecorder, RecordedChunk};
use crate::llm::ApiError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Source of model output fragments for one turn.
///
/// Fragments arrive in order, their boundaries carry no meaning.
#[async_trait]
pub trait FragmentSource: Send {
    /// The next fragment, or `None` once the stream has ended
    async fn next_fragment(&mut self) -> Result<Option<String>>;
}

/// Trait for streaming chunk sources (real HTTP response or recorded playback)
#[async_trait]
pub trait ChunkStream: Send {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Real HTTP response chunk stream
pub struct HttpChunkStream {
    pub response: Response,
}

impl HttpChunkStream {
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

#[async_trait]
impl ChunkStream for HttpChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.response.chunk().await {
            Ok(Some(chunk)) => Ok(Some(chunk.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(ApiError::NetworkError(format!("HTTP chunk error: {e}")).into()),
        }
    }
}

/// Recorded chunk stream for playback
pub struct PlaybackChunkStream {
    chunks: VecDeque<RecordedChunk>,
    start_time: Instant,
    fast_mode: bool,
}

impl PlaybackChunkStream {
    pub fn new(chunks: Vec<RecordedChunk>, fast_mode: bool) -> Self {
        Self {
            chunks: chunks.into(),
            start_time: Instant::now(),
            fast_mode,
        }
    }
}

#[async_trait]
impl ChunkStream for PlaybackChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(chunk) = self.chunks.pop_front() else {
            return Ok(None);
        };

        if self.fast_mode {
            // ~60fps
            tokio::time::sleep(Duration::from_millis(17)).await;
        } else {
            let elapsed = self.start_time.elapsed();
            let expected_time = Duration::from_millis(chunk.timestamp_ms);
            if elapsed < expected_time {
                tokio::time::sleep(expected_time - elapsed).await;
            }
        }

        Ok(Some(format!("data: {}\n\n", chunk.data).into_bytes()))
    }
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}

/// Decodes an OpenAI compatible chat completion SSE stream into fragments
pub struct SseFragmentSource<S: ChunkStream> {
    chunks: S,
    /// Bytes of the current, incomplete line
    line_buffer: Vec<u8>,
    /// Fragments decoded but not yet handed out
    fragments: VecDeque<String>,
    done: bool,
    recorder: Option<Arc<APIRecorder>>,
}

impl<S: ChunkStream> SseFragmentSource<S> {
    pub fn new(chunks: S, recorder: Option<Arc<APIRecorder>>) -> Self {
        Self {
            chunks,
            line_buffer: Vec::new(),
            fragments: VecDeque::new(),
            done: false,
            recorder,
        }
    }

    async fn pull(&mut self) -> Result<()> {
        match self.chunks.next_chunk().await? {
            Some(chunk) => {
                for byte in chunk {
                    if self.done {
                        break;
                    }
                    if byte == b'\n' {
                        let line = std::mem::take(&mut self.line_buffer);
                        self.process_line(line)?;
                    } else {
                        self.line_buffer.push(byte);
                    }
                }
            }
            None => {
                if !self.line_buffer.is_empty() {
                    let line = std::mem::take(&mut self.line_buffer);
                    self.process_line(line)?;
                }
                if !self.done {
                    debug!("Stream closed without [DONE]");
                    self.finish();
                }
            }
        }
        Ok(())
    }

    fn process_line(&mut self, line: Vec<u8>) -> Result<()> {
        // Multi-byte sequences may be split across chunks but never across lines
        let line = String::from_utf8(line).context("Stream contained invalid UTF-8")?;
        let line = line.trim_end_matches('\r');

        // Blank lines separate events, lines starting with ':' are comments
        let Some(data) = line.strip_prefix("data:") else {
            if !line.is_empty() && !line.starts_with(':') {
                trace!("Ignoring SSE line: {}", line);
            }
            return Ok(());
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data == "[DONE]" {
            self.finish();
            return Ok(());
        }

        if let Some(recorder) = &self.recorder {
            recorder.record_chunk(data)?;
        }

        let response = match serde_json::from_str::<StreamResponse>(data) {
            Ok(response) => response,
            Err(e) => {
                debug!("Skipping unparsable stream data ({}): {}", e, data);
                return Ok(());
            }
        };

        if let Some(error) = response.error {
            return Err(ApiError::ServiceError(error.message).into());
        }

        if let Some(content) = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
        {
            self.fragments.push_back(content);
        }

        Ok(())
    }

    fn finish(&mut self) {
        self.done = true;
        self.end_recording();
    }

    fn end_recording(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            if let Err(e) = recorder.end_recording() {
                warn!("Failed to save recording: {:#}", e);
            }
        }
    }
}

#[async_trait]
impl<S: ChunkStream> FragmentSource for SseFragmentSource<S> {
    async fn next_fragment(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(fragment) = self.fragments.pop_front() {
                return Ok(Some(fragment));
            }
            if self.done {
                return Ok(None);
            }
            if let Err(e) = self.pull().await {
                self.done = true;
                self.end_recording();
                return Err(e);
            }
        }
    }
}
