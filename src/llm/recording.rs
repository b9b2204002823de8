use crate::llm::streaming::{PlaybackChunkStream, SseFragmentSource};
use crate::llm::{FragmentSource, LLMProvider, LLMRequest};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info};

/// Recording session that contains the original request and all chunks
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordingSession {
    /// The request that was sent
    pub request: serde_json::Value,
    /// Timestamp of when the recording was started
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Raw chunks as received from the API
    pub chunks: Vec<RecordedChunk>,
}

/// Single recorded chunk with timing info
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordedChunk {
    /// Raw content of the data part of the SSE
    pub data: String,
    /// Milliseconds since recording start
    pub timestamp_ms: u64,
}

struct ActiveRecording {
    session: RecordingSession,
    start_time: Instant,
}

/// Recorder for API responses.
///
/// The file holds a JSON array with one entry per recorded turn.
pub struct APIRecorder {
    file_path: PathBuf,
    current: Mutex<Option<ActiveRecording>>,
}

impl APIRecorder {
    /// Create a new recorder that writes to the specified file
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
            current: Mutex::new(None),
        }
    }

    fn current(&self) -> Result<MutexGuard<'_, Option<ActiveRecording>>> {
        self.current
            .lock()
            .map_err(|_| anyhow!("Recording state lock poisoned"))
    }

    /// Start a new recording session
    pub fn start_recording(&self, request: serde_json::Value) -> Result<()> {
        *self.current()? = Some(ActiveRecording {
            session: RecordingSession {
                request,
                timestamp: chrono::Utc::now(),
                chunks: Vec::new(),
            },
            start_time: Instant::now(),
        });
        Ok(())
    }

    /// Record an incoming chunk
    pub fn record_chunk(&self, data: &str) -> Result<()> {
        if let Some(active) = self.current()?.as_mut() {
            let timestamp_ms = active.start_time.elapsed().as_millis() as u64;
            active.session.chunks.push(RecordedChunk {
                data: data.to_string(),
                timestamp_ms,
            });
        }
        Ok(())
    }

    /// End the current recording session and append it to the file
    pub fn end_recording(&self) -> Result<()> {
        let Some(active) = self.current()?.take() else {
            return Ok(());
        };

        let mut sessions = if self.file_path.exists() {
            read_sessions(&self.file_path)?
        } else {
            Vec::new()
        };
        debug!(
            "Saving recording with {} chunks to {}",
            active.session.chunks.len(),
            self.file_path.display()
        );
        sessions.push(active.session);

        let json = serde_json::to_string_pretty(&sessions)?;
        std::fs::write(&self.file_path, json + "\n").context("Failed to write recording file")?;
        Ok(())
    }
}

fn read_sessions(path: &Path) -> Result<Vec<RecordingSession>> {
    let contents = std::fs::read_to_string(path).context("Failed to read recording file")?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents).context("Failed to parse recording file")
}

/// Provider that replays recorded sessions in order instead of calling the API
pub struct PlaybackProvider {
    sessions: Vec<RecordingSession>,
    index: AtomicUsize,
    fast: bool,
}

impl PlaybackProvider {
    pub fn from_file<P: AsRef<Path>>(path: P, fast: bool) -> Result<Self> {
        let sessions = read_sessions(path.as_ref())?;
        info!(
            "Loaded {} recorded sessions from {}",
            sessions.len(),
            path.as_ref().display()
        );
        Ok(Self {
            sessions,
            index: AtomicUsize::new(0),
            fast,
        })
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Take the next session, or None if exhausted
    fn next_session(&self) -> Option<RecordingSession> {
        let index = self.index.fetch_add(1, Ordering::SeqCst);
        self.sessions.get(index).cloned()
    }
}

#[async_trait]
impl LLMProvider for PlaybackProvider {
    async fn stream_message(&self, _request: LLMRequest) -> Result<Box<dyn FragmentSource>> {
        let session = self
            .next_session()
            .ok_or_else(|| anyhow!("No more recorded sessions to play back"))?;
        debug!("Playing back session recorded at {}", session.timestamp);

        Ok(Box::new(SseFragmentSource::new(
            PlaybackChunkStream::new(session.chunks, self.fast),
            None,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn request() -> LLMRequest {
        LLMRequest {
            system_prompt: "You are a travel planner.".to_string(),
            messages: Vec::new(),
            temperature: 0.7,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn test_playback_sequences_sessions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("playback.json");
        let json = r#"[
  {
    "request": {"foo": 1},
    "timestamp": "2024-01-01T00:00:00Z",
    "chunks": [
      {"data": "{\"choices\":[{\"delta\":{\"content\":\"first\"}}]}", "timestamp_ms": 0}
    ]
  },
  {
    "request": {"bar": 2},
    "timestamp": "2024-01-01T00:00:01Z",
    "chunks": [
      {"data": "{\"choices\":[{\"delta\":{\"content\":\"second\"}}]}", "timestamp_ms": 10}
    ]
  }
]
"#;
        fs::write(&path, json)?;

        let provider = PlaybackProvider::from_file(&path, true)?;
        assert_eq!(provider.session_count(), 2);

        let mut source = provider.stream_message(request()).await?;
        assert_eq!(source.next_fragment().await?.as_deref(), Some("first"));
        assert_eq!(source.next_fragment().await?, None);

        let mut source = provider.stream_message(request()).await?;
        assert_eq!(source.next_fragment().await?.as_deref(), Some("second"));
        assert_eq!(source.next_fragment().await?, None);

        assert!(provider.stream_message(request()).await.is_err());
        Ok(())
    }

    #[test]
    fn test_recorder_appends_sessions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("recording.json");
        let recorder = APIRecorder::new(&path);

        // Nothing is written without an active session
        recorder.end_recording()?;
        assert!(!path.exists());

        recorder.start_recording(serde_json::json!({"turn": 1}))?;
        recorder.record_chunk("one")?;
        recorder.end_recording()?;

        recorder.start_recording(serde_json::json!({"turn": 2}))?;
        recorder.record_chunk("two")?;
        recorder.record_chunk("three")?;
        recorder.end_recording()?;

        let sessions = read_sessions(&path)?;
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].request["turn"], 1);
        assert_eq!(sessions[1].chunks.len(), 2);
        assert_eq!(sessions[1].chunks[1].data, "three");
        Ok(())
    }
}
