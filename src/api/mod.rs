pub mod elevenlabs;
pub mod runware;

pub use elevenlabs::ElevenLabsClient;
pub use runware::RunwareClient;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

/// Text-to-speech provider: one network call per line.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice_id` and write the audio to `dest`.
    async fn synthesize(&self, text: &str, voice_id: &str, dest: &Path) -> Result<()>;
}

/// Text-to-video provider.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Submit a generation request and return the provider's answer as-is.
    async fn submit(&self, request: &VideoRequest) -> Result<GenerationResponse>;

    /// Fetch a video the provider referenced by URL into `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// One clip request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub prompt: String,
    pub duration_seconds: u32,
    pub model: String,
}

/// What a video provider handed back.
#[derive(Debug, Clone)]
pub enum GenerationResponse {
    /// The video bytes themselves.
    Binary(Bytes),
    /// A URL to download the video from.
    Reference(String),
    /// An asynchronous job that still has to be polled.
    AsyncJob(VideoGenerationJob),
}

/// Lifecycle of an asynchronous generation job. Only `Submitted` is reached
/// until a poller exists.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoGenerationJob {
    pub id: String,
    pub state: JobState,
}

impl VideoGenerationJob {
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Submitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_failed_and_timed_out_are_terminal() {
        assert!(!JobState::Submitted.is_terminal());
        assert!(!JobState::Polling.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::TimedOut.is_terminal());
        assert_eq!(VideoGenerationJob::submitted("t-1").state, JobState::Submitted);
    }
}
