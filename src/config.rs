use crate::error::{Result, VideoError};
use crate::scene::voice::VoiceMap;
use std::time::Duration;

pub const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";
pub const DEFAULT_VIDEO_MODEL: &str = "runware/video-cinematic";
pub const DEFAULT_SCENE_SECONDS: u32 = 6;

/// Provider credentials. Only required when the run talks to providers.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub elevenlabs_api_key: Option<String>,
    pub runware_api_key: Option<String>,
}

impl Credentials {
    pub fn elevenlabs(&self) -> Result<&str> {
        required(&self.elevenlabs_api_key, "ELEVENLABS_API_KEY")
    }

    pub fn runware(&self) -> Result<&str> {
        required(&self.runware_api_key, "RUNWARE_API_KEY")
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            VideoError::ConfigError(format!(
                "{} not found. Set it via the command line or the environment",
                name
            ))
        })
}

/// Everything a run needs, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub voices: VoiceMap,
    pub tts_model: String,
    pub tts_streaming: bool,
    pub video_endpoint: String,
    pub model_name: String,
    /// Scene length when the merged audio cannot be measured.
    pub default_duration: u32,
    pub captions: bool,
    /// Line synthesis calls in flight per scene.
    pub synthesis_concurrency: usize,
    pub request_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Config {
    pub fn new(voices: VoiceMap) -> Self {
        Self {
            credentials: Credentials::default(),
            voices,
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_streaming: true,
            video_endpoint: crate::api::runware::RUNWARE_VIDEO_API.to_string(),
            model_name: DEFAULT_VIDEO_MODEL.to_string(),
            default_duration: DEFAULT_SCENE_SECONDS,
            captions: false,
            synthesis_concurrency: 1,
            request_timeout: Duration::from_secs(300),
            tool_timeout: Duration::from_secs(600),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.synthesis_concurrency == 0 {
            return Err(VideoError::ConfigError(
                "synthesis concurrency must be at least 1".to_string(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(VideoError::ConfigError("model name is empty".to_string()));
        }
        Ok(())
    }
}
