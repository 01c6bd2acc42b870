use super::SpeechSynthesizer;
use crate::error::{Result, VideoError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const ELEVENLABS_TTS_API: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Every line is requested in this format so scene audio can be stream-copied.
const OUTPUT_FORMAT: &str = "mp3_44100_128";

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    api_key: String,
    model_id: String,
    streaming: bool,
    client: Client,
}

impl ElevenLabsClient {
    pub fn new(api_key: String, model_id: String, streaming: bool, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VideoError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model_id,
            streaming,
            client,
        })
    }

    fn endpoint(&self, voice_id: &str) -> String {
        if self.streaming {
            format!("{}/{}/stream", ELEVENLABS_TTS_API, voice_id)
        } else {
            format!("{}/{}", ELEVENLABS_TTS_API, voice_id)
        }
    }
}

fn transport(e: reqwest::Error) -> VideoError {
    VideoError::SynthesisError(format!("request failed: {}", e))
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: &str, dest: &Path) -> Result<()> {
        info!("[TTS] {} -> {}", voice_id, dest.display());

        let request_body = json!({
            "text": text,
            "model_id": self.model_id,
        });

        let mut response = self
            .client
            .post(self.endpoint(voice_id))
            .query(&[("output_format", OUTPUT_FORMAT)])
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request_body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VideoError::SynthesisError(format!(
                "ElevenLabs returned {}: {}",
                status, error_text
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!("Speech saved to {} ({} bytes)", dest.display(), written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(streaming: bool) -> ElevenLabsClient {
        ElevenLabsClient::new(
            "key".to_string(),
            "eleven_multilingual_v2".to_string(),
            streaming,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn streaming_toggle_selects_endpoint() {
        assert_eq!(
            client(true).endpoint("abc"),
            "https://api.elevenlabs.io/v1/text-to-speech/abc/stream"
        );
        assert_eq!(
            client(false).endpoint("abc"),
            "https://api.elevenlabs.io/v1/text-to-speech/abc"
        );
    }
}
