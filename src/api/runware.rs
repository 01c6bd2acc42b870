use super::{GenerationResponse, VideoGenerationJob, VideoGenerator, VideoRequest};
use crate::error::{Result, VideoError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

pub const RUNWARE_VIDEO_API: &str = "https://api.runware.ai/v1/generate/video";

/// Longest prompt the provider accepts, in characters.
pub const MAX_PROMPT_CHARS: usize = 800;

#[derive(Debug, Clone)]
pub struct RunwareClient {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl RunwareClient {
    pub fn new(api_key: String, endpoint: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VideoError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            endpoint,
            client,
        })
    }
}

fn transport(e: reqwest::Error) -> VideoError {
    VideoError::GenerationError(format!("request failed: {}", e))
}

/// Cut a prompt to the provider's length limit on a character boundary.
pub fn truncate_prompt(prompt: &str) -> &str {
    match prompt.char_indices().nth(MAX_PROMPT_CHARS) {
        Some((byte_idx, _)) => &prompt[..byte_idx],
        None => prompt,
    }
}

/// Decide which response shape the provider used from its declared content type.
pub fn classify_response(content_type: &str, body: Bytes) -> Result<GenerationResponse> {
    if !content_type.contains("application/json") {
        if body.is_empty() {
            return Err(VideoError::GenerationError(
                "provider returned an empty video body".to_string(),
            ));
        }
        return Ok(GenerationResponse::Binary(body));
    }

    let data: Value = serde_json::from_slice(&body).map_err(|e| {
        VideoError::GenerationError(format!("unrecognized response: invalid JSON ({})", e))
    })?;

    let url = ["download_url", "url"]
        .iter()
        .find_map(|k| data.get(*k).and_then(Value::as_str).filter(|u| !u.is_empty()));
    if let Some(url) = url {
        return Ok(GenerationResponse::Reference(url.to_string()));
    }

    let task_id = ["task_id", "id"].iter().find_map(|k| match data.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });
    if let Some(id) = task_id {
        return Ok(GenerationResponse::AsyncJob(VideoGenerationJob::submitted(id)));
    }

    Err(VideoError::GenerationError(format!(
        "unrecognized response: {}",
        data
    )))
}

#[async_trait]
impl VideoGenerator for RunwareClient {
    async fn submit(&self, request: &VideoRequest) -> Result<GenerationResponse> {
        let prompt = truncate_prompt(&request.prompt);
        info!(
            "[Runware] Requesting video: {}s, model={}, prompt_len={}",
            request.duration_seconds,
            request.model,
            prompt.chars().count()
        );

        let request_body = json!({
            "prompt": prompt,
            "duration": request.duration_seconds,
            "model": request.model,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/octet-stream,video/mp4,application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VideoError::GenerationError(format!(
                "Runware returned {}: {}",
                status, error_text
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await.map_err(transport)?;

        classify_response(&content_type, body)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("[Download] {} -> {}", url, dest.display());

        let mut response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            warn!("Download of {} failed with {}", url, status);
            return Err(VideoError::GenerationError(format!(
                "download of {} returned {}",
                url, status
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}
