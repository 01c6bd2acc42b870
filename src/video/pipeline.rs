//! Scene-by-scene orchestration from story text to the final cut.
//!
//! Each scene moves strictly through
//! `Parsed → LinesResolved → LinesSynthesized → AudioMerged → DurationKnown →
//! VideoGenerated → Composited → [Captioned] → Done`.
//! The generated clip length is derived from the merged audio, never the other
//! way round. Scenes run in order and the first failure aborts the whole run.

use super::artifact::{Artifact, Producer, Workspace};
use super::ffmpeg::MediaToolkit;
use crate::api::{GenerationResponse, SpeechSynthesizer, VideoGenerator, VideoRequest};
use crate::config::Config;
use crate::error::{Result, VideoError};
use crate::scene::voice::{VoiceMap, VoicedLine};
use crate::scene::{parse_story, Scene};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Providers reject clips shorter than this.
pub const MIN_VIDEO_SECONDS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    Parsed,
    LinesResolved,
    LinesSynthesized,
    AudioMerged,
    DurationKnown,
    VideoGenerated,
    Composited,
    Captioned,
    Done,
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The finished clip for one scene.
#[derive(Debug, Clone)]
pub struct SceneResult {
    pub index: usize,
    pub artifact: Artifact,
}

/// A scene with every line's voice resolved, as printed by `--plan`.
#[derive(Debug, Clone, Serialize)]
pub struct ScenePlan {
    pub index: usize,
    pub lines: Vec<VoicedLine>,
}

/// Parse a story and resolve all voices without touching any provider.
pub fn plan_story(story: &str, voices: &VoiceMap) -> Result<Vec<ScenePlan>> {
    parse_story(story)?
        .iter()
        .map(|scene| {
            let lines = voices
                .resolve_all(scene)
                .map_err(|e| e.in_scene(scene.index, SceneState::LinesResolved))?;
            Ok(ScenePlan {
                index: scene.index,
                lines,
            })
        })
        .collect()
}

/// Clip length for a scene: audio length rounded half to even, or the default
/// when the audio could not be measured, never below [`MIN_VIDEO_SECONDS`].
pub fn target_duration(probed: &Result<f64>, default_secs: u32) -> u32 {
    let secs = match probed {
        Ok(d) if d.is_finite() && *d >= 0.0 => d.round_ties_even() as u32,
        _ => default_secs,
    };
    secs.max(MIN_VIDEO_SECONDS)
}

pub struct Pipeline<'a> {
    config: &'a Config,
    speech: &'a dyn SpeechSynthesizer,
    video: &'a dyn VideoGenerator,
    media: &'a dyn MediaToolkit,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        speech: &'a dyn SpeechSynthesizer,
        video: &'a dyn VideoGenerator,
        media: &'a dyn MediaToolkit,
    ) -> Self {
        Self {
            config,
            speech,
            video,
            media,
        }
    }

    /// Build the whole story into `output`.
    ///
    /// Nothing is written to `output` unless every scene and the final
    /// concatenation succeed.
    pub async fn run(&self, story: &str, output: &Path) -> Result<()> {
        let scenes = parse_story(story)?;
        info!("Parsed {} scenes", scenes.len());

        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let workspace = Workspace::create(Some(parent))?;
        debug!("Artifacts for this run live in {}", workspace.path().display());

        let mut results = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            info!("===== Processing Scene {}/{} =====", scene.index, scenes.len());
            results.push(self.process_scene(scene, &workspace).await?);
        }

        let final_cut = self.assemble(results, &workspace).await?;
        publish(final_cut.path(), output).await?;

        info!("[SUCCESS] Final video written to: {}", output.display());
        Ok(())
    }

    async fn process_scene(&self, scene: &Scene, ws: &Workspace) -> Result<SceneResult> {
        let index = scene.index;
        let advance = |state: SceneState| debug!("Scene {} -> {}", index, state);
        let produced = |a: &Artifact| {
            debug!("Scene {}: {:?} wrote {:?} {}", index, a.producer, a.kind, a.path.display())
        };
        advance(SceneState::Parsed);

        let voiced = self
            .config
            .voices
            .resolve_all(scene)
            .map_err(|e| e.in_scene(index, SceneState::LinesResolved))?;
        advance(SceneState::LinesResolved);

        let line_audio = self
            .synthesize_lines(index, &voiced, ws)
            .await
            .map_err(|e| e.in_scene(index, SceneState::LinesSynthesized))?;
        advance(SceneState::LinesSynthesized);

        let scene_audio = self
            .merge_audio(&line_audio, ws.scene_audio(index))
            .await
            .map_err(|e| e.in_scene(index, SceneState::AudioMerged))?;
        produced(&scene_audio);
        advance(SceneState::AudioMerged);

        let probed = self.media.probe_duration(scene_audio.path()).await;
        let duration = target_duration(&probed, self.config.default_duration);
        match &probed {
            Ok(secs) => info!("Scene {} audio is {:.2}s, requesting {}s of video", index, secs, duration),
            Err(e) => warn!(
                "Could not measure scene {} audio ({}); using default {}s",
                index, e, duration
            ),
        }
        advance(SceneState::DurationKnown);

        let raw = self
            .generate_video(scene, duration, ws.raw_video(index))
            .await
            .map_err(|e| e.in_scene(index, SceneState::VideoGenerated))?;
        produced(&raw);
        advance(SceneState::VideoGenerated);

        let composited = ws.composited(index);
        self.media
            .overlay_trim(raw.path(), scene_audio.path(), &composited)
            .await
            .map_err(|e| e.in_scene(index, SceneState::Composited))?;
        let mut artifact = Artifact::video(composited, Producer::Overlay);
        advance(SceneState::Composited);

        if self.config.captions {
            let captioned = ws.captioned(index);
            self.media
                .burn_caption(artifact.path(), &scene.caption(), &captioned)
                .await
                .map_err(|e| e.in_scene(index, SceneState::Captioned))?;
            artifact = Artifact::video(captioned, Producer::Caption);
            advance(SceneState::Captioned);
        }

        produced(&artifact);
        advance(SceneState::Done);
        Ok(SceneResult { index, artifact })
    }

    /// Synthesize every line, possibly concurrently, returning artifacts in line order.
    async fn synthesize_lines(
        &self,
        scene: usize,
        lines: &[VoicedLine],
        ws: &Workspace,
    ) -> Result<Vec<Artifact>> {
        let jobs = lines.iter().enumerate().map(|(i, line)| {
            let dest = ws.line_audio(scene, i + 1, &line.speaker);
            async move {
                self.speech
                    .synthesize(&line.text, &line.voice_id, &dest)
                    .await?;
                Ok::<_, VideoError>((i, Artifact::audio(dest, Producer::Synthesis)))
            }
        });

        let mut done: Vec<(usize, Artifact)> = stream::iter(jobs)
            .buffer_unordered(self.config.synthesis_concurrency.max(1))
            .try_collect()
            .await?;
        done.sort_by_key(|(i, _)| *i);

        Ok(done.into_iter().map(|(_, artifact)| artifact).collect())
    }

    /// Join line audio in order. A single line is copied byte for byte.
    async fn merge_audio(&self, inputs: &[Artifact], dest: PathBuf) -> Result<Artifact> {
        match inputs {
            [] => {
                return Err(VideoError::MediaToolError(
                    "no line audio to merge".to_string(),
                ))
            }
            [only] => {
                tokio::fs::copy(only.path(), &dest).await?;
            }
            many => {
                let paths: Vec<PathBuf> = many.iter().map(|a| a.path.clone()).collect();
                self.media.stream_concat(&paths, &dest).await?;
            }
        }
        Ok(Artifact::audio(dest, Producer::AudioMerge))
    }

    async fn generate_video(&self, scene: &Scene, duration: u32, dest: PathBuf) -> Result<Artifact> {
        let request = VideoRequest {
            prompt: scene.text.clone(),
            duration_seconds: duration,
            model: self.config.model_name.clone(),
        };

        match self.video.submit(&request).await? {
            GenerationResponse::Binary(bytes) => {
                tokio::fs::write(&dest, &bytes).await?;
            }
            GenerationResponse::Reference(url) => {
                self.video.download(&url, &dest).await?;
            }
            GenerationResponse::AsyncJob(job) => {
                if !job.state.is_terminal() {
                    warn!("Received job {} ({:?}) with no poll configured", job.id, job.state);
                }
                return Err(VideoError::GenerationError(format!(
                    "asynchronous job handle received (task {}), no poll configured",
                    job.id
                )));
            }
        }
        Ok(Artifact::video(dest, Producer::Generation))
    }

    async fn assemble(&self, mut results: Vec<SceneResult>, ws: &Workspace) -> Result<Artifact> {
        results.sort_by_key(|r| r.index);
        let paths: Vec<PathBuf> = results.iter().map(|r| r.artifact.path.clone()).collect();

        let dest = ws.final_cut();
        self.media.stream_concat(&paths, &dest).await?;
        Ok(Artifact::video(dest, Producer::Concatenation))
    }
}

/// Move the finished video into place, leaving nothing behind on failure.
async fn publish(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    if let Err(e) = tokio::fs::copy(from, to).await {
        let _ = tokio::fs::remove_file(to).await;
        return Err(e.into());
    }
    Ok(())
}
