mod api;
mod config;
mod error;
mod scene;
mod video;

use anyhow::Context;
use api::{ElevenLabsClient, RunwareClient};
use clap::Parser;
use config::{Config, Credentials};
use error::Result;
use scene::voice::VoiceMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use video::{FfmpegToolkit, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "story-video")]
#[command(about = "Turn a plain-text story into a narrated AI video", long_about = None)]
struct Args {
    /// UTF-8 story file; scenes are separated by a blank line
    #[arg(short, long)]
    input: PathBuf,

    /// Output video file path
    #[arg(short, long, default_value = "final_story.mp4")]
    output: PathBuf,

    /// Video generation model
    #[arg(long, default_value = config::DEFAULT_VIDEO_MODEL)]
    model_name: String,

    /// Seconds per scene when the scene audio length is unknown
    #[arg(long, default_value_t = config::DEFAULT_SCENE_SECONDS)]
    default_duration: u32,

    /// Burn each scene's text into its clip
    #[arg(long)]
    subtitles: bool,

    /// JSON file mapping speaker names to voice ids; must include "Narrator"
    #[arg(long)]
    voices: Option<PathBuf>,

    /// Voice override, NAME=VOICE_ID (repeatable)
    #[arg(long = "voice", value_name = "NAME=ID")]
    voice_overrides: Vec<String>,

    /// Speech synthesis calls in flight per scene
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Speech synthesis model
    #[arg(long, default_value = config::DEFAULT_TTS_MODEL)]
    tts_model: String,

    /// Use the non-streaming speech endpoint
    #[arg(long)]
    no_stream: bool,

    /// Video generation endpoint
    #[arg(long, env = "RUNWARE_VIDEO_ENDPOINT", default_value = api::runware::RUNWARE_VIDEO_API)]
    video_endpoint: String,

    /// Timeout for each provider request, in seconds
    #[arg(long, default_value_t = 300)]
    request_timeout: u64,

    /// Timeout for each ffmpeg/ffprobe invocation, in seconds
    #[arg(long, default_value_t = 600)]
    tool_timeout: u64,

    /// Print the parsed scenes and resolved voices as JSON, then exit
    #[arg(long)]
    plan: bool,

    /// ElevenLabs API key
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    elevenlabs_api_key: Option<String>,

    /// Runware API key
    #[arg(long, env = "RUNWARE_API_KEY", hide_env_values = true)]
    runware_api_key: Option<String>,
}

impl Args {
    async fn into_config(self) -> Result<Config> {
        let voices = VoiceMap::load(self.voices.as_deref(), &self.voice_overrides).await?;
        let mut config = Config::new(voices);
        config.credentials = Credentials {
            elevenlabs_api_key: self.elevenlabs_api_key,
            runware_api_key: self.runware_api_key,
        };
        config.tts_model = self.tts_model;
        config.tts_streaming = !self.no_stream;
        config.video_endpoint = self.video_endpoint;
        config.model_name = self.model_name;
        config.default_duration = self.default_duration;
        config.captions = self.subtitles;
        config.synthesis_concurrency = self.concurrency;
        config.request_timeout = Duration::from_secs(self.request_timeout);
        config.tool_timeout = Duration::from_secs(self.tool_timeout);
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads env-backed args
    dotenvy::dotenv().ok();

    // Logging goes to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let input = args.input.clone();
    let output = args.output.clone();
    let plan_only = args.plan;

    let story = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("Failed to read story file: {}", input.display()))?;

    let config = match args.into_config().await {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if plan_only {
        let plan = video::pipeline::plan_story(&story, &config.voices)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    info!("Starting story video generation...");
    info!("Input text length: {} characters", story.len());

    if let Err(e) = run_generation(&story, &config, &output).await {
        error!("Video generation failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_generation(story: &str, config: &Config, output: &Path) -> Result<()> {
    let speech = ElevenLabsClient::new(
        config.credentials.elevenlabs()?.to_string(),
        config.tts_model.clone(),
        config.tts_streaming,
        config.request_timeout,
    )?;
    let video = RunwareClient::new(
        config.credentials.runware()?.to_string(),
        config.video_endpoint.clone(),
        config.request_timeout,
    )?;

    let media = FfmpegToolkit::new(config.tool_timeout);
    media.ensure_available().await?;

    Pipeline::new(config, &speech, &video, &media)
        .run(story, output)
        .await
}
