use crate::error::{Result, VideoError};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Probe, mux and concatenate media files.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Playable duration in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Join files in the given order without re-encoding.
    async fn stream_concat(&self, inputs: &[PathBuf], dest: &Path) -> Result<()>;

    /// Replace the video's audio with `audio`, cut to the shorter of the two.
    async fn overlay_trim(&self, video: &Path, audio: &Path, dest: &Path) -> Result<()>;

    /// Burn `text` over the whole clip, copying the audio through.
    async fn burn_caption(&self, video: &Path, text: &str, dest: &Path) -> Result<()>;
}

pub struct FfmpegToolkit {
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

struct CommandOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

impl FfmpegToolkit {
    pub fn new(timeout: Duration) -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            timeout,
        }
    }

    /// Fail early if either binary is missing from PATH.
    pub async fn ensure_available(&self) -> Result<()> {
        for tool in [&self.ffmpeg, &self.ffprobe] {
            let output = self.run(tool, ["-version"]).await?;
            if !output.success {
                return Err(VideoError::MediaToolError(format!(
                    "'{} -version' failed: {}",
                    tool,
                    stderr_tail(&output.stderr)
                )));
            }
        }
        Ok(())
    }

    async fn run<I, S>(&self, program: &str, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(">> {:?}", cmd.as_std());

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(VideoError::MediaToolError(format!(
                    "{} timed out after {:?}",
                    program, self.timeout
                )))
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(VideoError::MediaToolError(format!(
                    "Required tool '{}' not found in PATH",
                    program
                )))
            }
            Ok(Err(e)) => {
                return Err(VideoError::MediaToolError(format!(
                    "Failed to run {}: {}",
                    program, e
                )))
            }
            Ok(Ok(output)) => output,
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }

    async fn ffmpeg<I, S>(&self, what: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run(&self.ffmpeg, args).await?;
        if !output.success {
            return Err(VideoError::MediaToolError(format!(
                "FFmpeg {} failed: {}",
                what,
                stderr_tail(&output.stderr)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = self
            .run(
                &self.ffprobe,
                [
                    OsStr::new("-v"),
                    OsStr::new("error"),
                    OsStr::new("-show_entries"),
                    OsStr::new("format=duration"),
                    OsStr::new("-of"),
                    OsStr::new("default=nw=1:nk=1"),
                    path.as_os_str(),
                ],
            )
            .await?;

        if !output.success {
            return Err(VideoError::MediaToolError(format!(
                "ffprobe failed on {}: {}",
                path.display(),
                stderr_tail(&output.stderr)
            )));
        }
        parse_duration(&output.stdout)
    }

    async fn stream_concat(&self, inputs: &[PathBuf], dest: &Path) -> Result<()> {
        info!("Concatenating {} files -> {}", inputs.len(), dest.display());

        let mut absolute = Vec::with_capacity(inputs.len());
        for input in inputs {
            absolute.push(tokio::fs::canonicalize(input).await?);
        }
        let list_path = dest.with_extension("concat.txt");
        tokio::fs::write(&list_path, concat_list(&absolute)).await?;

        self.ffmpeg(
            "concat",
            [
                OsStr::new("-y"),
                OsStr::new("-f"),
                OsStr::new("concat"),
                OsStr::new("-safe"),
                OsStr::new("0"),
                OsStr::new("-i"),
                list_path.as_os_str(),
                OsStr::new("-c"),
                OsStr::new("copy"),
                dest.as_os_str(),
            ],
        )
        .await
    }

    async fn overlay_trim(&self, video: &Path, audio: &Path, dest: &Path) -> Result<()> {
        info!("Adding audio to video: {}", dest.display());

        self.ffmpeg(
            "audio overlay",
            [
                OsStr::new("-y"),
                OsStr::new("-i"),
                video.as_os_str(),
                OsStr::new("-i"),
                audio.as_os_str(),
                OsStr::new("-c:v"),
                OsStr::new("copy"),
                OsStr::new("-map"),
                OsStr::new("0:v:0"),
                OsStr::new("-map"),
                OsStr::new("1:a:0"),
                OsStr::new("-shortest"),
                dest.as_os_str(),
            ],
        )
        .await
    }

    async fn burn_caption(&self, video: &Path, text: &str, dest: &Path) -> Result<()> {
        info!("Burning caption into {}", dest.display());

        let srt_path = dest.with_extension("srt");
        tokio::fs::write(&srt_path, full_length_srt(text)).await?;
        let filter = format!("subtitles={}", escape_filter_value(&srt_path.to_string_lossy()));

        self.ffmpeg(
            "caption burn",
            [
                OsStr::new("-y"),
                OsStr::new("-i"),
                video.as_os_str(),
                OsStr::new("-vf"),
                OsStr::new(&filter),
                OsStr::new("-c:a"),
                OsStr::new("copy"),
                dest.as_os_str(),
            ],
        )
        .await
    }
}

fn parse_duration(stdout: &str) -> Result<f64> {
    let value = stdout.trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            VideoError::MediaToolError(format!("unparseable ffprobe duration: {:?}", value))
        })
}

/// Input list for the concat demuxer.
fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

/// One subtitle cue covering any clip length.
fn full_length_srt(text: &str) -> String {
    format!("1\n00:00:00,000 --> 99:59:59,000\n{}\n", text.replace('\n', " "))
}

fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
        .replace(',', "\\,")
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_output() {
        assert_eq!(parse_duration("13.400000\n").unwrap(), 13.4);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("N/A\n").is_err());
        assert!(parse_duration("-1.0").is_err());
        assert!(matches!(
            parse_duration("nan"),
            Err(VideoError::MediaToolError(_))
        ));
    }

    #[test]
    fn concat_list_keeps_order_and_quotes_paths() {
        let list = concat_list(&[
            PathBuf::from("/tmp/b.mp3"),
            PathBuf::from("/tmp/it's.mp3"),
            PathBuf::from("/tmp/a.mp3"),
        ]);
        assert_eq!(
            list,
            "file '/tmp/b.mp3'\nfile '/tmp/it'\\''s.mp3'\nfile '/tmp/a.mp3'\n"
        );
    }

    #[test]
    fn srt_spans_whole_clip_on_one_line() {
        let srt = full_length_srt("Andy: Hi.\nShe left.");
        assert_eq!(srt, "1\n00:00:00,000 --> 99:59:59,000\nAndy: Hi. She left.\n");
    }

    #[test]
    fn filter_value_escapes_separators() {
        assert_eq!(escape_filter_value("C:\\tmp\\a,b.srt"), "C\\:\\\\tmp\\\\a\\,b.srt");
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let stderr = (1..=8).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        assert_eq!(stderr_tail(&stderr), "l4 | l5 | l6 | l7 | l8");
    }

    #[tokio::test]
    async fn missing_binary_is_a_media_tool_error() {
        let toolkit = FfmpegToolkit {
            ffmpeg: "definitely-not-ffmpeg-4242".to_string(),
            ffprobe: "definitely-not-ffprobe-4242".to_string(),
            timeout: Duration::from_secs(5),
        };
        match toolkit.ensure_available().await {
            Err(VideoError::MediaToolError(msg)) => assert!(msg.contains("not found")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
