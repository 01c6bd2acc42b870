//! Generated media files and the per-run working directory that owns them.

use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("filename pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Audio,
    Video,
}

/// The stage that wrote an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    Synthesis,
    AudioMerge,
    Generation,
    Overlay,
    Caption,
    Concatenation,
}

/// A generated media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub producer: Producer,
}

impl Artifact {
    pub fn audio(path: PathBuf, producer: Producer) -> Self {
        Self {
            path,
            kind: ArtifactKind::Audio,
            producer,
        }
    }

    pub fn video(path: PathBuf, producer: Producer) -> Self {
        Self {
            path,
            kind: ArtifactKind::Video,
            producer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Scoped working directory for one run.
///
/// Every artifact lives under it and is named by scene and line index, so no two
/// units of work ever share a path. The directory is removed when this value is
/// dropped, whichever way the run ends.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create the working directory under `parent`, or the system temp dir.
    ///
    /// Placing it next to the output keeps the final move on one filesystem.
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".story-video-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        info!("Working dir: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn file(&self, name: String) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn line_audio(&self, scene: usize, line: usize, speaker: &str) -> PathBuf {
        self.file(format!(
            "scene{:02}_line{:02}_{}.mp3",
            scene,
            line,
            sanitize_filename(speaker)
        ))
    }

    pub fn scene_audio(&self, scene: usize) -> PathBuf {
        self.file(format!("scene{:02}_audio.mp3", scene))
    }

    pub fn raw_video(&self, scene: usize) -> PathBuf {
        self.file(format!("scene{:02}_raw.mp4", scene))
    }

    pub fn composited(&self, scene: usize) -> PathBuf {
        self.file(format!("scene{:02}_final.mp4", scene))
    }

    pub fn captioned(&self, scene: usize) -> PathBuf {
        self.file(format!("scene{:02}_subs.mp4", scene))
    }

    pub fn final_cut(&self) -> PathBuf {
        self.file("final_story.mp4".to_string())
    }
}

/// Replace runs of characters unsafe in file names with `_`.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS
        .replace_all(name, "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_speaker_names() {
        assert_eq!(sanitize_filename("Bella Rose"), "Bella_Rose");
        assert_eq!(sanitize_filename("  Dr. Who?! "), "Dr._Who");
        assert_eq!(sanitize_filename("mr-x_2"), "mr-x_2");
    }

    #[test]
    fn paths_are_namespaced_by_scene_and_line() {
        let ws = Workspace::create(None).unwrap();
        assert_ne!(ws.line_audio(1, 1, "Andy"), ws.line_audio(1, 2, "Andy"));
        assert_ne!(ws.line_audio(1, 1, "Andy"), ws.line_audio(2, 1, "Andy"));
        assert_ne!(ws.raw_video(1), ws.raw_video(2));
        assert!(ws.scene_audio(3).ends_with("scene03_audio.mp3"));
        assert!(ws.line_audio(1, 12, "Bella Rose").ends_with("scene01_line12_Bella_Rose.mp3"));
        assert!(ws.composited(1).starts_with(ws.path()));
    }

    #[test]
    fn directory_is_removed_on_drop() {
        let ws = Workspace::create(None).unwrap();
        let dir = ws.path().to_path_buf();
        std::fs::write(ws.scene_audio(1), b"audio").unwrap();
        assert!(dir.exists());
        drop(ws);
        assert!(!dir.exists());
    }
}
