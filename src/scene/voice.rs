//! Speaker → synthesis voice mapping.

use super::{DialogueLine, Scene, NARRATOR};
use crate::error::{Result, VideoError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Voice ids keyed by speaker name. Always contains a `Narrator` entry.
#[derive(Debug, Clone)]
pub struct VoiceMap {
    voices: BTreeMap<String, String>,
}

/// A dialogue line paired with the voice that will speak it.
#[derive(Debug, Clone, Serialize)]
pub struct VoicedLine {
    pub speaker: String,
    pub text: String,
    pub voice_id: String,
}

impl VoiceMap {
    pub fn new(voices: BTreeMap<String, String>) -> Result<Self> {
        match voices.get(NARRATOR) {
            Some(id) if !id.trim().is_empty() => Ok(Self { voices }),
            _ => Err(VideoError::ConfigError(format!(
                "voice map must include a '{}' voice id",
                NARRATOR
            ))),
        }
    }

    /// Load a JSON object of `{"Speaker": "voice_id"}` and apply `NAME=ID` overrides.
    pub async fn load(path: Option<&Path>, overrides: &[String]) -> Result<Self> {
        let mut voices: BTreeMap<String, String> = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    VideoError::ConfigError(format!(
                        "failed to read voice map {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                serde_json::from_str(&raw)?
            }
            None => BTreeMap::new(),
        };

        for entry in overrides {
            let (name, id) = entry.split_once('=').ok_or_else(|| {
                VideoError::ConfigError(format!("voice override '{}' is not NAME=ID", entry))
            })?;
            voices.insert(name.trim().to_string(), id.trim().to_string());
        }

        Self::new(voices)
    }

    /// Voice for `speaker`, falling back to the narrator voice.
    pub fn resolve(&self, speaker: &str) -> Result<&str> {
        self.voices
            .get(speaker)
            .or_else(|| self.voices.get(NARRATOR))
            .map(String::as_str)
            .ok_or_else(|| {
                VideoError::ConfigError(format!(
                    "no voice for speaker '{}' and no {} fallback",
                    speaker, NARRATOR
                ))
            })
    }

    /// Resolve every line of a scene up front, before any synthesis is issued.
    pub fn resolve_all(&self, scene: &Scene) -> Result<Vec<VoicedLine>> {
        scene
            .lines
            .iter()
            .map(|line: &DialogueLine| {
                let voice_id = self.resolve(&line.speaker)?;
                Ok(VoicedLine {
                    speaker: line.speaker.clone(),
                    text: line.text.clone(),
                    voice_id: voice_id.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn voices(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn narrator_is_mandatory() {
        let err = VoiceMap::new(voices(&[("Andy", "v2")])).unwrap_err();
        assert!(matches!(err, VideoError::ConfigError(_)));
        assert!(VoiceMap::new(voices(&[("Narrator", " ")])).is_err());
    }

    #[test]
    fn known_speaker_uses_own_voice_and_unknown_falls_back() {
        let map = VoiceMap::new(voices(&[("Narrator", "v1"), ("Andy", "v2")])).unwrap();
        assert_eq!(map.resolve("Andy").unwrap(), "v2");
        assert_eq!(map.resolve("Bella").unwrap(), "v1");
        assert_eq!(map.resolve("andy").unwrap(), "v1");
    }

    #[test]
    fn resolve_all_keeps_line_order() {
        let map = VoiceMap::new(voices(&[("Narrator", "v1"), ("Andy", "v2")])).unwrap();
        let scene = Scene::new(1, "Andy: Hi.\nShe left.\nAndy: Bye.".to_string());
        let voiced = map.resolve_all(&scene).unwrap();
        let ids: Vec<&str> = voiced.iter().map(|l| l.voice_id.as_str()).collect();
        assert_eq!(ids, vec!["v2", "v1", "v2"]);
        assert_eq!(voiced[1].text, "She left.");
    }

    #[tokio::test]
    async fn load_merges_file_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Narrator": "v1", "Andy": "v2"}}"#).unwrap();

        let overrides = vec!["Andy=v9".to_string(), " Bella = v3 ".to_string()];
        let map = VoiceMap::load(Some(file.path()), &overrides).await.unwrap();
        assert_eq!(map.resolve("Narrator").unwrap(), "v1");
        assert_eq!(map.resolve("Andy").unwrap(), "v9");
        assert_eq!(map.resolve("Bella").unwrap(), "v3");
    }

    #[tokio::test]
    async fn malformed_override_is_config_error() {
        let overrides = vec!["Narrator=v1".to_string(), "Andy".to_string()];
        let err = VoiceMap::load(None, &overrides).await.unwrap_err();
        assert!(matches!(err, VideoError::ConfigError(_)));
    }

    #[tokio::test]
    async fn missing_voice_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = VoiceMap::load(Some(&dir.path().join("voices.json")), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, VideoError::ConfigError(_)));
    }
}
