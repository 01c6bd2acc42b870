use crate::video::pipeline::SceneState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Speech synthesis error: {0}")]
    SynthesisError(String),

    #[error("Video generation error: {0}")]
    GenerationError(String),

    #[error("Media tool error: {0}")]
    MediaToolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Scene {index} failed while entering {stage}: {source}")]
    SceneFailed {
        index: usize,
        stage: SceneState,
        #[source]
        source: Box<VideoError>,
    },
}

impl VideoError {
    /// Tag an error with the scene and state it occurred in.
    ///
    /// Errors that already carry scene context are returned unchanged so the
    /// first (innermost) location wins.
    pub fn in_scene(self, index: usize, stage: SceneState) -> Self {
        match self {
            VideoError::SceneFailed { .. } => self,
            other => VideoError::SceneFailed {
                index,
                stage,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, VideoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_context_is_not_wrapped_twice() {
        let err = VideoError::SynthesisError("401 Unauthorized".to_string())
            .in_scene(2, SceneState::LinesSynthesized)
            .in_scene(3, SceneState::Done);

        match err {
            VideoError::SceneFailed { index, stage, source } => {
                assert_eq!(index, 2);
                assert_eq!(stage, SceneState::LinesSynthesized);
                assert!(matches!(*source, VideoError::SynthesisError(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn scene_failure_message_names_scene_and_stage() {
        let err = VideoError::GenerationError("unrecognized response".to_string())
            .in_scene(1, SceneState::VideoGenerated);
        let msg = err.to_string();
        assert!(msg.contains("Scene 1"));
        assert!(msg.contains("VideoGenerated"));
        assert!(msg.contains("unrecognized response"));
    }
}
