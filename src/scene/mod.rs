pub mod voice;

use crate::error::{Result, VideoError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Speaker used for any line without a `Name:` prefix.
pub const NARRATOR: &str = "Narrator";

/// Scenes are separated by exactly one blank line.
const SCENE_SEPARATOR: &str = "\n\n";

/// `Name: text`, name starting with a letter, at most 49 characters.
static DIALOGUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][\w\- ]{0,48})\s*:\s*(.+?)\s*$").expect("dialogue pattern is valid")
});

/// One line of a scene with its resolved speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

impl DialogueLine {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    pub fn narrator(text: impl Into<String>) -> Self {
        Self::new(NARRATOR, text)
    }
}

/// A block of story text and its dialogue lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Position in the story, starting at 1
    pub index: usize,
    /// Raw scene text
    pub text: String,
    /// Dialogue lines in reading order
    pub lines: Vec<DialogueLine>,
}

impl Scene {
    pub fn new(index: usize, text: String) -> Self {
        let lines = parse_lines(&text);
        Self { index, text, lines }
    }

    /// Scene text as a single caption line.
    pub fn caption(&self) -> String {
        self.text.replace('\n', " ")
    }
}

/// Split a story into trimmed, non-empty scene blocks.
pub fn split_scenes(story: &str) -> Result<Vec<String>> {
    let scenes: Vec<String> = story
        .split(SCENE_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if scenes.is_empty() {
        return Err(VideoError::ParseError(
            "no scenes found; separate scenes with a blank line".to_string(),
        ));
    }
    Ok(scenes)
}

/// Parse a scene into dialogue lines, one per non-blank physical line.
pub fn parse_lines(scene_text: &str) -> Vec<DialogueLine> {
    let lines: Vec<DialogueLine> = scene_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| match DIALOGUE_RE.captures(line) {
            Some(caps) => DialogueLine::new(caps[1].trim(), caps[2].trim()),
            None => DialogueLine::narrator(line),
        })
        .collect();

    if lines.is_empty() {
        return vec![DialogueLine::narrator(scene_text)];
    }
    lines
}

/// Split and parse a whole story into ordered scenes.
pub fn parse_story(story: &str) -> Result<Vec<Scene>> {
    let scenes = split_scenes(story)?
        .into_iter()
        .enumerate()
        .map(|(i, text)| Scene::new(i + 1, text))
        .collect();
    Ok(scenes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines_and_drops_empty_blocks() {
        let scenes = split_scenes("One.\n\n   \n\nTwo.\nStill two.\n\n").unwrap();
        assert_eq!(scenes, vec!["One.", "Two.\nStill two."]);
    }

    #[test]
    fn empty_story_is_a_parse_error() {
        let err = split_scenes("\n\n  \n\n").unwrap_err();
        assert!(matches!(err, VideoError::ParseError(_)));
        assert!(split_scenes("").is_err());
    }

    #[test]
    fn dialogue_prefix_sets_speaker() {
        let lines = parse_lines("Andy:   Hello there.  \nBella Rose: Hi!\nmr-x_2 : ok");
        assert_eq!(
            lines,
            vec![
                DialogueLine::new("Andy", "Hello there."),
                DialogueLine::new("Bella Rose", "Hi!"),
                DialogueLine::new("mr-x_2", "ok"),
            ]
        );
    }

    #[test]
    fn lines_without_prefix_go_to_narrator() {
        let lines = parse_lines("She walked away.\n1984: a year\n: nobody\nAndy:");
        assert!(lines.iter().all(|l| l.speaker == NARRATOR));
        assert_eq!(lines[0].text, "She walked away.");
        assert_eq!(lines[1].text, "1984: a year");
        assert_eq!(lines[3].text, "Andy:");
    }

    #[test]
    fn overlong_name_is_narration() {
        let name = "A".repeat(50);
        let line = format!("{name}: too long to be a name");
        let lines = parse_lines(&line);
        assert_eq!(lines[0].speaker, NARRATOR);
        assert_eq!(lines[0].text, line);

        let name = "A".repeat(49);
        let lines = parse_lines(&format!("{name}: fits"));
        assert_eq!(lines[0].speaker, name);
    }

    #[test]
    fn speaker_match_is_case_sensitive_and_per_line() {
        let lines = parse_lines("andy: lower\nAndy\n: split across lines");
        assert_eq!(lines[0], DialogueLine::new("andy", "lower"));
        assert_eq!(lines[1], DialogueLine::narrator("Andy"));
        assert_eq!(lines[2], DialogueLine::narrator(": split across lines"));
    }

    #[test]
    fn blank_scene_normalizes_to_single_narrator_line() {
        let lines = parse_lines("   ");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].speaker, NARRATOR);
    }

    #[test]
    fn parsing_preserves_line_count_and_order() {
        let story = "Andy: one\ntwo\n\n\nthree\nBella: four\n\nfive";
        let expected: Vec<&str> = story
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let scenes = parse_story(story).unwrap();
        let texts: Vec<String> = scenes
            .iter()
            .flat_map(|s| s.lines.iter())
            .map(|l| {
                if l.speaker == NARRATOR {
                    l.text.clone()
                } else {
                    format!("{}: {}", l.speaker, l.text)
                }
            })
            .collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn two_scene_story() {
        let scenes = parse_story("Andy: Hello there.\n\nShe walked away.").unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].index, 1);
        assert_eq!(scenes[0].lines, vec![DialogueLine::new("Andy", "Hello there.")]);
        assert_eq!(scenes[1].index, 2);
        assert_eq!(scenes[1].lines, vec![DialogueLine::narrator("She walked away.")]);
    }

    #[test]
    fn caption_flattens_line_breaks() {
        let scene = Scene::new(1, "Andy: Hi.\nShe smiled.".to_string());
        assert_eq!(scene.caption(), "Andy: Hi. She smiled.");

        let scene = Scene::new(2, "a\n   \nb".to_string());
        assert_eq!(scene.caption(), "a     b");
    }
}
