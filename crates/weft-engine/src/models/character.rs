use serde::{Deserialize, Serialize};

use super::mark::{Mark, MarkSet};

/// A single character of text and the marks applied to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(rename = "text")]
    pub ch: char,
    #[serde(default, skip_serializing_if = "MarkSet::is_empty")]
    pub marks: MarkSet,
}

impl Character {
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            marks: MarkSet::new(),
        }
    }

    pub fn with_marks(ch: char, marks: MarkSet) -> Self {
        Self { ch, marks }
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }

    /// Split a string into characters that all share `marks`
    pub fn from_str_with_marks(text: &str, marks: &MarkSet) -> Vec<Character> {
        text.chars()
            .map(|ch| Character::with_marks(ch, marks.clone()))
            .collect()
    }
}

/// Collect characters back into a string, dropping marks
pub fn characters_to_string(characters: &[Character]) -> String {
    characters.iter().map(|c| c.ch).collect()
}
