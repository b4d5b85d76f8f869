//! Transcript store
//!
//! Holds the conversation text for the active question as one growing
//! string. Turns are separated by [`TURN_DELIMITER`]; nothing else about the
//! structure is persisted.

use serde::Serialize;

/// Boundary between turns; rendered as a horizontal separator
pub const TURN_DELIMITER: &str = "<br><br>";

/// Accumulated conversation text. Growth is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    text: String,
    /// Bumped on every mutation so views can tell when to re-render
    revision: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear to the empty string
    pub fn reset(&mut self) {
        self.text.clear();
        self.revision += 1;
    }

    /// Append a fragment verbatim
    pub fn append(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.revision += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sections between turn delimiters, in order. Empty sections are kept so
    /// a trailing delimiter still shows its separator.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.text.split(TURN_DELIMITER)
    }
}
