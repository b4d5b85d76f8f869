//! Chat turns and history reconstruction
//!
//! The transcript is the only record of the conversation, so the history sent
//! with each chat message is re-derived from it by splitting on the turn
//! delimiter.

use crate::transcript::{Transcript, TURN_DELIMITER};
use serde::{Deserialize, Serialize};

/// Label written before a learner message in the transcript
pub const USER_LABEL: &str = "User: ";

/// Label written before the assistant reply in the transcript
pub const ASSISTANT_LABEL: &str = "Assistant: ";

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the chat history sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Rebuild the turn sequence from the transcript and append `message`.
///
/// Every historical segment is labelled as a user turn, including ones the
/// assistant wrote.
pub fn reconstruct_turns(transcript: &str, message: &str) -> Vec<Turn> {
    transcript
        .split(TURN_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(Turn::user)
        .chain(std::iter::once(Turn::user(message)))
        .collect()
}

/// JSON array of `{role, content}` objects
pub fn serialize_turns(turns: &[Turn]) -> Result<String, serde_json::Error> {
    serde_json::to_string(turns)
}

/// Text appended to the transcript when a chat message is sent, so the reply
/// streams in as its own labelled turn.
pub fn chat_preamble(transcript: &Transcript, message: &str) -> String {
    let lead = if transcript.is_empty() { "" } else { TURN_DELIMITER };
    format!("{lead}{USER_LABEL}{message}{TURN_DELIMITER}{ASSISTANT_LABEL}")
}

/// Separator placed before a streamed explanation when the transcript already
/// has content
pub fn explanation_preamble(transcript: &Transcript) -> &'static str {
    if transcript.is_empty() {
        ""
    } else {
        TURN_DELIMITER
    }
}
