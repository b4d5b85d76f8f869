//! Assessment and question types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name used until the assessment metadata arrives (or when it has none)
pub const DEFAULT_ASSESSMENT_NAME: &str = "Assessment";

/// Fixed choices offered for true/false questions
pub const BOOLEAN_CHOICES: [&str; 2] = ["true", "false"];

/// Stable identifier of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub i64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub i64);

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a question is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "MCQ")]
    MultipleChoice,
    #[serde(rename = "BOOL")]
    BooleanChoice,
    #[serde(rename = "LATEX")]
    FreeformMath,
}

impl QuestionKind {
    /// Name used on the wire by the question store and grading service
    pub fn wire_name(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "MCQ",
            QuestionKind::BooleanChoice => "BOOL",
            QuestionKind::FreeformMath => "LATEX",
        }
    }

    /// Whether the answer is picked from a fixed list rather than typed
    pub fn is_choice(self) -> bool {
        !matches!(self, QuestionKind::FreeformMath)
    }
}

/// Result of a completed grading attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub correct: bool,
    /// The answer text that was submitted for this grade
    pub answer: String,
}

/// Per-question progress as shown to the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Unanswered,
    /// Answer typed but not graded, or edited since the last grade
    Drafted,
    Pending,
    Correct,
    Incorrect,
}

/// One assessment item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub kind: QuestionKind,
    /// Ordered options, only meaningful for multiple choice
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub given_answer: String,
    /// Present once a grading attempt has completed. Editing the answer
    /// afterwards does not clear it.
    #[serde(default)]
    pub grade: Option<Grade>,
}

impl Question {
    pub fn new(id: QuestionId, prompt: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            kind,
            options: Vec::new(),
            given_answer: String::new(),
            grade: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Choices the learner can pick from; empty for freeform questions
    pub fn choices(&self) -> Vec<&str> {
        match self.kind {
            QuestionKind::MultipleChoice => self.options.iter().map(String::as_str).collect(),
            QuestionKind::BooleanChoice => BOOLEAN_CHOICES.to_vec(),
            QuestionKind::FreeformMath => Vec::new(),
        }
    }

    pub fn is_answered(&self) -> bool {
        self.grade.is_some()
    }

    /// `None` until a grade exists
    pub fn is_correct(&self) -> Option<bool> {
        self.grade.as_ref().map(|grade| grade.correct)
    }

    /// True when the answer was edited after the last grade
    pub fn is_grade_stale(&self) -> bool {
        self.grade
            .as_ref()
            .is_some_and(|grade| grade.answer != self.given_answer)
    }

    pub fn status(&self, pending: bool) -> AnswerStatus {
        if pending {
            return AnswerStatus::Pending;
        }
        match &self.grade {
            Some(grade) if grade.answer == self.given_answer => {
                if grade.correct {
                    AnswerStatus::Correct
                } else {
                    AnswerStatus::Incorrect
                }
            }
            Some(_) => AnswerStatus::Drafted,
            None if self.given_answer.is_empty() => AnswerStatus::Unanswered,
            None => AnswerStatus::Drafted,
        }
    }

    /// Check or cross shown next to the question in a navigator. Follows the
    /// recorded grade even when it is stale.
    pub fn marker(&self) -> &'static str {
        match self.is_correct() {
            Some(true) => "✓",
            Some(false) => "×",
            None => "",
        }
    }
}

/// Read-only assessment metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub name: String,
}

impl Assessment {
    /// Placeholder used while the metadata is loading
    pub fn placeholder(id: AssessmentId) -> Self {
        Self {
            id,
            name: DEFAULT_ASSESSMENT_NAME.to_string(),
        }
    }
}
