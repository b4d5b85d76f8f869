//! Wire types for the backend endpoints
//!
//! Responses are decoded into tagged shapes here so nothing past this module
//! sees untyped JSON.

use super::BackendError;
use crate::conversation::{serialize_turns, Turn};
use crate::model::{
    Assessment, AssessmentId, Grade, Question, QuestionId, QuestionKind, DEFAULT_ASSESSMENT_NAME,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Grading
// ============================================================================

/// Body of a grading request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeRequest {
    pub question_id: QuestionId,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(rename = "question_type")]
    pub kind: QuestionKind,
    #[serde(rename = "answers", skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub answer: String,
}

impl GradeRequest {
    pub fn new(question: &Question, answer: impl Into<String>) -> Self {
        Self {
            question_id: question.id,
            prompt: question.prompt.clone(),
            kind: question.kind,
            options: question.options.clone(),
            answer: answer.into(),
        }
    }
}

/// The grader reports correctness either as a boolean or as `1`/`0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Correctness {
    Flag(bool),
    Score(i64),
}

impl Correctness {
    pub fn is_correct(self) -> bool {
        match self {
            Correctness::Flag(flag) => flag,
            Correctness::Score(score) => score != 0,
        }
    }
}

/// Grading response body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GradeReply {
    Graded { correct: Correctness },
    Failed { error: String },
}

impl GradeReply {
    pub fn into_result(self) -> Result<bool, BackendError> {
        match self {
            GradeReply::Graded { correct } => Ok(correct.is_correct()),
            GradeReply::Failed { error } => Err(BackendError::rejected(error)),
        }
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// What a stream was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPurpose {
    Explanation,
    Chat,
}

/// Request for one streamed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRequest {
    /// "How do I solve this?" for the given problem text
    Explanation { problem: String },
    /// Chat reply given the reconstructed history, new message last
    Chat { turns: Vec<Turn> },
}

impl StreamRequest {
    pub fn purpose(&self) -> StreamPurpose {
        match self {
            StreamRequest::Explanation { .. } => StreamPurpose::Explanation,
            StreamRequest::Chat { .. } => StreamPurpose::Chat,
        }
    }

    /// Path of the endpoint, relative to the backend root
    pub fn endpoint(&self) -> &'static str {
        match self {
            StreamRequest::Explanation { .. } => "explanation",
            StreamRequest::Chat { .. } => "chat",
        }
    }

    /// Single query parameter carrying the request; URL encoding is left to
    /// the HTTP client
    pub fn query(&self) -> Result<(&'static str, String), BackendError> {
        match self {
            StreamRequest::Explanation { problem } => Ok(("problem", problem.clone())),
            StreamRequest::Chat { turns } => Ok(("messages", serialize_turns(turns)?)),
        }
    }
}

// ============================================================================
// Question provider
// ============================================================================

/// Assessment row as stored
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentRow {
    pub id: AssessmentId,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<AssessmentRow> for Assessment {
    fn from(row: AssessmentRow) -> Self {
        let name = row
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ASSESSMENT_NAME.to_string());
        Assessment { id: row.id, name }
    }
}

/// Question row as stored
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRow {
    pub id: QuestionId,
    pub question: String,
    pub question_type: QuestionKind,
    #[serde(default)]
    pub answers: Option<Vec<String>>,
    #[serde(default)]
    pub given_answer: Option<String>,
    #[serde(default)]
    pub is_answered: Option<bool>,
    #[serde(default)]
    pub is_correct: Option<bool>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        let given_answer = row.given_answer.unwrap_or_default();
        // A stored grade applies to the stored answer
        let grade = row.is_answered.unwrap_or(false).then(|| Grade {
            correct: row.is_correct.unwrap_or(false),
            answer: given_answer.clone(),
        });
        Question {
            id: row.id,
            prompt: row.question,
            kind: row.question_type,
            options: row.answers.unwrap_or_default(),
            given_answer,
            grade,
        }
    }
}
