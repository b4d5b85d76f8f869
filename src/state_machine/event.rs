//! Events that drive the session

use super::state::{CheckId, StreamId};
use crate::model::{Assessment, Question, QuestionId};

/// Inputs to [`super::transition`]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Provider events
    AssessmentLoaded {
        assessment: Assessment,
    },
    QuestionsLoaded {
        questions: Vec<Question>,
    },
    QuestionsFailed {
        message: String,
    },

    // Navigation
    SelectQuestion {
        index: usize,
    },
    Advance,

    // Answer editing
    /// Editor change for the active question
    EditAnswer {
        text: String,
    },
    SetAnswer {
        question_id: QuestionId,
        text: String,
    },

    // Grading
    CheckAnswer {
        question_id: QuestionId,
        answer: String,
    },
    CheckResult {
        check_id: CheckId,
        correct: bool,
    },
    CheckFailed {
        check_id: CheckId,
        message: String,
    },

    // Conversation
    ExplainRequested,
    ChatSubmitted {
        message: String,
    },
    RestartChat,
    StreamFragment {
        stream_id: StreamId,
        text: String,
    },
    StreamDone {
        stream_id: StreamId,
    },
    StreamFailed {
        stream_id: StreamId,
        message: String,
    },

    // Lifecycle
    /// The view is going away; open work is abandoned
    Teardown,
}

impl Event {
    /// Short name for logs, without payloads
    pub fn name(&self) -> &'static str {
        match self {
            Event::AssessmentLoaded { .. } => "assessment_loaded",
            Event::QuestionsLoaded { .. } => "questions_loaded",
            Event::QuestionsFailed { .. } => "questions_failed",
            Event::SelectQuestion { .. } => "select_question",
            Event::Advance => "advance",
            Event::EditAnswer { .. } => "edit_answer",
            Event::SetAnswer { .. } => "set_answer",
            Event::CheckAnswer { .. } => "check_answer",
            Event::CheckResult { .. } => "check_result",
            Event::CheckFailed { .. } => "check_failed",
            Event::ExplainRequested => "explain_requested",
            Event::ChatSubmitted { .. } => "chat_submitted",
            Event::RestartChat => "restart_chat",
            Event::StreamFragment { .. } => "stream_fragment",
            Event::StreamDone { .. } => "stream_done",
            Event::StreamFailed { .. } => "stream_failed",
            Event::Teardown => "teardown",
        }
    }
}
