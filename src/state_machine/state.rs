//! Session state types

use crate::backend::StreamPurpose;
use crate::model::{AnswerStatus, Assessment, AssessmentId, Question, QuestionId};
use crate::transcript::Transcript;
use std::fmt;

/// Identifies one opened stream. Fragments carrying any other id than the
/// active one are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Identifies one grading request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckId(pub u64);

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "check-{}", self.0)
    }
}

/// Progress of the question collection load
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    /// Provider failed; the view keeps its loading placeholder
    Failed { message: String },
}

/// The grading request currently in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCheck {
    pub id: CheckId,
    pub question_id: QuestionId,
    /// Answer submitted, recorded with the grade when it arrives
    pub answer: String,
}

/// The stream currently feeding the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveStream {
    pub id: StreamId,
    pub purpose: StreamPurpose,
    /// Question whose transcript the stream writes to
    pub question_id: QuestionId,
}

/// Everything the assessment view shows. Replaced wholesale on every
/// transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub assessment: Assessment,
    pub load: LoadState,
    pub questions: Vec<Question>,
    pub active_index: usize,
    /// Editor contents for the active question
    pub current_answer: String,
    pub transcript: Transcript,
    pub pending_check: Option<PendingCheck>,
    pub active_stream: Option<ActiveStream>,
    pub(crate) next_stream: u64,
    pub(crate) next_check: u64,
}

impl SessionState {
    pub fn new(assessment_id: AssessmentId) -> Self {
        Self {
            assessment: Assessment::placeholder(assessment_id),
            load: LoadState::Loading,
            questions: Vec::new(),
            active_index: 0,
            current_answer: String::new(),
            transcript: Transcript::new(),
            pending_check: None,
            active_stream: None,
            next_stream: 1,
            next_check: 1,
        }
    }

    /// True exactly while a grading request is outstanding
    pub fn is_checking_with_ai(&self) -> bool {
        self.pending_check.is_some()
    }

    pub fn is_streaming(&self) -> bool {
        self.active_stream.is_some()
    }

    /// `None` while questions are loading or the assessment is empty
    pub fn active_question(&self) -> Option<&Question> {
        self.questions.get(self.active_index)
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub(crate) fn question_mut(&mut self, id: QuestionId) -> Option<&mut Question> {
        self.questions.iter_mut().find(|q| q.id == id)
    }

    pub fn status_of(&self, question: &Question) -> AnswerStatus {
        let pending = self
            .pending_check
            .as_ref()
            .is_some_and(|check| check.question_id == question.id);
        question.status(pending)
    }

    /// Whether the "Check" control is enabled
    pub fn can_check(&self) -> bool {
        self.active_question().is_some()
            && !self.current_answer.is_empty()
            && !self.is_checking_with_ai()
    }

    pub fn is_last_question(&self) -> bool {
        self.active_index + 1 >= self.questions.len()
    }

    /// "Question 2 of 5"
    pub fn progress_label(&self) -> String {
        format!(
            "Question {} of {}",
            self.active_index + 1,
            self.questions.len()
        )
    }

    pub(crate) fn allocate_stream(&mut self) -> StreamId {
        let id = StreamId(self.next_stream);
        self.next_stream += 1;
        id
    }

    pub(crate) fn allocate_check(&mut self) -> CheckId {
        let id = CheckId(self.next_check);
        self.next_check += 1;
        id
    }
}
