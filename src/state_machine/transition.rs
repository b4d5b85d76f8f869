//! Pure state transition function
//!
//! Every event produces a complete new [`SessionState`] plus the effects the
//! runtime must carry out. Nothing here performs I/O.

use super::state::{ActiveStream, PendingCheck, SessionState};
use super::{Effect, Event, LoadState};
use crate::backend::{GradeRequest, StreamRequest};
use crate::conversation::{chat_preamble, explanation_preamble, reconstruct_turns};
use crate::model::{Grade, QuestionId};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// State unchanged, nothing to do
    fn unchanged(state: &SessionState) -> Self {
        Self::new(state.clone())
    }
}

/// Events the session refuses in its current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A check is already in progress")]
    CheckInFlight,
    #[error("Cannot check an empty answer")]
    EmptyAnswer,
    #[error("Unknown question {0}")]
    UnknownQuestion(QuestionId),
    #[error("No question is active")]
    NoActiveQuestion,
    #[error("Cannot send an empty message")]
    EmptyMessage,
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(
    state: &SessionState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Question collection
        // ============================================================
        Event::AssessmentLoaded { assessment } => {
            let mut next = state.clone();
            next.assessment = assessment;
            Ok(TransitionResult::new(next).with_effect(Effect::render()))
        }

        Event::QuestionsLoaded { questions } => {
            let mut next = state.clone();
            next.questions = questions;
            next.load = LoadState::Ready;
            let closed = select(&mut next, 0);
            Ok(TransitionResult::new(next)
                .with_effects(closed)
                .with_effect(Effect::render()))
        }

        Event::QuestionsFailed { message } => {
            let mut next = state.clone();
            next.load = LoadState::Failed { message };
            Ok(TransitionResult::new(next).with_effect(Effect::render()))
        }

        // ============================================================
        // Navigation
        // ============================================================
        Event::SelectQuestion { index } => {
            // The navigator only offers valid indices
            if index >= state.questions.len() {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            let closed = select(&mut next, index);
            Ok(TransitionResult::new(next)
                .with_effects(closed)
                .with_effect(Effect::render()))
        }

        Event::Advance => {
            if state.questions.is_empty() || state.is_last_question() {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            let closed = select(&mut next, state.active_index + 1);
            Ok(TransitionResult::new(next)
                .with_effects(closed)
                .with_effect(Effect::render()))
        }

        // ============================================================
        // Answers
        // ============================================================
        Event::EditAnswer { text } => {
            let question_id = state
                .active_question()
                .map(|q| q.id)
                .ok_or(TransitionError::NoActiveQuestion)?;
            Ok(set_answer(state, question_id, text))
        }

        Event::SetAnswer { question_id, text } => {
            if state.question(question_id).is_none() {
                return Ok(TransitionResult::unchanged(state));
            }
            Ok(set_answer(state, question_id, text))
        }

        // ============================================================
        // Grading
        // ============================================================
        Event::CheckAnswer {
            question_id,
            answer,
        } => {
            if state.is_checking_with_ai() {
                return Err(TransitionError::CheckInFlight);
            }
            if answer.is_empty() {
                return Err(TransitionError::EmptyAnswer);
            }
            let mut next = state.clone();
            let check_id = next.allocate_check();
            let is_active = next.active_question().is_some_and(|q| q.id == question_id);
            let question = next
                .question_mut(question_id)
                .ok_or(TransitionError::UnknownQuestion(question_id))?;
            question.given_answer.clone_from(&answer);
            let request = GradeRequest::new(question, answer.clone());
            if is_active {
                next.current_answer.clone_from(&answer);
            }
            next.pending_check = Some(PendingCheck {
                id: check_id,
                question_id,
                answer,
            });
            Ok(TransitionResult::new(next)
                .with_effect(Effect::RequestGrade { check_id, request })
                .with_effect(Effect::render()))
        }

        Event::CheckResult { check_id, correct } => {
            let Some(pending) = state
                .pending_check
                .as_ref()
                .filter(|pending| pending.id == check_id)
            else {
                return Ok(TransitionResult::unchanged(state));
            };
            let mut next = state.clone();
            if let Some(question) = next.question_mut(pending.question_id) {
                question.grade = Some(Grade {
                    correct,
                    answer: pending.answer.clone(),
                });
            }
            next.pending_check = None;
            Ok(TransitionResult::new(next).with_effect(Effect::render()))
        }

        Event::CheckFailed { check_id, message } => {
            if !matches!(&state.pending_check, Some(pending) if pending.id == check_id) {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            next.pending_check = None;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render())
                .with_effect(Effect::notify_error(format!(
                    "Could not check your answer: {message}"
                ))))
        }

        // ============================================================
        // Conversation
        // ============================================================
        Event::ExplainRequested => {
            let question = state
                .active_question()
                .ok_or(TransitionError::NoActiveQuestion)?;
            let request = StreamRequest::Explanation {
                problem: question.prompt.clone(),
            };
            let mut next = state.clone();
            let lead = explanation_preamble(&next.transcript);
            next.transcript.append(lead);
            Ok(open_stream(next, request))
        }

        Event::ChatSubmitted { message } => {
            let message = message.trim();
            if message.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if state.active_question().is_none() {
                return Err(TransitionError::NoActiveQuestion);
            }
            // History comes from the transcript as it was before this message
            let turns = reconstruct_turns(state.transcript.as_str(), message);
            let mut next = state.clone();
            let preamble = chat_preamble(&next.transcript, message);
            next.transcript.append(&preamble);
            Ok(open_stream(next, StreamRequest::Chat { turns }))
        }

        Event::RestartChat => {
            let mut next = state.clone();
            next.transcript.reset();
            let closed = close_active_stream(&mut next);
            Ok(TransitionResult::new(next)
                .with_effects(closed)
                .with_effect(Effect::render_following()))
        }

        Event::StreamFragment { stream_id, text } => {
            if !is_active_stream(state, stream_id) {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            next.transcript.append(&text);
            Ok(TransitionResult::new(next).with_effect(Effect::render_following()))
        }

        Event::StreamDone { stream_id } => {
            if !is_active_stream(state, stream_id) {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            next.active_stream = None;
            Ok(TransitionResult::new(next).with_effect(Effect::render()))
        }

        Event::StreamFailed { stream_id, message } => {
            if !is_active_stream(state, stream_id) {
                return Ok(TransitionResult::unchanged(state));
            }
            // Fragments already appended stay in the transcript
            let mut next = state.clone();
            next.active_stream = None;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render())
                .with_effect(Effect::notify_error(format!(
                    "The reply was interrupted: {message}"
                ))))
        }

        // ============================================================
        // Lifecycle
        // ============================================================
        Event::Teardown => {
            let mut next = state.clone();
            let closed = close_active_stream(&mut next);
            // A pending grade is left to finish on its own; its result no
            // longer matches anything.
            next.pending_check = None;
            Ok(TransitionResult::new(next).with_effects(closed))
        }
    }
}

// Helper functions

/// Make `index` active: restore its answer, start a fresh transcript and
/// detach any stream tied to the question being left.
fn select(state: &mut SessionState, index: usize) -> Option<Effect> {
    state.active_index = index;
    state.current_answer = state
        .questions
        .get(index)
        .map(|q| q.given_answer.clone())
        .unwrap_or_default();
    state.transcript.reset();
    close_active_stream(state)
}

fn close_active_stream(state: &mut SessionState) -> Option<Effect> {
    state
        .active_stream
        .take()
        .map(|stream| Effect::CloseStream {
            stream_id: stream.id,
        })
}

fn is_active_stream(state: &SessionState, stream_id: super::StreamId) -> bool {
    state
        .active_stream
        .is_some_and(|stream| stream.id == stream_id)
}

fn set_answer(state: &SessionState, question_id: QuestionId, text: String) -> TransitionResult {
    let mut next = state.clone();
    if next.active_question().is_some_and(|q| q.id == question_id) {
        next.current_answer.clone_from(&text);
    }
    if let Some(question) = next.question_mut(question_id) {
        question.given_answer = text;
    }
    TransitionResult::new(next).with_effect(Effect::render())
}

/// Replace whatever stream feeds the transcript with a new one for `request`
fn open_stream(mut next: SessionState, request: StreamRequest) -> TransitionResult {
    let closed = close_active_stream(&mut next);
    let stream_id = next.allocate_stream();
    let question_id = next
        .active_question()
        .map_or(QuestionId(0), |question| question.id);
    next.active_stream = Some(ActiveStream {
        id: stream_id,
        purpose: request.purpose(),
        question_id,
    });
    TransitionResult::new(next)
        .with_effects(closed)
        .with_effect(Effect::OpenStream { stream_id, request })
        .with_effect(Effect::render_following())
}
