//! Terminal front-end state and key handling
//!
//! Everything here is synchronous so it can be tested without a terminal:
//! keys become [`Action`]s, runtime updates replace the snapshot.

use crate::model::QuestionId;
use crate::runtime::SessionUpdate;
use crate::state_machine::{Event, SessionState};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;

/// Lines moved per PageUp/PageDown
const SCROLL_STEP: u16 = 5;

/// Pane receiving typed characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Answer,
    Chat,
}

/// What the run loop should do after a key
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Send(Event),
    Quit,
}

pub struct App {
    /// Latest state from the runtime; `None` until the first snapshot
    pub session: Option<Arc<SessionState>>,
    pub focus: Focus,
    /// Local copy of the answer editor so fast typing never reads a stale
    /// snapshot
    pub draft: String,
    pub choice_cursor: usize,
    pub chat_input: String,
    /// Digits typed after Ctrl-G
    pub goto: Option<String>,
    /// Last error reported by the session
    pub notice: Option<String>,
    /// Lines scrolled up from the bottom of the transcript
    pub scroll_back: u16,
    active_question: Option<QuestionId>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            session: None,
            focus: Focus::Answer,
            draft: String::new(),
            choice_cursor: 0,
            chat_input: String::new(),
            goto: None,
            notice: None,
            scroll_back: 0,
            active_question: None,
        }
    }

    /// Apply a runtime update. Returns `false` once the session has closed.
    pub fn apply_update(&mut self, update: SessionUpdate) -> bool {
        match update {
            SessionUpdate::Snapshot {
                state,
                follow_transcript,
            } => {
                self.sync_question(&state);
                if follow_transcript {
                    self.scroll_back = 0;
                }
                self.session = Some(state);
                true
            }
            SessionUpdate::Error { message } => {
                self.notice = Some(message);
                true
            }
            SessionUpdate::Closed => false,
        }
    }

    /// Reload the editor when the active question changes
    fn sync_question(&mut self, state: &SessionState) {
        let active = state.active_question();
        let id = active.map(|q| q.id);
        if id == self.active_question {
            return;
        }
        self.active_question = id;
        self.draft.clone_from(&state.current_answer);
        self.choice_cursor = active
            .and_then(|q| q.choices().iter().position(|c| *c == state.current_answer))
            .unwrap_or(0);
        self.scroll_back = 0;
        self.notice = None;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        if self.goto.is_some() {
            return self.handle_goto_key(key.code);
        }

        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char('n') if ctrl => Action::Send(Event::Advance),
            KeyCode::Char('g') if ctrl => {
                self.goto = Some(String::new());
                Action::None
            }
            KeyCode::Char('e') if ctrl => Action::Send(Event::ExplainRequested),
            KeyCode::Char('r') if ctrl => Action::Send(Event::RestartChat),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Answer => Focus::Chat,
                    Focus::Chat => Focus::Answer,
                };
                Action::None
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(SCROLL_STEP);
                Action::None
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(SCROLL_STEP);
                Action::None
            }
            code if !ctrl => match self.focus {
                Focus::Answer => self.handle_answer_key(code),
                Focus::Chat => self.handle_chat_key(code),
            },
            _ => Action::None,
        }
    }

    fn handle_goto_key(&mut self, code: KeyCode) -> Action {
        let Some(digits) = self.goto.as_mut() else {
            return Action::None;
        };
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                digits.push(c);
                Action::None
            }
            KeyCode::Backspace => {
                digits.pop();
                Action::None
            }
            KeyCode::Enter => {
                let number = digits.parse::<usize>().ok();
                self.goto = None;
                match number {
                    // Shown 1-based
                    Some(n) if n > 0 => Action::Send(Event::SelectQuestion { index: n - 1 }),
                    _ => Action::None,
                }
            }
            KeyCode::Esc => {
                self.goto = None;
                Action::None
            }
            _ => Action::None,
        }
    }

    fn handle_answer_key(&mut self, code: KeyCode) -> Action {
        let Some(state) = self.session.clone() else {
            return Action::None;
        };
        let Some(question) = state.active_question() else {
            return Action::None;
        };
        let choices = question.choices();

        match code {
            KeyCode::Enter => {
                // The draft may be ahead of the last snapshot
                if state.is_checking_with_ai() || self.draft.is_empty() {
                    return Action::None;
                }
                Action::Send(Event::CheckAnswer {
                    question_id: question.id,
                    answer: self.draft.clone(),
                })
            }
            KeyCode::Up | KeyCode::Down if !choices.is_empty() => {
                self.choice_cursor = if code == KeyCode::Up {
                    self.choice_cursor.checked_sub(1).unwrap_or(choices.len() - 1)
                } else {
                    (self.choice_cursor + 1) % choices.len()
                };
                self.draft = choices[self.choice_cursor].to_string();
                Action::Send(Event::EditAnswer {
                    text: self.draft.clone(),
                })
            }
            KeyCode::Char(c) if choices.is_empty() => {
                self.draft.push(c);
                Action::Send(Event::EditAnswer {
                    text: self.draft.clone(),
                })
            }
            KeyCode::Backspace if choices.is_empty() => {
                if self.draft.pop().is_none() {
                    return Action::None;
                }
                Action::Send(Event::EditAnswer {
                    text: self.draft.clone(),
                })
            }
            _ => Action::None,
        }
    }

    fn handle_chat_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Char(c) => {
                self.chat_input.push(c);
                Action::None
            }
            KeyCode::Backspace => {
                self.chat_input.pop();
                Action::None
            }
            KeyCode::Enter => {
                if self.chat_input.trim().is_empty() {
                    return Action::None;
                }
                let message = std::mem::take(&mut self.chat_input);
                Action::Send(Event::ChatSubmitted { message })
            }
            _ => Action::None,
        }
    }
}
