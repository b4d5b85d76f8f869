//! Effects produced by state transitions

use super::state::{CheckId, StreamId};
use crate::backend::{GradeRequest, StreamRequest};

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a grading request (spawned as a background task)
    RequestGrade {
        check_id: CheckId,
        request: GradeRequest,
    },

    /// Open a stream whose fragments are tagged with `stream_id`
    OpenStream {
        stream_id: StreamId,
        request: StreamRequest,
    },

    /// Close a stream if it is still open
    CloseStream { stream_id: StreamId },

    /// Publish the new state to the view
    Render {
        /// Scroll the transcript to its newest content
        follow_transcript: bool,
    },

    /// Surface a failure to the learner
    NotifyError { message: String },
}

impl Effect {
    pub fn render() -> Self {
        Effect::Render {
            follow_transcript: false,
        }
    }

    pub fn render_following() -> Self {
        Effect::Render {
            follow_transcript: true,
        }
    }

    pub fn notify_error(message: impl Into<String>) -> Self {
        Effect::NotifyError {
            message: message.into(),
        }
    }
}
