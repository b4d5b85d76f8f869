//! Runtime for one assessment session
//!
//! Owns the session state, feeds events through the state machine and
//! carries out the resulting effects as background tasks.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::state_machine::{Event, SessionState};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// Updates published to the view
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Full replacement of the visible state
    Snapshot {
        state: Arc<SessionState>,
        /// Scroll the transcript to its newest content
        follow_transcript: bool,
    },
    Error {
        message: String,
    },
    /// The runtime stopped after teardown
    Closed,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session has ended")]
    SessionClosed,
}

/// Handle to interact with a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    pub async fn send(&self, event: Event) -> Result<(), RuntimeError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::SessionClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.broadcast_tx.subscribe()
    }
}
