//! Session runtime executor

use super::traits::{Grader, QuestionProvider, StreamSource};
use super::{SessionHandle, SessionUpdate};
use crate::model::AssessmentId;
use crate::state_machine::{transition, Effect, Event, SessionState, StreamId};
use crate::stream::consume;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Generic session runtime that can work with any provider, grader and
/// stream implementations
pub struct SessionRuntime<P, G, S>
where
    P: QuestionProvider + 'static,
    G: Grader + 'static,
    S: StreamSource + 'static,
{
    session: Session<P, G, S>,
    /// Cloned into handles; dropped when the loop starts
    event_tx: mpsc::Sender<Event>,
}

struct Session<P, G, S> {
    assessment_id: AssessmentId,
    state: SessionState,
    provider: Arc<P>,
    grader: Arc<G>,
    streams: Arc<S>,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so the loop ends once every handle is dropped
    event_tx: mpsc::WeakSender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
    /// One token per stream still open
    stream_tokens: HashMap<StreamId, CancellationToken>,
}

impl<P, G, S> SessionRuntime<P, G, S>
where
    P: QuestionProvider + 'static,
    G: Grader + 'static,
    S: StreamSource + 'static,
{
    pub fn new(assessment_id: AssessmentId, provider: P, grader: G, streams: S) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (broadcast_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            session: Session {
                assessment_id,
                state: SessionState::new(assessment_id),
                provider: Arc::new(provider),
                grader: Arc::new(grader),
                streams: Arc::new(streams),
                event_rx,
                event_tx: event_tx.downgrade(),
                broadcast_tx,
                stream_tokens: HashMap::new(),
            },
            event_tx,
        }
    }

    /// Handle for sending events and subscribing to updates. Subscribe before
    /// [`Self::spawn`] to see the first snapshot.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            event_tx: self.event_tx.clone(),
            broadcast_tx: self.session.broadcast_tx.clone(),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until teardown, or until every handle is dropped and no
    /// background task is left holding a sender.
    pub async fn run(self) {
        let Self { session, event_tx } = self;
        drop(event_tx);
        session.run().await;
    }
}

impl<P, G, S> Session<P, G, S>
where
    P: QuestionProvider + 'static,
    G: Grader + 'static,
    S: StreamSource + 'static,
{
    async fn run(mut self) {
        tracing::info!(assessment_id = %self.assessment_id, "Starting session runtime");
        self.publish(false);
        self.load_questions();

        while let Some(event) = self.event_rx.recv().await {
            let teardown = matches!(event, Event::Teardown);
            self.process_event(event);
            if teardown {
                break;
            }
        }

        for (stream_id, token) in self.stream_tokens.drain() {
            tracing::debug!(%stream_id, "Closing stream on shutdown");
            token.cancel();
        }
        let _ = self.broadcast_tx.send(SessionUpdate::Closed);
        tracing::info!(assessment_id = %self.assessment_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        // A finished stream no longer needs its token
        if let Event::StreamDone { stream_id } | Event::StreamFailed { stream_id, .. } = &event {
            self.stream_tokens.remove(stream_id);
        }

        let name = event.name();
        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(event = name, error = %e, "Transition rejected");
                let _ = self.broadcast_tx.send(SessionUpdate::Error {
                    message: e.to_string(),
                });
                return;
            }
        };

        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestGrade { check_id, request } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    tracing::debug!(%check_id, "No handles left, grade not requested");
                    return;
                };
                let grader = self.grader.clone();
                tokio::spawn(async move {
                    tracing::info!(%check_id, question_id = %request.question_id, "Requesting grade");
                    let event = match grader.grade(&request).await {
                        Ok(correct) => Event::CheckResult { check_id, correct },
                        Err(e) => {
                            tracing::error!(%check_id, error = %e, "Grading request failed");
                            Event::CheckFailed {
                                check_id,
                                message: e.message,
                            }
                        }
                    };
                    // The session may have been torn down meanwhile
                    if event_tx.send(event).await.is_err() {
                        tracing::debug!(%check_id, "Grade discarded, session closed");
                    }
                });
            }

            Effect::OpenStream { stream_id, request } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    tracing::debug!(%stream_id, "No handles left, stream not opened");
                    return;
                };
                let cancel = CancellationToken::new();
                self.stream_tokens.insert(stream_id, cancel.clone());
                let streams = self.streams.clone();
                tokio::spawn(async move {
                    tracing::info!(%stream_id, purpose = ?request.purpose(), "Opening stream");
                    let opened = tokio::select! {
                        biased;

                        () = cancel.cancelled() => {
                            tracing::debug!(%stream_id, "Stream closed before it opened");
                            return;
                        }

                        opened = streams.open(&request) => opened,
                    };

                    match opened {
                        Ok(payloads) => {
                            let outcome = consume(stream_id, payloads, cancel, event_tx).await;
                            tracing::debug!(%stream_id, ?outcome, "Stream finished");
                        }
                        Err(e) => {
                            tracing::error!(%stream_id, error = %e, "Failed to open stream");
                            let _ = event_tx
                                .send(Event::StreamFailed {
                                    stream_id,
                                    message: e.message,
                                })
                                .await;
                        }
                    }
                });
            }

            Effect::CloseStream { stream_id } => {
                if let Some(token) = self.stream_tokens.remove(&stream_id) {
                    tracing::info!(%stream_id, "Closing stream");
                    token.cancel();
                }
            }

            Effect::Render { follow_transcript } => self.publish(follow_transcript),

            Effect::NotifyError { message } => {
                tracing::warn!(error = %message, "Session error");
                let _ = self.broadcast_tx.send(SessionUpdate::Error { message });
            }
        }
    }

    fn publish(&self, follow_transcript: bool) {
        // No subscribers is fine; the view may not be attached yet
        let _ = self.broadcast_tx.send(SessionUpdate::Snapshot {
            state: Arc::new(self.state.clone()),
            follow_transcript,
        });
    }

    /// Fetch the assessment and its questions in the background
    fn load_questions(&self) {
        let Some(event_tx) = self.event_tx.upgrade() else {
            return;
        };
        let provider = self.provider.clone();
        let id = self.assessment_id;
        tokio::spawn(async move {
            match provider.assessment(id).await {
                Ok(assessment) => {
                    let _ = event_tx.send(Event::AssessmentLoaded { assessment }).await;
                }
                Err(e) => {
                    tracing::warn!(assessment_id = %id, error = %e, "Failed to fetch assessment");
                }
            }

            let event = match provider.questions(id).await {
                Ok(questions) => Event::QuestionsLoaded { questions },
                Err(e) => {
                    tracing::error!(assessment_id = %id, error = %e, "Failed to fetch questions");
                    Event::QuestionsFailed { message: e.message }
                }
            };
            let _ = event_tx.send(event).await;
        });
    }
}
