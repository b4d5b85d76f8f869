//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{SessionHandle, SessionRuntime, SessionUpdate};
use crate::backend::{BackendError, GradeRequest, StreamRequest};
use crate::model::{Assessment, AssessmentId, Question};
use crate::state_machine::{Event, SessionState};
use crate::stream::PayloadStream;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Mock Question Provider
// ============================================================================

/// Serves a fixed question list, or fails
pub struct MockProvider {
    name: String,
    questions: Result<Vec<Question>, BackendError>,
}

impl MockProvider {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            name: "Mock assessment".to_string(),
            questions: Ok(questions),
        }
    }

    pub fn failing(error: BackendError) -> Self {
        Self {
            name: "Mock assessment".to_string(),
            questions: Err(error),
        }
    }
}

#[async_trait]
impl QuestionProvider for MockProvider {
    async fn assessment(&self, id: AssessmentId) -> Result<Assessment, BackendError> {
        Ok(Assessment {
            id,
            name: self.name.clone(),
        })
    }

    async fn questions(&self, _id: AssessmentId) -> Result<Vec<Question>, BackendError> {
        self.questions.clone()
    }
}

// ============================================================================
// Mock Grader
// ============================================================================

/// Grader that returns queued replies, optionally held until released
pub struct MockGrader {
    replies: Mutex<VecDeque<Result<bool, BackendError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<GradeRequest>>,
    gate: Option<Arc<Notify>>,
}

impl MockGrader {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every reply until the returned notifier is signalled
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn queue_reply(&self, correct: bool) {
        self.replies.lock().unwrap().push_back(Ok(correct));
    }

    pub fn queue_error(&self, error: BackendError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<GradeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockGrader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Grader for MockGrader {
    async fn grade(&self, request: &GradeRequest) -> Result<bool, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::network("No mock reply queued")))
    }
}

// ============================================================================
// Mock Stream Source
// ============================================================================

/// Script for one opened stream
pub struct StreamScript {
    payloads: Vec<Result<String, BackendError>>,
    /// Keep the connection open after the scripted payloads
    hold_open: bool,
}

impl StreamScript {
    pub fn fragments(payloads: &[&str]) -> Self {
        Self {
            payloads: payloads.iter().map(|p| Ok((*p).to_string())).collect(),
            hold_open: true,
        }
    }

    /// Server hangs up after the scripted payloads
    pub fn closing(mut self) -> Self {
        self.hold_open = false;
        self
    }

    pub fn then_error(mut self, message: &str) -> Self {
        self.payloads.push(Err(BackendError::network(message)));
        self
    }
}

/// Stream source that plays queued scripts, one per open
pub struct MockStreamSource {
    scripts: Mutex<VecDeque<StreamScript>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<StreamRequest>>,
}

impl MockStreamSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, script: StreamScript) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn recorded_requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockStreamSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamSource for MockStreamSource {
    async fn open(&self, request: &StreamRequest) -> Result<PayloadStream, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BackendError::status("No mock stream queued"))?;
        let played = stream::iter(script.payloads);
        if script.hold_open {
            Ok(played.chain(stream::pending()).boxed())
        } else {
            Ok(played.boxed())
        }
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime {
    pub handle: SessionHandle,
    pub updates: broadcast::Receiver<SessionUpdate>,
    pub grader: Arc<MockGrader>,
    pub streams: Arc<MockStreamSource>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

impl TestRuntime {
    /// Create a test runtime with instant mocks
    pub fn new() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }
}

pub struct TestRuntimeBuilder {
    assessment_id: AssessmentId,
    provider: Option<MockProvider>,
    grader: Option<Arc<MockGrader>>,
    streams: Option<Arc<MockStreamSource>>,
}

impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            assessment_id: AssessmentId(1),
            provider: None,
            grader: None,
            streams: None,
        }
    }

    pub fn questions(mut self, questions: Vec<Question>) -> Self {
        self.provider = Some(MockProvider::new(questions));
        self
    }

    pub fn provider(mut self, provider: MockProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn grader(mut self, grader: MockGrader) -> Self {
        self.grader = Some(Arc::new(grader));
        self
    }

    pub fn streams(mut self, streams: MockStreamSource) -> Self {
        self.streams = Some(Arc::new(streams));
        self
    }

    pub fn build(self) -> TestRuntime {
        let provider = self.provider.unwrap_or_else(|| MockProvider::new(vec![]));
        let grader = self.grader.unwrap_or_default();
        let streams = self.streams.unwrap_or_default();

        let runtime =
            SessionRuntime::new(self.assessment_id, provider, grader.clone(), streams.clone());
        let handle = runtime.handle();
        let updates = handle.subscribe();
        let runtime_handle = runtime.spawn();

        TestRuntime {
            handle,
            updates,
            grader,
            streams,
            _runtime_handle: runtime_handle,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRuntime {
    pub async fn send(&self, event: Event) {
        self.handle.send(event).await.expect("Failed to send event");
    }

    /// Wait for a snapshot matching `predicate`
    pub async fn wait_for_state(
        &mut self,
        predicate: impl Fn(&SessionState) -> bool,
        timeout: Duration,
    ) -> Option<Arc<SessionState>> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(SessionUpdate::Snapshot { state, .. })) if predicate(state.as_ref()) => {
                    return Some(state);
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                _ => continue,
            }
        }
        None
    }

    /// Wait for an error update
    pub async fn wait_for_error(&mut self, timeout: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(SessionUpdate::Error { message })) => return Some(message),
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                _ => continue,
            }
        }
        None
    }

    /// Wait for the runtime to report it stopped
    pub async fn wait_for_closed(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(SessionUpdate::Closed) | Err(broadcast::error::RecvError::Closed)) => {
                    return true;
                }
                _ => continue,
            }
        }
        false
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, QuestionKind};
    use crate::state_machine::LoadState;

    const WAIT: Duration = Duration::from_secs(5);

    fn mcq(id: i64) -> Question {
        Question::new(QuestionId(id), format!("Question {id}"), QuestionKind::MultipleChoice)
            .with_options(["A", "B"])
    }

    async fn loaded(rt: &mut TestRuntime) -> Arc<SessionState> {
        rt.wait_for_state(|s| s.load == LoadState::Ready, WAIT)
            .await
            .expect("questions should load")
    }

    #[tokio::test]
    async fn test_loads_questions() {
        let mut rt = TestRuntime::new().questions(vec![mcq(1), mcq(2)]).build();
        let state = loaded(&mut rt).await;
        assert_eq!(state.questions.len(), 2);
        assert_eq!(state.progress_label(), "Question 1 of 2");
    }

    #[tokio::test]
    async fn test_fetch_failure_records_failed_load() {
        let mut rt = TestRuntime::new()
            .provider(MockProvider::failing(BackendError::status("HTTP 503")))
            .build();
        let state = rt
            .wait_for_state(|s| matches!(s.load, LoadState::Failed { .. }), WAIT)
            .await
            .unwrap();
        assert!(state.active_question().is_none());
    }

    #[tokio::test]
    async fn test_check_answer_success() {
        let grader = MockGrader::new();
        grader.queue_reply(true);
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1)])
            .grader(grader)
            .build();
        loaded(&mut rt).await;

        rt.send(Event::SelectQuestion { index: 0 }).await;
        rt.send(Event::EditAnswer {
            text: "A".to_string(),
        })
        .await;
        rt.send(Event::CheckAnswer {
            question_id: QuestionId(1),
            answer: "A".to_string(),
        })
        .await;

        let state = rt
            .wait_for_state(|s| s.questions[0].is_answered(), WAIT)
            .await
            .unwrap();
        assert_eq!(state.questions[0].given_answer, "A");
        assert_eq!(state.questions[0].is_correct(), Some(true));
        assert!(!state.is_checking_with_ai());
        assert_eq!(rt.grader.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_check_failure_clears_flag() {
        let grader = MockGrader::new();
        grader.queue_error(BackendError::network("connection refused"));
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1)])
            .grader(grader)
            .build();
        loaded(&mut rt).await;

        rt.send(Event::CheckAnswer {
            question_id: QuestionId(1),
            answer: "B".to_string(),
        })
        .await;
        rt.wait_for_state(SessionState::is_checking_with_ai, WAIT)
            .await
            .unwrap();

        // The settled snapshot is published before the error update
        let state = rt
            .wait_for_state(|s| !s.is_checking_with_ai(), WAIT)
            .await
            .unwrap();
        assert!(!state.questions[0].is_answered());
        assert!(state.can_check());

        let message = rt.wait_for_error(WAIT).await.unwrap();
        assert!(message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_second_check_makes_no_request() {
        let (grader, gate) = MockGrader::new().gated();
        grader.queue_reply(false);
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1)])
            .grader(grader)
            .build();
        loaded(&mut rt).await;

        let check = Event::CheckAnswer {
            question_id: QuestionId(1),
            answer: "A".to_string(),
        };
        rt.send(check.clone()).await;
        rt.send(check).await;

        let message = rt.wait_for_error(WAIT).await.unwrap();
        assert_eq!(message, "A check is already in progress");

        gate.notify_one();
        let state = rt
            .wait_for_state(|s| s.questions[0].is_answered(), WAIT)
            .await
            .unwrap();
        assert_eq!(state.questions[0].is_correct(), Some(false));
        assert_eq!(rt.grader.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_explanation_streams_into_transcript() {
        let streams = MockStreamSource::new();
        streams.queue(StreamScript::fragments(&["Hel", "lo", "[DONE]", "extra"]));
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1)])
            .streams(streams)
            .build();
        loaded(&mut rt).await;

        rt.send(Event::ExplainRequested).await;
        let state = rt
            .wait_for_state(|s| !s.is_streaming() && !s.transcript.is_empty(), WAIT)
            .await
            .unwrap();
        assert_eq!(state.transcript.as_str(), "Hello");
        assert!(matches!(
            rt.streams.recorded_requests().as_slice(),
            [StreamRequest::Explanation { problem }] if problem == "Question 1"
        ));
    }

    #[tokio::test]
    async fn test_stream_error_keeps_partial_transcript() {
        let streams = MockStreamSource::new();
        streams.queue(StreamScript::fragments(&["partial"]).then_error("reset by peer"));
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1)])
            .streams(streams)
            .build();
        loaded(&mut rt).await;

        rt.send(Event::ExplainRequested).await;
        let message = rt.wait_for_error(WAIT).await.unwrap();
        assert!(message.contains("reset by peer"));

        rt.send(Event::EditAnswer {
            text: "A".to_string(),
        })
        .await;
        let state = rt
            .wait_for_state(|s| s.current_answer == "A", WAIT)
            .await
            .unwrap();
        assert_eq!(state.transcript.as_str(), "partial");
        assert!(!state.is_streaming());
    }

    #[tokio::test]
    async fn test_hang_up_before_sentinel_is_failure() {
        let streams = MockStreamSource::new();
        streams.queue(StreamScript::fragments(&["cut"]).closing());
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1)])
            .streams(streams)
            .build();
        loaded(&mut rt).await;

        rt.send(Event::ExplainRequested).await;
        let message = rt.wait_for_error(WAIT).await.unwrap();
        assert!(message.contains("closed before the reply finished"));
    }

    #[tokio::test]
    async fn test_navigation_detaches_open_stream() {
        let streams = MockStreamSource::new();
        // Never sends the sentinel
        streams.queue(StreamScript::fragments(&["thinking"]));
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1), mcq(2)])
            .streams(streams)
            .build();
        loaded(&mut rt).await;

        rt.send(Event::ExplainRequested).await;
        rt.wait_for_state(|s| s.transcript.as_str() == "thinking", WAIT)
            .await
            .unwrap();

        rt.send(Event::SelectQuestion { index: 1 }).await;
        let state = rt
            .wait_for_state(|s| s.active_index == 1, WAIT)
            .await
            .unwrap();
        assert!(state.transcript.is_empty());
        assert!(!state.is_streaming());
    }

    #[tokio::test]
    async fn test_chat_sends_reconstructed_history() {
        let streams = MockStreamSource::new();
        streams.queue(StreamScript::fragments(&["hello", "[DONE]"]));
        streams.queue(StreamScript::fragments(&["you're welcome", "[DONE]"]));
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1)])
            .streams(streams)
            .build();
        loaded(&mut rt).await;

        rt.send(Event::ChatSubmitted {
            message: "hi".to_string(),
        })
        .await;
        rt.wait_for_state(|s| !s.is_streaming() && s.transcript.as_str().ends_with("hello"), WAIT)
            .await
            .unwrap();

        rt.send(Event::ChatSubmitted {
            message: "thanks".to_string(),
        })
        .await;
        let state = rt
            .wait_for_state(|s| s.transcript.as_str().ends_with("you're welcome"), WAIT)
            .await
            .unwrap();
        assert_eq!(
            state.transcript.as_str(),
            "User: hi<br><br>Assistant: hello<br><br>User: thanks<br><br>Assistant: you're welcome"
        );

        let requests = rt.streams.recorded_requests();
        let StreamRequest::Chat { turns } = &requests[1] else {
            panic!("expected chat request");
        };
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2].content, "thanks");
    }

    #[tokio::test]
    async fn test_teardown_stops_runtime_with_pending_grade() {
        let (grader, gate) = MockGrader::new().gated();
        grader.queue_reply(true);
        let mut rt = TestRuntime::new()
            .questions(vec![mcq(1)])
            .grader(grader)
            .build();
        loaded(&mut rt).await;

        rt.send(Event::CheckAnswer {
            question_id: QuestionId(1),
            answer: "A".to_string(),
        })
        .await;
        rt.wait_for_state(SessionState::is_checking_with_ai, WAIT)
            .await
            .unwrap();

        rt.send(Event::Teardown).await;
        assert!(rt.wait_for_closed(WAIT).await);

        // The late reply has nowhere to go and must not panic
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rt.handle.send(Event::Advance).await.is_err());
    }

    #[tokio::test]
    async fn test_dropping_every_handle_stops_runtime() {
        let runtime = SessionRuntime::new(
            AssessmentId(1),
            MockProvider::new(vec![mcq(1)]),
            MockGrader::new(),
            MockStreamSource::default(),
        );
        let handle = runtime.handle();
        let mut updates = handle.subscribe();
        let task = runtime.spawn();
        drop(handle);

        tokio::time::timeout(WAIT, task)
            .await
            .expect("runtime kept running without handles")
            .unwrap();

        let mut closed = false;
        while let Ok(update) = updates.try_recv() {
            closed |= matches!(update, SessionUpdate::Closed);
        }
        assert!(closed);
    }
}
