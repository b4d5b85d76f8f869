//! HTTP client for the tutoring backend

use super::{AssessmentRow, BackendError, GradeReply, GradeRequest, QuestionRow, StreamRequest};
use crate::config::TutorConfig;
use crate::model::{Assessment, AssessmentId, Question};
use crate::runtime::{Grader, QuestionProvider, StreamSource};
use crate::stream::{PayloadStream, SseDecoder};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Instant;

/// Grading, streaming and question endpoints of one backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// One-shot requests, bounded by the request timeout
    client: Client,
    /// Streams stay open as long as the server keeps sending
    stream_client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &TutorConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::network(format!("Failed to create HTTP client: {e}")))?;
        let stream_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            stream_client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self.client.get(self.endpoint(path)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::status(format!("HTTP {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| BackendError::decode(format!("Failed to parse {path}: {e}")))
    }
}

#[async_trait]
impl Grader for HttpBackend {
    async fn grade(&self, request: &GradeRequest) -> Result<bool, BackendError> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint("checkwithai"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let result = match serde_json::from_str::<GradeReply>(&body) {
            // An error payload explains the failure better than the status
            Ok(reply @ GradeReply::Failed { .. }) => reply.into_result(),
            _ if !status.is_success() => {
                Err(BackendError::status(format!("HTTP {status}: {body}")))
            }
            Ok(reply) => reply.into_result(),
            Err(e) => Err(BackendError::decode(format!(
                "Failed to parse grading reply: {e} - body: {body}"
            ))),
        };

        match &result {
            Ok(correct) => tracing::info!(
                question_id = %request.question_id,
                correct,
                duration_ms = %start.elapsed().as_millis(),
                "Grading completed"
            ),
            Err(e) => tracing::error!(
                question_id = %request.question_id,
                duration_ms = %start.elapsed().as_millis(),
                error = %e,
                "Grading failed"
            ),
        }
        result
    }
}

#[async_trait]
impl StreamSource for HttpBackend {
    async fn open(&self, request: &StreamRequest) -> Result<PayloadStream, BackendError> {
        let (key, value) = request.query()?;
        let response = self
            .stream_client
            .get(self.endpoint(request.endpoint()))
            .query(&[(key, value)])
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::status(format!(
                "HTTP {status} from {}",
                request.endpoint()
            )));
        }
        tracing::info!(endpoint = request.endpoint(), "Stream opened");

        let mut decoder = SseDecoder::new();
        let payloads = response
            .bytes_stream()
            .flat_map(move |chunk| {
                let items: Vec<Result<String, BackendError>> = match chunk {
                    Ok(bytes) => decoder
                        .push(&bytes)
                        .into_iter()
                        .map(|message| Ok(message.data))
                        .collect(),
                    Err(e) => vec![Err(BackendError::network(format!(
                        "Stream interrupted: {e}"
                    )))],
                };
                stream::iter(items)
            })
            .boxed();
        Ok(payloads)
    }
}

#[async_trait]
impl QuestionProvider for HttpBackend {
    async fn assessment(&self, id: AssessmentId) -> Result<Assessment, BackendError> {
        let row: AssessmentRow = self.get_json(&format!("assessments/{id}")).await?;
        Ok(row.into())
    }

    async fn questions(&self, id: AssessmentId) -> Result<Vec<Question>, BackendError> {
        let rows: Vec<QuestionRow> = self
            .get_json(&format!("assessments/{id}/questions"))
            .await?;
        tracing::info!(assessment_id = %id, count = rows.len(), "Questions fetched");
        Ok(rows.into_iter().map(Question::from).collect())
    }
}
