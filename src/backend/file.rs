//! Question provider backed by a local JSON file
//!
//! The file holds one assessment:
//!
//! ```json
//! { "id": 3, "name": "Algebra", "questions": [ { "id": 1, "question": "...", "question_type": "MCQ", "answers": ["A", "B"] } ] }
//! ```

use super::{AssessmentRow, BackendError, QuestionRow};
use crate::model::{Assessment, AssessmentId, Question};
use crate::runtime::QuestionProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct AssessmentFile {
    #[serde(flatten)]
    assessment: AssessmentRow,
    #[serde(default)]
    questions: Vec<QuestionRow>,
}

pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self, id: AssessmentId) -> Result<AssessmentFile, BackendError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            BackendError::io(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        let file: AssessmentFile = serde_json::from_str(&contents).map_err(|e| {
            BackendError::decode(format!("Failed to parse {}: {e}", self.path.display()))
        })?;
        if file.assessment.id != id {
            tracing::warn!(
                requested = %id,
                found = %file.assessment.id,
                path = %self.path.display(),
                "Questions file holds a different assessment"
            );
        }
        Ok(file)
    }
}

#[async_trait]
impl QuestionProvider for JsonFileProvider {
    async fn assessment(&self, id: AssessmentId) -> Result<Assessment, BackendError> {
        Ok(self.load(id).await?.assessment.into())
    }

    async fn questions(&self, id: AssessmentId) -> Result<Vec<Question>, BackendError> {
        let file = self.load(id).await?;
        Ok(file.questions.into_iter().map(Question::from).collect())
    }
}
