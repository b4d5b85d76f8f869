//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::backend::{BackendError, GradeRequest, StreamRequest};
use crate::model::{Assessment, AssessmentId, Question};
use crate::stream::PayloadStream;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote judge of candidate answers
#[async_trait]
pub trait Grader: Send + Sync {
    /// Returns whether the answer is correct
    async fn grade(&self, request: &GradeRequest) -> Result<bool, BackendError>;
}

/// Opens server-sent text streams
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Open one connection; dropping the returned stream closes it
    async fn open(&self, request: &StreamRequest) -> Result<PayloadStream, BackendError>;
}

/// Source of the assessment and its questions
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn assessment(&self, id: AssessmentId) -> Result<Assessment, BackendError>;

    /// Questions in display order
    async fn questions(&self, id: AssessmentId) -> Result<Vec<Question>, BackendError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Grader + ?Sized> Grader for Arc<T> {
    async fn grade(&self, request: &GradeRequest) -> Result<bool, BackendError> {
        (**self).grade(request).await
    }
}

#[async_trait]
impl<T: StreamSource + ?Sized> StreamSource for Arc<T> {
    async fn open(&self, request: &StreamRequest) -> Result<PayloadStream, BackendError> {
        (**self).open(request).await
    }
}

#[async_trait]
impl<T: QuestionProvider + ?Sized> QuestionProvider for Arc<T> {
    async fn assessment(&self, id: AssessmentId) -> Result<Assessment, BackendError> {
        (**self).assessment(id).await
    }

    async fn questions(&self, id: AssessmentId) -> Result<Vec<Question>, BackendError> {
        (**self).questions(id).await
    }
}
