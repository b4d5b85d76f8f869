//! Backend collaborators
//!
//! Grading service, streaming explanation/chat endpoints and question
//! provider, reached over HTTP or (for questions) from a local file.

mod error;
mod file;
mod http;
mod types;

pub use error::{BackendError, BackendErrorKind};
pub use file::JsonFileProvider;
pub use http::HttpBackend;
pub use types::{
    AssessmentRow, Correctness, GradeReply, GradeRequest, QuestionRow, StreamPurpose,
    StreamRequest,
};
