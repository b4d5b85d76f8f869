//! Server-sent text streams
//!
//! The explanation and chat endpoints answer with an event stream of text
//! fragments ending in a `[DONE]` payload. The server never closes the
//! connection itself, so the consumer must.

mod consumer;
pub mod sse;

pub use consumer::{consume, StreamOutcome};
pub use sse::{SseDecoder, SseMessage};

use crate::backend::BackendError;
use futures::stream::BoxStream;

/// Payload marking the end of a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Decoded event payloads of one open stream, in receive order
pub type PayloadStream = BoxStream<'static, Result<String, BackendError>>;
