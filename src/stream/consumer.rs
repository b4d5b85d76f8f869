//! Stream consumer
//!
//! Drives one opened stream: forwards each payload as a fragment event in
//! receive order and stops at the sentinel, on a transport error, or when the
//! owner cancels. Returning drops the payload stream, which closes the
//! connection.

use super::{PayloadStream, DONE_SENTINEL};
use crate::state_machine::{Event, StreamId};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a consumed stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Sentinel received
    Completed,
    /// Transport error, or the server closed before the sentinel
    Failed(String),
    /// Owner cancelled, or nobody is listening any more
    Cancelled,
}

/// Consume `payloads` until the stream ends, reporting to `events`.
///
/// Fragments are sent one at a time and awaited, so they reach the session in
/// the order they were received.
pub async fn consume(
    stream_id: StreamId,
    mut payloads: PayloadStream,
    cancel: CancellationToken,
    events: mpsc::Sender<Event>,
) -> StreamOutcome {
    let mut fragments = 0usize;
    loop {
        let next = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!(%stream_id, fragments, "Stream cancelled by owner");
                return StreamOutcome::Cancelled;
            }

            next = payloads.next() => next,
        };

        match next {
            Some(Ok(payload)) if payload == DONE_SENTINEL => {
                tracing::info!(%stream_id, fragments, "Stream completed");
                let _ = events.send(Event::StreamDone { stream_id }).await;
                return StreamOutcome::Completed;
            }
            Some(Ok(text)) => {
                fragments += 1;
                if events
                    .send(Event::StreamFragment { stream_id, text })
                    .await
                    .is_err()
                {
                    return StreamOutcome::Cancelled;
                }
            }
            Some(Err(e)) => {
                tracing::error!(%stream_id, fragments, error = %e, "Stream transport error");
                return fail(stream_id, e.message, &events).await;
            }
            None => {
                tracing::warn!(%stream_id, fragments, "Stream closed before sentinel");
                return fail(
                    stream_id,
                    "connection closed before the reply finished".to_string(),
                    &events,
                )
                .await;
            }
        }
    }
}

async fn fail(stream_id: StreamId, message: String, events: &mpsc::Sender<Event>) -> StreamOutcome {
    let _ = events
        .send(Event::StreamFailed {
            stream_id,
            message: message.clone(),
        })
        .await;
    StreamOutcome::Failed(message)
}
