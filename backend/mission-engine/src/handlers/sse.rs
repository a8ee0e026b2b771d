use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{metrics::SSE_CONNECTIONS_ACTIVE, models::events::QuizEvent, services::AppState};

/// SSE endpoint for quiz events
/// GET /api/v1/students/{student_id}/quiz/stream
pub async fn quiz_stream(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    tracing::info!("Client connected to quiz stream: student={}", student_id);

    let receiver = state.engine.subscribe(&student_id).await;
    Sse::new(create_event_stream(student_id, receiver)).keep_alive(KeepAlive::default())
}

/// Decrements the connection gauge when the stream is dropped.
struct ConnectionGuard {
    student_id: String,
}

impl ConnectionGuard {
    fn new(student_id: String) -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self { student_id }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
        tracing::info!("Quiz stream closed: student={}", self.student_id);
    }
}

fn create_event_stream(
    student_id: String,
    receiver: broadcast::Receiver<QuizEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = ConnectionGuard::new(student_id);

    stream::unfold((receiver, guard), |(mut rx, guard)| async move {
        loop {
            match rx.recv().await {
                Ok(quiz_event) => {
                    let event = Event::default()
                        .event(quiz_event.event_name())
                        .data(quiz_event.to_sse_data());
                    return Some((Ok(event), (rx, guard)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Quiz stream lagging: student={}, skipped {} events",
                        guard.student_id,
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn forwards_broadcast_events_until_sender_closes() {
        let (tx, rx) = broadcast::channel(8);
        let stream = create_event_stream("s1".into(), rx);
        tokio::pin!(stream);

        tx.send(QuizEvent::warning("Could not save")).unwrap();
        drop(tx);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }
}
