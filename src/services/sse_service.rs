use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::{session_code, sse_events},
    state::{SharedState, session::GameSession},
};

/// A live subscription: the snapshot to send first, then the session's broadcast feed.
pub struct SessionSubscription {
    /// Session code.
    pub code: String,
    /// First event of the stream.
    pub snapshot: Option<ServerEvent>,
    /// Subsequent events.
    pub receiver: broadcast::Receiver<ServerEvent>,
}

/// Subscribe to a session's SSE stream.
///
/// The receiver is registered before the snapshot is read so no update is lost in between.
pub async fn subscribe_session(
    state: &SharedState,
    code: &str,
) -> Result<SessionSubscription, ServiceError> {
    let code = session_code::normalize(code)?;
    let store = state.require_session_store().await?;
    let receiver = state.sse().subscribe(&code);

    let session: GameSession = match store.find_session(&code).await {
        Ok(Some(entity)) => entity.into(),
        found => {
            drop(receiver);
            state.sse().prune(&code);
            return Err(match found {
                Err(err) => err.into(),
                _ => ServiceError::NotFound(format!("session `{code}` not found")),
            });
        }
    };

    Ok(SessionSubscription {
        snapshot: sse_events::session_updated_event(&session),
        code,
        receiver,
    })
}

/// Convert a subscription into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    subscription: SessionSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let SessionSubscription {
        code,
        snapshot,
        mut receiver,
    } = subscription;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(snapshot) = snapshot {
            if tx.send(Ok(to_event(snapshot))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        info!(code = %code, "session SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}
