//! Per-connection session: handshake, reducer, and socket writer.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use jobwatch_engine::{ChannelSink, EventReducer, SnapshotSink};
use jobwatch_events::SaltEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::routes::AppState;

/// Client message that starts the event stream.
pub const READY_MESSAGE: &str = "websocket client ready";

/// Reply to every text message the client sends.
pub const ACK_MESSAGE: &str = "server received message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The event feed stopped; no more events will arrive.
    FeedClosed,
    /// Publishing failed because the observer went away.
    ObserverGone,
}

/// Apply events from the fan-out to `reducer` until the feed closes or the
/// sink fails. Other reducer errors are logged and the event is skipped.
pub async fn pump_events<K>(
    reducer: &mut EventReducer<K>,
    events: &mut broadcast::Receiver<SaltEvent>,
) -> SessionEnd
where
    K: SnapshotSink,
{
    loop {
        match events.recv().await {
            Ok(event) => match reducer.process(&event) {
                Ok(()) => {}
                Err(e) if e.is_sink_failure() => return SessionEnd::ObserverGone,
                Err(e) => warn!(tag = event.tag.as_str(), error = %e, "Skipping event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Session fell behind the event feed");
            }
            Err(RecvError::Closed) => return SessionEnd::FeedClosed,
        }
    }
}

/// Drive one websocket connection to completion.
pub async fn run(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    let span = info_span!("session", id = %session_id);
    serve(socket, state).instrument(span).await
}

async fn serve(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (sink, mut outbox) = ChannelSink::channel();

    // Only this task writes to the socket; acks and snapshots share the queue.
    let writer = tokio::spawn(
        async move {
            while let Some(payload) = outbox.recv().await {
                if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        }
        .in_current_span(),
    );

    info!("Observer connected");
    let mut pump: Option<JoinHandle<SessionEnd>> = None;

    while let Some(message) = ws_rx.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "Websocket read failed");
                break;
            }
        };

        if sink.send(ACK_MESSAGE.to_string()).is_err() {
            break;
        }

        if text.as_str() == READY_MESSAGE && pump.is_none() {
            pump = Some(start_pump(&state, sink.clone()));
        }
    }

    if let Some(pump) = pump {
        pump.abort();
    }
    drop(sink);
    let _ = writer.await;
    info!("Observer disconnected");
}

fn start_pump(state: &AppState, sink: ChannelSink) -> JoinHandle<SessionEnd> {
    let mut events = state.subscribe();
    let mut reducer = EventReducer::new(state.reducer, sink);
    info!("Observer ready, streaming projection");

    tokio::spawn(
        async move {
            if reducer.publish_all().is_err() {
                return SessionEnd::ObserverGone;
            }
            let end = pump_events(&mut reducer, &mut events).await;
            info!(
                end = ?end,
                jobs = reducer.jobs().len(),
                minions = reducer.minions().len(),
                "Session stream ended"
            );
            end
        }
        .in_current_span(),
    )
}
