use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use jobwatch_common::ReducerConfig;
use jobwatch_events::SaltEvent;
use tokio::sync::broadcast;

use crate::session;

pub struct AppState {
    pub events: broadcast::Sender<SaltEvent>,
    pub reducer: ReducerConfig,
}

impl AppState {
    pub fn new(events: broadcast::Sender<SaltEvent>, reducer: ReducerConfig) -> Self {
        Self { events, reducer }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaltEvent> {
        self.events.subscribe()
    }
}

async fn formatted_events(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| session::run(socket, state))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Real-time projection over websocket
        .route("/formatted_events", get(formatted_events))
        .with_state(state)
        // Logging layer: method + path only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
