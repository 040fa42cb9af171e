//! `WebSocket` transport for client sessions.
//!
//! Clients connect to `GET /ws`. The upgraded socket is split into a
//! [`WsReader`] and a [`WsWriter`] and handed to a
//! [`Session`](lifecast_core::Session), which does the rest.
//!
//! Both directions carry a JSON array of `{"x": .., "y": ..}` objects.
//! Inbound text and binary frames are both accepted; outbound frames are
//! always text. Ping and pong frames are skipped. A close frame, the end
//! of the stream, or a message that does not decode all count as a
//! transport failure and end the session.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use lifecast_core::{PointReader, PointWriter, Session, TransportError};
use lifecast_grid::Point;
use tracing::{debug, info};

use crate::state::AppState;

/// How long a closing handshake may take before the socket is abandoned.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Upgrade an HTTP request to a `WebSocket` session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_session(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let _tracker = state.track_session();
    let (sink, stream) = socket.split();

    let session = Session::new(state.simulation.clone(), state.session_settings);
    info!(
        session = %session.id(),
        sessions_active = state.sessions_active(),
        "WebSocket client connected"
    );

    let report = session
        .run(WsReader::new(stream), WsWriter::new(sink))
        .await;
    debug!(session = %report.id, reason = ?report.close_reason, "WebSocket client disconnected");
}

/// Decode one inbound message body into a point-list.
pub fn decode_points(body: &[u8]) -> Result<Vec<Point>, TransportError> {
    serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Encode a point-list as one outbound message body.
pub fn encode_points(points: &[Point]) -> Result<String, TransportError> {
    serde_json::to_string(points).map_err(|e| TransportError::Io(e.to_string()))
}

/// Inbound half of a split `WebSocket`.
#[derive(Debug)]
pub struct WsReader<S> {
    stream: S,
}

impl<S> WsReader<S> {
    /// Wrap the stream half of a socket.
    pub const fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S, E> PointReader for WsReader<S>
where
    S: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send,
{
    async fn read(&mut self) -> Result<Vec<Point>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return decode_points(text.as_bytes()),
                Some(Ok(Message::Binary(bytes))) => return decode_points(&bytes),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                Some(Err(e)) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }
}

/// Outbound half of a split `WebSocket`.
#[derive(Debug)]
pub struct WsWriter<K> {
    sink: K,
}

impl<K> WsWriter<K> {
    /// Wrap the sink half of a socket.
    pub const fn new(sink: K) -> Self {
        Self { sink }
    }
}

impl<K> PointWriter for WsWriter<K>
where
    K: Sink<Message> + Unpin + Send + 'static,
    K::Error: Display + Send,
{
    async fn write(&mut self, points: Vec<Point>) -> Result<(), TransportError> {
        let body = encode_points(&points)?;
        self.sink
            .send(Message::Text(body.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        // A peer that stopped reading would hold the flush forever.
        match tokio::time::timeout(CLOSE_GRACE, self.sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "WebSocket close failed"),
            Err(_) => debug!("WebSocket close timed out"),
        }
    }
}
