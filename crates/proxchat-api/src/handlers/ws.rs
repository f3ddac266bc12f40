//! WebSocket upgrade handler and per-connection pumps.
//!
//! Each connection runs a reader and a writer. The reader enforces the
//! frame-size cap and a rolling read deadline and feeds frames into the
//! ingress pipeline; the writer drains the outbound queue, coalescing
//! bursts into newline-separated batches, and keeps the peer alive with
//! periodic pings. Both watch the connection's cancellation handle.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use proxchat_core::config::RealtimeConfig;
use proxchat_core::error::AppError;
use proxchat_realtime::client::ClientHandle;
use proxchat_realtime::ingress::IngressPipeline;
use proxchat_realtime::protocol::Frame;

use crate::extractors::ClientAddr;
use crate::state::AppState;

/// Query parameters of `GET /ws`.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub session_id: String,
}

/// GET /ws?session_id= WebSocket upgrade.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    ClientAddr(addr): ClientAddr,
) -> Result<Response, AppError> {
    // The stream requires a live session and a bound location.
    let session = state
        .sessions
        .get(&query.session_id)
        .await
        .map_err(|_| AppError::unauthorized("invalid or expired session"))?;

    let location = state
        .locations
        .get(&query.session_id)
        .await
        .map_err(|_| AppError::bad_request("location not set"))?;

    // Reserve a live-stream slot for this address before upgrading. The
    // slot id outlives the handshake; the teardown path releases it.
    let slot_id = Uuid::new_v4().to_string();
    if !state.limiter.allow_connection(&addr, &slot_id).await? {
        warn!(addr, "connection limit reached, rejecting");
        return Err(AppError::rate_limit("Too many concurrent connections"));
    }

    Ok(ws.on_upgrade(move |socket| {
        handle_connection(
            state,
            socket,
            query.session_id,
            session.username,
            location.cell,
            location.radius,
            addr,
            slot_id,
        )
    }))
}

#[allow(clippy::too_many_arguments)]
async fn handle_connection(
    state: AppState,
    socket: WebSocket,
    session_id: String,
    username: String,
    cell: String,
    radius: u32,
    addr: String,
    slot_id: String,
) {
    let config = state.config.realtime.clone();
    let (client, outbound_rx) = ClientHandle::new(
        &session_id,
        &username,
        &cell,
        radius,
        &addr,
        config.queue_capacity,
        &state.shutdown,
    );

    run_connection(state, socket, client, outbound_rx, config, slot_id).await;
}

async fn run_connection(
    state: AppState,
    socket: WebSocket,
    client: Arc<ClientHandle>,
    outbound_rx: mpsc::Receiver<Frame>,
    config: RealtimeConfig,
    slot_id: String,
) {
    let (ws_tx, ws_rx) = socket.split();

    state.hub.register(client.clone()).await;
    info!(
        session_id = %client.session_id,
        conn_id = %client.conn_id,
        "stream established"
    );

    let pipeline = IngressPipeline::new(
        state.hub.clone(),
        state.limiter.clone(),
        state.spam.clone(),
        state.messages.clone(),
    );

    let writer = tokio::spawn(write_pump(
        ws_tx,
        outbound_rx,
        client.clone(),
        config.clone(),
    ));

    read_pump(ws_rx, client.clone(), pipeline, config).await;

    // Reader is done: tear the connection down.
    client.close();
    state.hub.unregister(&client.session_id).await;
    if let Err(e) = state.limiter.release_connection(&client.addr, &slot_id).await {
        warn!(error = %e, "failed to release connection slot");
    }
    let _ = writer.await;

    info!(session_id = %client.session_id, "stream closed");
}

/// Read frames until error, close, deadline, or cancellation. The
/// deadline restarts on every inbound frame, heartbeats included.
async fn read_pump(
    mut ws_rx: SplitStream<WebSocket>,
    client: Arc<ClientHandle>,
    pipeline: IngressPipeline,
    config: RealtimeConfig,
) {
    let deadline = Duration::from_secs(config.read_deadline_seconds);

    loop {
        let next = tokio::select! {
            next = tokio::time::timeout(deadline, ws_rx.next()) => next,
            _ = client.cancel.cancelled() => return,
        };

        match next {
            Err(_) => {
                debug!(session_id = %client.session_id, "read deadline elapsed");
                return;
            }
            Ok(None) => return,
            Ok(Some(Err(e))) => {
                debug!(session_id = %client.session_id, error = %e, "read error");
                return;
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                if text.len() > config.max_frame_bytes {
                    warn!(
                        session_id = %client.session_id,
                        size = text.len(),
                        "oversized frame, closing connection"
                    );
                    return;
                }
                pipeline.handle_frame(&client, &text).await;
            }
            Ok(Some(Ok(Message::Close(_)))) => return,
            // Pings are answered by the transport; both refresh the
            // deadline by reaching this loop at all.
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

/// Drain the outbound queue into the socket until the queue closes or
/// the connection is cancelled.
async fn write_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Frame>,
    client: Arc<ClientHandle>,
    config: RealtimeConfig,
) {
    let write_deadline = Duration::from_secs(config.write_deadline_seconds);
    let mut keepalive = tokio::time::interval(Duration::from_secs(config.ping_period_seconds()));
    keepalive.tick().await; // First tick fires immediately; skip it.

    loop {
        tokio::select! {
            received = outbound_rx.recv() => {
                let Some(frame) = received else {
                    // Queue closed by the hub: say goodbye and exit.
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return;
                };

                let mut payload = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "failed to serialize outbound frame");
                        continue;
                    }
                };

                // Coalesce whatever else is already queued into the
                // same transport frame, newline-separated, preserving
                // order.
                let depth = outbound_rx.len();
                for _ in 0..depth {
                    let Ok(next) = outbound_rx.try_recv() else {
                        break;
                    };
                    match serde_json::to_string(&next) {
                        Ok(json) => {
                            payload.push('\n');
                            payload.push_str(&json);
                        }
                        Err(e) => warn!(error = %e, "failed to serialize batched frame"),
                    }
                }

                match tokio::time::timeout(write_deadline, ws_tx.send(Message::Text(payload))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(session_id = %client.session_id, error = %e, "write error");
                        return;
                    }
                    Err(_) => {
                        warn!(session_id = %client.session_id, "write deadline elapsed");
                        return;
                    }
                }
            }
            _ = keepalive.tick() => {
                let ping = ws_tx.send(Message::Ping(Vec::new()));
                match tokio::time::timeout(write_deadline, ping).await {
                    Ok(Ok(())) => {}
                    _ => return,
                }
            }
            _ = client.cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                return;
            }
        }
    }
}
