//! Per-connection handler: handshake, register, then pump events.

use std::net::SocketAddr;
use std::sync::Arc;

use duet_common::ConnectionId;
use duet_room::{ClientEvent, Coordinator, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async_with_config, WebSocketStream};

use crate::peers::PeerMap;
use crate::settings::ConnectionSettings;

type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

/// State shared by every connection task.
#[derive(Clone)]
pub struct RelayContext {
    pub coordinator: Coordinator,
    pub peers: PeerMap,
    pub settings: Arc<ConnectionSettings>,
}

/// Handle a single TCP connection from handshake to departure.
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, ctx: RelayContext) {
    let mut forwarded_for: Option<String> = None;
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(ctx.settings.max_frame_bytes);
    ws_config.max_frame_size = Some(ctx.settings.max_frame_bytes);

    let handshake = accept_hdr_async_with_config(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            forwarded_for = first_forwarded_for(req);
            Ok(resp)
        },
        Some(ws_config),
    )
    .await;
    let ws = match handshake {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
            return;
        }
    };

    let origin = match forwarded_for {
        Some(forwarded) if ctx.settings.trust_forwarded_for => forwarded,
        _ => addr.ip().to_string(),
    };
    let conn_id = ConnectionId::new();
    run_session(ws, conn_id, origin, ctx).await;
}

async fn run_session(
    ws: WebSocketStream<TcpStream>,
    conn_id: ConnectionId,
    origin: String,
    ctx: RelayContext,
) {
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::channel::<String>(ctx.settings.outbound_queue);
    ctx.peers.register(conn_id.clone(), tx).await;

    tracing::info!(conn = %conn_id, origin = %origin, "Client connected");

    let period = ctx.settings.ping_interval;
    let mut ping = interval_at(Instant::now() + period, period);
    let join_timer = sleep(ctx.settings.join_timeout.unwrap_or_default());
    tokio::pin!(join_timer);
    let mut awaiting_join = ctx.settings.join_timeout.is_some();

    loop {
        tokio::select! {
            // Queued events for this client -> its WebSocket.
            Some(json) = rx.recv() => {
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client -> coordinator.
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => {
                                let deliveries = ctx.coordinator.dispatch(&conn_id, &origin, event).await;
                                ctx.peers.deliver(deliveries).await;
                            }
                            Err(e) => {
                                tracing::debug!(conn = %conn_id, error = %e, "Malformed client event");
                                let reply = ServerEvent::Error { message: format!("malformed event: {e}") };
                                if send_event(&mut sink, &reply).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let reply = ServerEvent::Error { message: "expected a text frame".into() };
                        if send_event(&mut sink, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings are answered by tungstenite itself.
                    Some(Err(e)) => {
                        tracing::debug!(conn = %conn_id, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }

            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            _ = &mut join_timer, if awaiting_join => {
                awaiting_join = false;
                if ctx.coordinator.session(&conn_id).await.is_none() {
                    tracing::info!(conn = %conn_id, "No join before timeout, closing");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    // Cleanup: leave exactly once, then stop routing to this connection.
    let deliveries = ctx.coordinator.leave(&conn_id).await;
    ctx.peers.unregister(&conn_id).await;
    ctx.peers.deliver(deliveries).await;

    tracing::info!(conn = %conn_id, origin = %origin, "Client disconnected");
}

/// First address in an `X-Forwarded-For` header, if any.
fn first_forwarded_for(req: &Request) -> Option<String> {
    let value = req.headers().get("x-forwarded-for")?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Send a ServerEvent as a JSON text frame.
async fn send_event(
    sink: &mut WsSink,
    event: &ServerEvent,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    sink.send(Message::Text(event.to_json().into())).await
}
