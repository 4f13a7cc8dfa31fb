//! C10's WS transport: clients must authenticate with an `auth` frame before
//! any other traffic is accepted, then subscribe/unsubscribe from channels
//! and receive broadcasts fanned out by the [`ChannelManager`].

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use cogassist_channels::{verify_token, Channel, InboundFrame, OutboundFrame, AUTH_FAILED_CLOSE_CODE};

use crate::state::AppState;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// AwaitingAuth → Authenticated → (runs until close) → Closing.
enum ConnState {
    AwaitingAuth,
    Authenticated,
    Closing,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut tx, mut rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    let mut conn_state = ConnState::AwaitingAuth;

    let handshake_deadline = tokio::time::Instant::now() + HANDSHAKE_TIMEOUT;
    let mut handshake_timer = Box::pin(tokio::time::sleep_until(handshake_deadline));

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_PAYLOAD_BYTES {
                            warn!(conn_id = %conn_id, size = text.len(), "payload too large, dropping connection");
                            break;
                        }
                        conn_state = process_message(&conn_id, &text, conn_state, &mut tx, &state, &outbound_tx).await;
                        if matches!(conn_state, ConnState::Closing) {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }

            payload = outbound_rx.recv() => {
                match payload {
                    Some(payload) => {
                        if tx.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = heartbeat.tick() => {
                if matches!(conn_state, ConnState::Authenticated) {
                    if tx.send(Message::Text(OutboundFrame::Pong.to_json().into())).await.is_err() {
                        break;
                    }
                }
            }

            _ = &mut handshake_timer => {
                if matches!(conn_state, ConnState::AwaitingAuth) {
                    warn!(conn_id = %conn_id, "handshake timeout, closing connection");
                    let close = CloseFrame {
                        code: AUTH_FAILED_CLOSE_CODE,
                        reason: "authentication timed out".into(),
                    };
                    let _ = tx.send(Message::Close(Some(close))).await;
                    break;
                }
            }
        }
    }

    state.channels.disconnect(&conn_id);
    info!(conn_id = %conn_id, "WS connection closed");
}

async fn process_message(
    conn_id: &str,
    text: &str,
    state: ConnState,
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    app: &Arc<AppState>,
    outbound_tx: &mpsc::UnboundedSender<String>,
) -> ConnState {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(conn_id = %conn_id, error = %err, "malformed frame, ignoring");
            return state;
        }
    };

    match state {
        ConnState::AwaitingAuth => match frame {
            InboundFrame::Auth { token } => {
                if verify_token(&token, &app.ws_token) {
                    let default_subscriptions = [
                        (Channel::Events, None),
                        (Channel::Status, None),
                        (Channel::Notifications, None),
                        (Channel::Queue, None),
                    ];
                    app.channels.connect(conn_id, &app.account.id, outbound_tx.clone(), &default_subscriptions);
                    let _ = send_json(tx, &OutboundFrame::Authenticated).await;
                    let _ = send_json(tx, &OutboundFrame::Connected { client_id: conn_id.to_string() }).await;
                    info!(conn_id = %conn_id, "client authenticated");
                    ConnState::Authenticated
                } else {
                    warn!(conn_id = %conn_id, "auth failed");
                    let _ = send_json(
                        tx,
                        &OutboundFrame::Error {
                            code: "auth_failed".to_string(),
                            message: "invalid token".to_string(),
                        },
                    )
                    .await;
                    let close = CloseFrame {
                        code: AUTH_FAILED_CLOSE_CODE,
                        reason: "invalid token".into(),
                    };
                    let _ = tx.send(Message::Close(Some(close))).await;
                    ConnState::Closing
                }
            }
            _ => {
                let _ = send_json(
                    tx,
                    &OutboundFrame::Error {
                        code: "protocol_error".to_string(),
                        message: "must authenticate first".to_string(),
                    },
                )
                .await;
                ConnState::AwaitingAuth
            }
        },

        ConnState::Authenticated => {
            if !app.channels.check_rate_limit(conn_id) {
                let _ = send_json(
                    tx,
                    &OutboundFrame::Error {
                        code: "rate_limited".to_string(),
                        message: "too many messages".to_string(),
                    },
                )
                .await;
                return ConnState::Authenticated;
            }

            match frame {
                InboundFrame::Ping => {
                    let _ = send_json(tx, &OutboundFrame::Pong).await;
                }
                InboundFrame::Subscribe { channel, room_id } => match Channel::parse(&channel) {
                    Some(channel_enum) => match app.channels.subscribe(conn_id, channel_enum, room_id.clone()) {
                        Ok(()) => {
                            let _ = send_json(tx, &OutboundFrame::Subscribed { channel, room_id }).await;
                        }
                        Err(err) => {
                            let _ = send_json(
                                tx,
                                &OutboundFrame::Error {
                                    code: "invalid_channel".to_string(),
                                    message: err.to_string(),
                                },
                            )
                            .await;
                        }
                    },
                    None => {
                        let _ = send_json(
                            tx,
                            &OutboundFrame::Error {
                                code: "invalid_channel".to_string(),
                                message: format!("unknown channel '{channel}'"),
                            },
                        )
                        .await;
                    }
                },
                InboundFrame::Unsubscribe { channel, room_id } => match Channel::parse(&channel) {
                    Some(channel_enum) => {
                        let _ = app.channels.unsubscribe(conn_id, channel_enum, room_id.clone());
                        let _ = send_json(tx, &OutboundFrame::Unsubscribed { channel, room_id }).await;
                    }
                    None => {
                        let _ = send_json(
                            tx,
                            &OutboundFrame::Error {
                                code: "invalid_channel".to_string(),
                                message: format!("unknown channel '{channel}'"),
                            },
                        )
                        .await;
                    }
                },
                InboundFrame::Auth { .. } => {
                    let _ = send_json(
                        tx,
                        &OutboundFrame::Error {
                            code: "protocol_error".to_string(),
                            message: "already authenticated".to_string(),
                        },
                    )
                    .await;
                }
            }
            ConnState::Authenticated
        }

        ConnState::Closing => ConnState::Closing,
    }
}

async fn send_json(
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    payload: &OutboundFrame,
) -> Result<(), axum::Error> {
    tx.send(Message::Text(payload.to_json().into())).await
}
