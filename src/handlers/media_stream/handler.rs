//! Telephony media-stream WebSocket handler
//!
//! One WebSocket connection carries one call. The socket reader decodes
//! provider messages into [`TelephonyEvent`]s for the call session; a
//! sender task serializes the session's [`OutboundSignal`]s back onto the
//! socket.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::call::{CallSession, OutboundSignal, TelephonyEvent};
use crate::state::AppState;

use super::messages::{OutgoingMessage, parse_incoming};

/// Outgoing frames are paced, so this only absorbs scheduling jitter
const OUTBOUND_BUFFER_SIZE: usize = 256;

/// Inbound media arrives every 20 ms
const INBOUND_BUFFER_SIZE: usize = 512;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Media-stream WebSocket handler
///
/// Upgrades the HTTP connection and runs one call over it.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    debug!("Media stream connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state))
}

async fn handle_media_socket(mut socket: WebSocket, app_state: Arc<AppState>) {
    let handle = match app_state.registry.create() {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Rejecting media stream");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    let call_id = handle.call_id().to_string();
    info!(%call_id, "Media stream connected");

    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundSignal>(OUTBOUND_BUFFER_SIZE);
    let (inbound_tx, inbound_rx) = mpsc::channel::<TelephonyEvent>(INBOUND_BUFFER_SIZE);

    // Sender task for outgoing messages
    let sender_task = tokio::spawn(async move {
        while let Some(signal) = outbound_rx.recv().await {
            let message = OutgoingMessage::from(signal);
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                // Dropping the receiver makes in-flight playback abort
                warn!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    let session = CallSession::new(
        handle.clone(),
        app_state.services.clone(),
        app_state.settings,
        outbound_tx,
    );
    let mut session_task = tokio::spawn(session.run(inbound_rx));
    let mut session_result = None;

    loop {
        tokio::select! {
            msg_result = receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        match parse_incoming(&text).and_then(|m| m.into_event()) {
                            Ok(Some(event)) => {
                                if inbound_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                warn!(%call_id, error = %e, "Ignoring undecodable telephony message");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(%call_id, "Ignoring binary frame: {} bytes", data.len());
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(%call_id, "Media stream closed by peer");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%call_id, "Media stream WebSocket error: {}", e);
                        break;
                    }
                }
            }
            result = &mut session_task => {
                session_result = Some(result);
                break;
            }
        }
    }

    // Cleanup
    let result = match session_result {
        Some(result) => result,
        None => {
            let _ = inbound_tx.send(TelephonyEvent::Disconnected).await;
            drop(inbound_tx);
            session_task.await
        }
    };

    match result {
        Ok(summary) => info!(
            %call_id,
            transcripts = summary.transcripts,
            turns = summary.turns_completed,
            frames = summary.frames_sent,
            barge_ins = summary.barge_ins,
            "Media stream terminated"
        ),
        Err(e) => error!(%call_id, "Call session task failed: {}", e),
    }

    sender_task.abort();
    app_state.registry.remove(&call_id);
}
