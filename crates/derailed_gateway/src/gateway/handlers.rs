/// Receive loop and inbound frame routing
use super::core::SessionShared;
use crate::connection::{CloseReason, ConnectionState, SessionEnd, TransportStream};
use crate::error::SessionFault;
use crate::protocol::{GatewayMessage, OpCode};
use derailed_events::{EventBus, GatewayEvent, Ready};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Characters of a malformed frame kept for logs and faults.
const PREVIEW_CHARS: usize = 120;

/// Drives one session until its transport closes.
///
/// Frames are handled strictly in arrival order. Nothing a frame or a
/// handler does can end the loop; only the transport can.
pub(crate) async fn run_session(
    shared: Arc<SessionShared>,
    events: Arc<EventBus>,
    mut stream: TransportStream,
    session_id: Uuid,
) -> SessionEnd {
    let mut frames_processed = 0u64;

    let reason = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                frames_processed += 1;
                process_text(&shared, &events, session_id, text.as_str()).await;
            }
            Some(Ok(Message::Close(frame))) => {
                info!("🔌 Gateway session {} closed by peer", session_id);
                break CloseReason::from(frame);
            }
            Some(Ok(other)) => {
                trace!("Ignoring non-text frame ({} bytes)", other.len());
            }
            Some(Err(e)) => {
                error!("❌ Gateway session {} transport error: {}", session_id, e);
                shared.report(SessionFault::Transport(e.to_string()));
                break CloseReason::TransportError(e.to_string());
            }
            None => {
                info!("🔌 Gateway session {} stream ended", session_id);
                break CloseReason::StreamEnded;
            }
        }
    };

    let last_sequence = shared.finish(session_id).await;
    SessionEnd {
        session_id,
        reason,
        last_sequence,
        frames_processed,
    }
}

async fn process_text(shared: &SessionShared, events: &EventBus, session_id: Uuid, text: &str) {
    let message = match GatewayMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            warn!("⚠️ Skipping malformed gateway frame: {} ({})", e, preview);
            shared.report(SessionFault::MalformedFrame {
                error: e.to_string(),
                preview,
            });
            return;
        }
    };

    if let Some(sequence) = message.s {
        shared.record_sequence(session_id, sequence).await;
    }

    let state = shared.state();
    match message.opcode() {
        OpCode::Dispatch => match message.t {
            Some(event_name) => {
                debug!("📨 Dispatch {} (s={:?})", event_name, message.s);
                deliver(shared, events, &event_name, &message.d).await;
            }
            None => violation(shared, message.op, state, "dispatch without an event name"),
        },
        OpCode::Ready => {
            if state != ConnectionState::AwaitingReady {
                violation(shared, message.op, state, "READY outside the handshake");
                return;
            }
            deliver(shared, events, Ready::NAME, &message.d).await;
            shared.set_state(session_id, ConnectionState::Ready).await;
            info!("✅ Gateway session {} ready", session_id);
        }
        OpCode::Ack => {
            trace!("💓 Ack received");
            shared.mark_ack(session_id).await;
        }
        OpCode::Hello => {
            if state != ConnectionState::AwaitingHello {
                violation(shared, message.op, state, "HELLO after the handshake started");
                return;
            }
            debug!("👋 Hello received, identifying");
            if let Err(e) = shared.identify().await {
                error!("❌ Failed to send identify: {}", e);
                shared.report(SessionFault::Transport(e.to_string()));
                return;
            }
            shared.set_state(session_id, ConnectionState::AwaitingReady).await;
        }
        OpCode::Unknown(code) => {
            debug!("Ignoring unknown op code {}", code);
        }
    }
}

async fn deliver(shared: &SessionShared, events: &EventBus, event_name: &str, payload: &Value) {
    for failure in events.emit(event_name, payload).await {
        shared.report(SessionFault::Handler(failure));
    }
}

fn violation(shared: &SessionShared, op: i64, state: ConnectionState, detail: &str) {
    warn!("⚠️ Protocol violation: op {} while {}: {}", op, state, detail);
    shared.report(SessionFault::ProtocolViolation {
        op,
        state,
        detail: detail.to_string(),
    });
}
