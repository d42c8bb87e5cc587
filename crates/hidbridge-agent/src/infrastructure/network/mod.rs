//! Network infrastructure for the device agent.
//!
//! [`TcpSessionRunner`] implements the application layer's
//! [`SessionRunner`] seam over a real TCP connection: connect, send one
//! `HELLO`, then consume the event stream until the host closes the link.
//!
//! Inbound handling:
//! - `MOUSE` → forwarded immediately to the actuator, unchanged and in
//!   arrival order.
//! - `ACK` → observed (flips the UI status to Streaming) but never awaited;
//!   the agent does not block between HELLO and the first event.
//! - `HEARTBEAT` and other known types → skipped.
//! - Malformed lines → logged and skipped, never fatal.
//!
//! A clean EOF is a completed attempt (that is what resets the reconnect
//! backoff, even for zero-event sessions); transport errors surface as
//! network-classified [`LinkError`]s. The connection lives inside
//! `run_session`, so it is released on every exit path.

use std::sync::Arc;

use async_trait::async_trait;
use hidbridge_core::protocol::codec::{decode_line, encode_line};
use hidbridge_core::protocol::messages::{HelloMessage, Message};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::application::forward_events::{ForwardEventsUseCase, PointerActuator};
use crate::application::reconnect::{LinkError, SessionReport, SessionRunner};
use crate::infrastructure::ui_bridge::{AgentAppState, LinkStatus};

/// Runs sessions against the host service over TCP.
pub struct TcpSessionRunner {
    addr: String,
    actuator: Arc<dyn PointerActuator>,
    state: Arc<AgentAppState>,
}

impl TcpSessionRunner {
    /// Creates a runner targeting `host:port`.
    pub fn new(
        host: &str,
        port: u16,
        actuator: Arc<dyn PointerActuator>,
        state: Arc<AgentAppState>,
    ) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            actuator,
            state,
        }
    }

    /// Target address in `host:port` form.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl SessionRunner for TcpSessionRunner {
    async fn run_session(&self, hello: HelloMessage) -> Result<SessionReport, LinkError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| LinkError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        info!("connected to host at {}", self.addr);

        let (read_half, mut write_half) = stream.into_split();

        // Exactly one HELLO per session.
        let line = encode_line(&Message::Hello(hello))
            .map_err(|e| LinkError::Protocol(e.to_string()))?;
        write_half.write_all(line.as_bytes()).await?;
        write_half.flush().await?;

        let mut forwarder = ForwardEventsUseCase::new(Arc::clone(&self.actuator));
        let mut reader = BufReader::new(read_half);
        let mut report = SessionReport::default();
        let mut line_buf = String::new();

        loop {
            line_buf.clear();
            let n = reader.read_line(&mut line_buf).await?;
            if n == 0 {
                debug!("host closed the link");
                break;
            }
            match decode_line(&line_buf) {
                Ok(Message::Mouse(event)) => {
                    forwarder.handle_move(&event)?;
                    report.events_forwarded = forwarder.forwarded();
                }
                Ok(Message::Ack { status }) => {
                    debug!("handshake acknowledged ({status:?})");
                    report.acked = true;
                    self.state.set_status(LinkStatus::Streaming).await;
                }
                Ok(Message::Heartbeat) => {}
                Ok(other) => debug!("ignoring unexpected {} message", other.kind()),
                Err(e) => warn!("skipping malformed line from host: {e}"),
            }
        }

        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
