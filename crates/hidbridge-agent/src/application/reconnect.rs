//! The reconnection controller: keeps one session running against the host,
//! forever.
//!
//! Behavior per attempt:
//!
//! - No preset selected yet → poll at a fixed short interval; never connect.
//! - Session completed (handshake sent, stream ran to a clean end — even
//!   with zero events) → reset the backoff index and go again.
//! - Network-classified failure (connect refused, transport I/O error) →
//!   report "peer not detected", wait the next schedule entry, retry. The
//!   index saturates at the last entry.
//! - Any other failure → log it, wait a fixed interval, retry without
//!   touching the backoff index.
//!
//! The session itself runs behind the [`SessionRunner`] seam; the real TCP
//! implementation lives in the infrastructure layer and owns (and releases)
//! the transport per attempt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hidbridge_core::protocol::messages::{HelloMessage, PresetRef};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::application::forward_events::ActuatorError;
use crate::infrastructure::ui_bridge::{AgentAppState, LinkStatus};

/// Poll interval while waiting for a preset to be selected.
const PRESET_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed delay after a failure that is not network-classified.
const UNEXPECTED_FAILURE_DELAY: Duration = Duration::from_secs(5);

/// Fallback schedule when the configured one is empty.
const DEFAULT_BACKOFF_SECS: &[u64] = &[2];

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that end one session attempt.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The TCP connection could not be established.
    #[error("failed to connect to host at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on the established link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The actuator rejected an event.
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

impl LinkError {
    /// Whether this failure is recovered through the backoff schedule
    /// (anything else gets the fixed unexpected-failure delay).
    pub fn is_network(&self) -> bool {
        matches!(self, LinkError::Connect { .. } | LinkError::Io(_))
    }
}

/// What one completed session attempt did.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionReport {
    /// Whether an `ACK{READY}` was observed.
    pub acked: bool,
    /// Number of `MOUSE` events forwarded to the actuator.
    pub events_forwarded: u64,
}

/// Seam for running one full session attempt (connect + handshake + stream).
///
/// Implementations must close the transport before returning, whatever the
/// outcome.
#[async_trait]
pub trait SessionRunner: Send + Sync {
    /// Runs one session to completion.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] when the attempt failed; a clean end-of-stream
    /// is a success even if nothing was forwarded.
    async fn run_session(&self, hello: HelloMessage) -> Result<SessionReport, LinkError>;
}

// ── Backoff policy ────────────────────────────────────────────────────────────

/// Saturating walk over an ordered schedule of reconnect delays.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    schedule: Vec<Duration>,
    index: usize,
}

impl BackoffPolicy {
    /// Builds a policy from a schedule in seconds. An empty schedule falls
    /// back to `[2]`.
    pub fn from_secs(secs: &[u64]) -> Self {
        let secs = if secs.is_empty() {
            DEFAULT_BACKOFF_SECS
        } else {
            secs
        };
        Self {
            schedule: secs.iter().copied().map(Duration::from_secs).collect(),
            index: 0,
        }
    }

    /// Returns the current delay and advances the index, saturating at the
    /// last schedule entry.
    pub fn next_delay(&mut self) -> Duration {
        let last = self.schedule.len() - 1;
        let delay = self.schedule[self.index.min(last)];
        self.index = (self.index + 1).min(last);
        delay
    }

    /// Resets to the start of the schedule. Called after any session that
    /// completed a handshake, regardless of how long it ran.
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Handshake identity the controller stamps on every attempt.
#[derive(Debug, Clone)]
pub struct LinkIdentity {
    /// Protocol version string sent in the HELLO.
    pub protocol_version: String,
    /// Static shared secret sent in the HELLO.
    pub secret: String,
}

/// Drives session attempts until shutdown.
pub struct ReconnectController {
    identity: LinkIdentity,
    policy: BackoffPolicy,
    state: Arc<AgentAppState>,
    runner: Arc<dyn SessionRunner>,
}

impl ReconnectController {
    /// Creates a controller over the given session runner.
    pub fn new(
        identity: LinkIdentity,
        backoff_secs: &[u64],
        state: Arc<AgentAppState>,
        runner: Arc<dyn SessionRunner>,
    ) -> Self {
        Self {
            identity,
            policy: BackoffPolicy::from_secs(backoff_secs),
            state,
            runner,
        }
    }

    /// Runs until the shutdown signal flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let Some(selection) = self.state.selected_preset().await else {
                self.state.set_status(LinkStatus::PresetNotSelected).await;
                if wait_or_shutdown(PRESET_POLL_INTERVAL, &mut shutdown).await {
                    break;
                }
                continue;
            };

            self.state.set_status(LinkStatus::Connecting).await;
            let hello = HelloMessage {
                version: self.identity.protocol_version.clone(),
                secret: self.identity.secret.clone(),
                preset: PresetRef {
                    name: selection.name,
                    sha256: selection.sha256,
                },
            };

            match self.runner.run_session(hello).await {
                Ok(report) => {
                    info!(
                        "session ended (acked: {}, {} event(s) forwarded)",
                        report.acked, report.events_forwarded
                    );
                    self.policy.reset();
                }
                Err(e) if e.is_network() => {
                    warn!("link failure: {e}");
                    self.state.set_status(LinkStatus::PeerNotDetected).await;
                    let delay = self.policy.next_delay();
                    if wait_or_shutdown(delay, &mut shutdown).await {
                        break;
                    }
                }
                Err(e) => {
                    error!("unexpected session failure: {e}");
                    if wait_or_shutdown(UNEXPECTED_FAILURE_DELAY, &mut shutdown).await {
                        break;
                    }
                }
            }
        }
        info!("reconnect controller stopped");
    }
}

/// Sleeps for `delay`, returning `true` if shutdown fired first.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown.changed() => true,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
