//! The per-connection session state machine.
//!
//! Each accepted connection is driven through
//! `AwaitHello → Validating → Running → Closed`. Validation can fail
//! straight to `Closed`; the peer never observes a distinct rejected state —
//! the connection simply closes with nothing written (the rejection reason
//! is logged host-side only).
//!
//! Architecture:
//!
//! ```text
//! run(stream)
//!  ├─ reader task: peer lines → decode → mpsc ─┐
//!  └─ drive loop: select!                      │
//!       ├─ peer event (HELLO/HEARTBEAT/…) ◄────┘
//!       ├─ process output line → translate → MOUSE, write + flush
//!       └─ shutdown signal
//!  teardown (always): terminate process, close transport
//! ```
//!
//! Inbound lines are read by a dedicated task and handed to the drive loop
//! over a channel, so the loop only ever suspends on cancellation-safe
//! receives. The outbound path flushes every event before translating the
//! next one: a slow peer throttles the automation process instead of growing
//! a buffer.
//!
//! This module owns the seams the session depends on ([`ProcessSupervisor`],
//! [`PresetRegistry`]); the real implementations live in the infrastructure
//! layer, scripted mocks beside them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hidbridge_core::protocol::codec::{decode_line, encode_line, ProtocolError};
use hidbridge_core::protocol::messages::Message;
use hidbridge_core::translate_line;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, WriteHalf};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can occur while starting the automation process.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The executable could not be started.
    #[error("failed to start automation executable {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The child started but its output pipes were not available.
    #[error("automation process has no capturable output stream")]
    NoOutputPipe,
}

/// Errors that terminate a session.
///
/// Handshake-stage variants (`Auth`, `VersionMismatch`, `PresetNotFound`,
/// `Protocol` on a malformed or out-of-sequence message) close the
/// connection silently: no response is written and no process is spawned.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Unparsable or out-of-sequence message from the peer.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Handshake secret did not match the configured value.
    #[error("handshake secret mismatch")]
    Auth,

    /// Peer speaks a different protocol version.
    #[error("protocol version mismatch: expected {expected}, received {received}")]
    VersionMismatch { expected: String, received: String },

    /// The requested preset does not resolve to an existing resource.
    #[error("preset not found: {0}")]
    PresetNotFound(String),

    /// The automation process failed to start.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// Transport-level I/O failure (peer reset, write failure).
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        SessionError::Protocol(e.to_string())
    }
}

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Liveness of a supervised automation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Started and not yet reaped.
    Running,
    /// Exited on its own or after a graceful termination request.
    Exited,
    /// Force-killed after the grace period expired.
    Killed,
}

/// A running automation process owned by exactly one session.
///
/// Implementations capture stdout and stderr as a single merged text-line
/// stream. The handle is created on a successful handshake and must be
/// terminated when the session ends, whatever the exit path.
#[async_trait]
pub trait AutomationProcess: Send {
    /// OS process id, when one exists (mocks return `None`).
    fn pid(&self) -> Option<u32>;

    /// Current liveness state as last observed by the supervisor.
    fn liveness(&self) -> Liveness;

    /// Next output line, or `None` once the output stream has closed.
    async fn next_line(&mut self) -> Option<String>;

    /// Terminates the process. Idempotent: returns immediately if it has
    /// already exited. Otherwise requests graceful termination, waits up to
    /// the configured grace period, and force-kills if still alive.
    async fn terminate(&mut self);
}

/// Spawns automation processes for validated sessions.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Starts the automation executable for the given preset resource.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] when the process cannot be started; no
    /// partially-started process may be left running in that case.
    async fn spawn(&self, preset: &Path) -> Result<Box<dyn AutomationProcess>, SpawnError>;
}

/// Resolves preset names to on-disk resources.
///
/// Enumeration and content fingerprinting belong to the external preset
/// registry; the session only needs existence resolution during validation.
pub trait PresetRegistry: Send + Sync {
    /// Returns the preset's path when it exists, `None` otherwise.
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Validation inputs shared by every session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Static shared secret compared for exact equality.
    pub secret: String,
    /// Protocol version string compared for exact equality.
    pub protocol_version: String,
}

/// Protocol state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitHello,
    Validating,
    Running,
    Closed,
}

/// What a finished session did, for logging and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionSummary {
    /// Number of `MOUSE` messages written and flushed to the peer.
    pub events_streamed: u64,
}

/// Inbound traffic as seen by the drive loop.
enum PeerEvent {
    Message(Message),
    Malformed(String),
    Error(std::io::Error),
}

/// One accepted connection, from handshake through teardown.
///
/// Owns at most one [`AutomationProcess`]; its lifetime is bounded exactly
/// by the session's. Constructed per connection by the listener.
pub struct Session {
    id: Uuid,
    settings: SessionSettings,
    registry: Arc<dyn PresetRegistry>,
    supervisor: Arc<dyn ProcessSupervisor>,
    state: SessionState,
    process: Option<Box<dyn AutomationProcess>>,
    events_streamed: u64,
}

impl Session {
    /// Creates a session for one incoming connection.
    pub fn new(
        settings: SessionSettings,
        registry: Arc<dyn PresetRegistry>,
        supervisor: Arc<dyn ProcessSupervisor>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            registry,
            supervisor,
            state: SessionState::AwaitHello,
            process: None,
            events_streamed: 0,
        }
    }

    /// Drives the session over `stream` until it ends, then runs teardown.
    ///
    /// The teardown guarantee holds on every exit path, including error
    /// propagation out of the drive loop: if a process was spawned it is
    /// terminated, and the transport is closed.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended the session. A peer that
    /// disconnects cleanly (before or after the handshake) is not an error.
    pub async fn run<S>(
        mut self,
        stream: S,
        shutdown: watch::Receiver<bool>,
    ) -> Result<SessionSummary, SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, mut write_half) = tokio::io::split(stream);
        let (peer_tx, peer_rx) = mpsc::channel(8);
        let reader = tokio::spawn(read_peer_lines(read_half, peer_tx));

        let outcome = self.drive(peer_rx, &mut write_half, shutdown).await;

        self.teardown(&mut write_half).await;
        reader.abort();

        match outcome {
            Ok(()) => Ok(SessionSummary {
                events_streamed: self.events_streamed,
            }),
            Err(e) => Err(e),
        }
    }

    async fn drive<W>(
        &mut self,
        mut peer_rx: mpsc::Receiver<PeerEvent>,
        writer: &mut W,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        // ── AWAIT_HELLO ───────────────────────────────────────────────────────
        let hello = loop {
            tokio::select! {
                event = peer_rx.recv() => match event {
                    None => {
                        debug!("session {}: peer left before handshake", self.id);
                        return Ok(());
                    }
                    Some(PeerEvent::Message(Message::Heartbeat)) => {
                        // Keep-alive before the handshake; state unchanged.
                    }
                    Some(PeerEvent::Message(Message::Hello(h))) => break h,
                    Some(PeerEvent::Message(other)) => {
                        return Err(SessionError::Protocol(format!(
                            "unexpected {} before HELLO",
                            other.kind()
                        )));
                    }
                    Some(PeerEvent::Malformed(e)) => return Err(SessionError::Protocol(e)),
                    Some(PeerEvent::Error(e)) => return Err(SessionError::Io(e)),
                },
                _ = shutdown.changed() => {
                    debug!("session {}: shutdown before handshake", self.id);
                    return Ok(());
                }
            }
        };

        // ── VALIDATING ────────────────────────────────────────────────────────
        self.state = SessionState::Validating;
        let preset_path = self.validate(&hello.secret, &hello.version, &hello.preset.name)?;

        let process = self.supervisor.spawn(&preset_path).await?;
        info!(
            "session {}: preset '{}' validated, automation process started (pid {:?})",
            self.id,
            hello.preset.name,
            process.pid()
        );
        self.process = Some(process);

        send_message(writer, &Message::ready()).await?;
        self.state = SessionState::Running;

        // ── RUNNING ───────────────────────────────────────────────────────────
        // Direct field borrow: `self.process` and the counters are disjoint.
        let Some(process) = self.process.as_mut() else {
            return Ok(());
        };
        loop {
            tokio::select! {
                line = process.next_line() => match line {
                    Some(raw) => {
                        let Some(event) = translate_line(&raw) else {
                            debug!("session {}: skipping untranslatable line {raw:?}", self.id);
                            continue;
                        };
                        // Full flush before the next event: backpressure
                        // against a slow peer.
                        send_message(writer, &Message::Mouse(event)).await?;
                        self.events_streamed += 1;
                    }
                    None => {
                        debug!("session {}: process output ended", self.id);
                        return Ok(());
                    }
                },
                event = peer_rx.recv() => match event {
                    None => {
                        debug!("session {}: peer disconnected", self.id);
                        return Ok(());
                    }
                    Some(PeerEvent::Message(Message::Heartbeat)) => {
                        // Ignored while streaming.
                    }
                    Some(PeerEvent::Message(other)) => {
                        return Err(SessionError::Protocol(format!(
                            "unexpected {} while streaming",
                            other.kind()
                        )));
                    }
                    Some(PeerEvent::Malformed(e)) => return Err(SessionError::Protocol(e)),
                    Some(PeerEvent::Error(e)) => return Err(SessionError::Io(e)),
                },
                _ = shutdown.changed() => {
                    info!("session {}: shutting down", self.id);
                    return Ok(());
                }
            }
        }
    }

    /// Runs the validation checks in order: secret, version, preset
    /// existence. The first failing check aborts the session.
    fn validate(
        &self,
        secret: &str,
        version: &str,
        preset_name: &str,
    ) -> Result<PathBuf, SessionError> {
        if secret != self.settings.secret {
            return Err(SessionError::Auth);
        }
        if version != self.settings.protocol_version {
            return Err(SessionError::VersionMismatch {
                expected: self.settings.protocol_version.clone(),
                received: version.to_string(),
            });
        }
        self.registry
            .resolve(preset_name)
            .ok_or_else(|| SessionError::PresetNotFound(preset_name.to_string()))
    }

    /// Releases session resources. Safe to call on every exit path.
    async fn teardown<S>(&mut self, write_half: &mut WriteHalf<S>)
    where
        S: AsyncWrite,
    {
        if let Some(mut process) = self.process.take() {
            process.terminate().await;
            debug!(
                "session {}: automation process released ({:?})",
                self.id,
                process.liveness()
            );
        }
        let _ = write_half.shutdown().await;
        self.state = SessionState::Closed;
        debug!("session {}: closed ({:?})", self.id, self.state);
    }
}

/// Encodes `msg` and writes it as one fully-flushed line.
async fn send_message<W>(writer: &mut W, msg: &Message) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    let line = encode_line(msg)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads peer lines, decodes them, and forwards the result over `tx`.
///
/// Runs as a dedicated task so the drive loop never blocks on a partial
/// line. Stops at EOF, on I/O error, or after the first malformed line —
/// a malformed line ends the session, so there is nothing left to read.
async fn read_peer_lines<R>(read_half: R, tx: mpsc::Sender<PeerEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let event = match decode_line(&line) {
                    Ok(msg) => PeerEvent::Message(msg),
                    Err(e) => PeerEvent::Malformed(e.to_string()),
                };
                let fatal = matches!(event, PeerEvent::Malformed(_));
                if tx.send(event).await.is_err() || fatal {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(PeerEvent::Error(e)).await;
                break;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapRegistry(HashMap<String, PathBuf>);

    impl PresetRegistry for MapRegistry {
        fn resolve(&self, name: &str) -> Option<PathBuf> {
            self.0.get(name).cloned()
        }
    }

    struct CountingSupervisor {
        spawns: AtomicUsize,
    }

    #[async_trait]
    impl ProcessSupervisor for CountingSupervisor {
        async fn spawn(&self, _preset: &Path) -> Result<Box<dyn AutomationProcess>, SpawnError> {
            self.spawns.fetch_add(1, Ordering::SeqCst);
            Err(SpawnError::NoOutputPipe)
        }
    }

    fn make_session() -> Session {
        let mut presets = HashMap::new();
        presets.insert("p1".to_string(), PathBuf::from("/presets/p1.ini"));
        Session::new(
            SessionSettings {
                secret: "s".to_string(),
                protocol_version: "1.0.0".to_string(),
            },
            Arc::new(MapRegistry(presets)),
            Arc::new(CountingSupervisor {
                spawns: AtomicUsize::new(0),
            }),
        )
    }

    #[test]
    fn test_validate_accepts_matching_handshake() {
        let session = make_session();
        let path = session.validate("s", "1.0.0", "p1").unwrap();
        assert_eq!(path, PathBuf::from("/presets/p1.ini"));
    }

    #[test]
    fn test_validate_rejects_wrong_secret_first() {
        // Wrong secret AND wrong version: the secret check runs first.
        let session = make_session();
        let result = session.validate("wrong", "9.9.9", "p1");
        assert!(matches!(result, Err(SessionError::Auth)));
    }

    #[test]
    fn test_validate_rejects_version_mismatch() {
        let session = make_session();
        let result = session.validate("s", "0.9.0", "p1");
        assert!(matches!(
            result,
            Err(SessionError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_preset() {
        let session = make_session();
        let result = session.validate("s", "1.0.0", "missing");
        assert!(matches!(result, Err(SessionError::PresetNotFound(name)) if name == "missing"));
    }

    #[test]
    fn test_version_check_runs_before_preset_lookup() {
        // Wrong version AND unknown preset: version must win.
        let session = make_session();
        let result = session.validate("s", "2.0.0", "missing");
        assert!(matches!(
            result,
            Err(SessionError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_session_error_from_protocol_error() {
        let e: SessionError = ProtocolError::Empty.into();
        assert!(matches!(e, SessionError::Protocol(_)));
    }
}
