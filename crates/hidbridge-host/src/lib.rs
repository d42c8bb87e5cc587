//! hidbridge-host library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! The host service owns one side of the bridge: it listens for a device
//! agent, validates its handshake (shared secret, protocol version, preset
//! existence), launches the automation executable for the requested preset,
//! and streams the process's output to the agent as `MOUSE` events — one
//! flushed line per event, so a slow link throttles the stream instead of
//! buffering it.

/// Application layer: the per-connection session state machine and its seams.
pub mod application;

/// Infrastructure layer: TCP listener, process supervisor, preset lookup,
/// and configuration storage.
pub mod infrastructure;
