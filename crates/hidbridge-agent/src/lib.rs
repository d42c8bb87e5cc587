//! hidbridge-agent library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! The agent owns the device side of the bridge:
//!
//! 1. Polls until the external menu UI has selected a preset.
//! 2. Connects to the host service and sends one `HELLO` carrying the
//!    protocol version, the shared secret, and the preset identity.
//! 3. Forwards every incoming `MOUSE` event straight to the pointer
//!    actuator (a USB HID gadget endpoint on the real device).
//! 4. When the link drops, retries on a saturating backoff schedule and
//!    reports "peer not detected" to the UI — a state distinct from
//!    "preset not selected".

/// Application layer: event forwarding and the reconnection controller.
pub mod application;

/// Infrastructure layer: network client, actuator adapters, UI bridge, and
/// configuration storage.
pub mod infrastructure;
