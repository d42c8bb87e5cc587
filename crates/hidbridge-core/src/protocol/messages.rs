//! All hidbridge protocol message types.
//!
//! Messages travel as one UTF-8 JSON object per line. The `type` field is
//! the discriminant; the set of valid discriminants is closed. A line whose
//! `type` is unknown, or whose fields do not match the variant's schema,
//! is rejected by the codec as a [`crate::protocol::codec::ProtocolError`].

use serde::{Deserialize, Serialize};

// ── Handshake payload ─────────────────────────────────────────────────────────

/// Preset identity carried inside a [`HelloMessage`].
///
/// The name selects the automation preset on the host; the fingerprint is the
/// SHA-256 of the preset file as computed by the device-side registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetRef {
    /// Preset name without extension (e.g. `"p1"`).
    pub name: String,
    /// Hex-encoded SHA-256 content fingerprint.
    pub sha256: String,
}

/// HELLO: sent by the agent exactly once per session to open the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Protocol version string; the host requires an exact match.
    pub version: String,
    /// Static shared secret; the host requires an exact match.
    pub secret: String,
    /// The preset the agent wants the host to run.
    pub preset: PresetRef,
}

// ── Acknowledgment ────────────────────────────────────────────────────────────

/// Status carried in an ACK. `READY` is the only value the protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "READY")]
    Ready,
}

// ── Movement events ───────────────────────────────────────────────────────────

/// One relative pointer movement, as produced by the output translator.
///
/// `buttons` is a HID button bitmask (bit 0 = primary, bit 1 = secondary,
/// bit 2 = middle). Deltas are unclamped on the wire; the actuator clamps
/// them to what the HID report can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEvent {
    pub dx: i32,
    pub dy: i32,
    pub buttons: u8,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// All valid hidbridge messages, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Session handshake (agent → host).
    #[serde(rename = "HELLO")]
    Hello(HelloMessage),
    /// Handshake accepted; streaming begins (host → agent).
    #[serde(rename = "ACK")]
    Ack { status: AckStatus },
    /// Keep-alive; a no-op for the receiver in every state.
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
    /// One movement event (host → agent).
    #[serde(rename = "MOUSE")]
    Mouse(MoveEvent),
}

impl Message {
    /// Returns the wire discriminant for this message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello(_) => "HELLO",
            Message::Ack { .. } => "ACK",
            Message::Heartbeat => "HEARTBEAT",
            Message::Mouse(_) => "MOUSE",
        }
    }

    /// Convenience constructor for the acceptance acknowledgment.
    pub fn ready() -> Self {
        Message::Ack {
            status: AckStatus::Ready,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
