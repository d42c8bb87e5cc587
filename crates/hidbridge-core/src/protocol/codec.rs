//! Newline-delimited JSON codec for hidbridge protocol messages.
//!
//! Wire format: one JSON object per line, UTF-8, terminated by `\n`.
//! Example exchange:
//!
//! ```text
//! {"type":"HELLO","version":"1.0.0","secret":"s","preset":{"name":"p1","sha256":"abc"}}
//! {"type":"ACK","status":"READY"}
//! {"type":"MOUSE","dx":1,"dy":2,"buttons":0}
//! ```
//!
//! Schema validation happens here, at the parse boundary: a line that is not
//! valid JSON, carries an unknown `type`, or is missing a variant's fields is
//! a [`ProtocolError`] — the caller never sees a partially-decoded message.

use thiserror::Error;

use crate::protocol::messages::Message;

/// Errors produced while encoding or decoding a message line.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The line is not valid JSON or does not match any known message schema.
    #[error("malformed message line: {0}")]
    Malformed(String),

    /// The line is empty after trimming; blank lines are not valid messages.
    #[error("empty message line")]
    Empty,
}

/// Encodes a [`Message`] as a single wire line, including the trailing `\n`.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if serialization fails (not expected
/// for any message constructible through this crate's types).
pub fn encode_line(msg: &Message) -> Result<String, ProtocolError> {
    let mut line =
        serde_json::to_string(msg).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// Decodes one wire line into a [`Message`].
///
/// The trailing newline (and any `\r`) is tolerated; the caller may pass
/// lines straight from a buffered reader.
///
/// # Errors
///
/// Returns [`ProtocolError::Empty`] for blank lines and
/// [`ProtocolError::Malformed`] for anything that is not exactly one message
/// from the closed variant set.
pub fn decode_line(line: &str) -> Result<Message, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Empty);
    }
    serde_json::from_str(trimmed).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
