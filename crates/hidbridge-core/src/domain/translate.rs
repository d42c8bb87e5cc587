//! Output translation: automation-process text lines → [`MoveEvent`]s.
//!
//! The automation process reports pointer movement as plain text, one event
//! per stdout line in the form `dx,dy,buttons` (e.g. `"5,-3,1"`). Translation
//! failure is per-line and non-fatal: a line that does not parse is dropped
//! and the stream continues. Events are emitted in arrival order; there is no
//! batching or coalescing.

use crate::protocol::messages::MoveEvent;

/// Translates one process output line into a [`MoveEvent`].
///
/// Returns `None` when the line does not consist of exactly three
/// comma-separated integers in range (`dx`/`dy` as `i32`, `buttons` as `u8`).
/// Surrounding whitespace — including the `\r\n` left by a line reader — is
/// tolerated on the line and on each field.
pub fn translate_line(line: &str) -> Option<MoveEvent> {
    let mut fields = line.trim().split(',');
    let dx = fields.next()?.trim().parse().ok()?;
    let dy = fields.next()?.trim().parse().ok()?;
    let buttons = fields.next()?.trim().parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(MoveEvent { dx, dy, buttons })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
