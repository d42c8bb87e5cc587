//! # hidbridge-core
//!
//! Shared library for hidbridge containing the wire protocol and the pure
//! output-translation logic.
//!
//! This crate is used by both the host service and the device agent. It has
//! zero dependencies on OS APIs, sockets, or child processes.
//!
//! - **`protocol`** – How messages travel over the link. One UTF-8 JSON
//!   object per line, belonging to a closed set of typed variants
//!   (`HELLO`, `ACK`, `HEARTBEAT`, `MOUSE`). Anything outside that set is
//!   rejected at the parse boundary.
//!
//! - **`domain`** – Pure logic with no I/O. The output translator turns the
//!   automation process's `dx,dy,buttons` text lines into [`MoveEvent`]s.

pub mod domain;
pub mod protocol;

pub use domain::translate::translate_line;
pub use protocol::codec::{decode_line, encode_line, ProtocolError};
pub use protocol::messages::{AckStatus, HelloMessage, Message, MoveEvent, PresetRef};
