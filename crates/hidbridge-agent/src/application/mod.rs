//! Application layer: use cases for the device agent.

pub mod forward_events;
pub mod reconnect;
