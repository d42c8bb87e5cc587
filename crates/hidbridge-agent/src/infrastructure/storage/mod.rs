//! Configuration storage for the device agent.

pub mod config;
