//! Configuration storage for the host service.

pub mod config;
