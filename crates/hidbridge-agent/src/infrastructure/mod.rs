//! Infrastructure layer: hardware, network, and UI adapters for the agent.

pub mod actuator;
pub mod network;
pub mod storage;
pub mod ui_bridge;
