//! Recording pointer actuator for tests.
//!
//! The real actuator writes to a gadget character device that only exists
//! on the device hardware. [`MockActuator`] records every event into a
//! `Mutex<Vec<...>>` instead, so tests can assert exactly what was
//! forwarded and in what order. Set `should_fail` to exercise the
//! error-handling paths of callers without broken hardware.

use std::sync::Mutex;

use hidbridge_core::protocol::messages::MoveEvent;

use crate::application::forward_events::{ActuatorError, PointerActuator};

/// An actuator that records all events without touching hardware.
#[derive(Default)]
pub struct MockActuator {
    /// Every event passed to `send`, in order.
    pub events: Mutex<Vec<MoveEvent>>,
    /// When `true`, every `send` returns `ActuatorError::Unavailable`.
    pub should_fail: bool,
}

impl MockActuator {
    /// Creates a recording actuator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an actuator whose every `send` fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Snapshot of the recorded events.
    pub fn recorded(&self) -> Vec<MoveEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PointerActuator for MockActuator {
    fn send(&self, event: &MoveEvent) -> Result<(), ActuatorError> {
        if self.should_fail {
            return Err(ActuatorError::Unavailable("mock failure".to_string()));
        }
        self.events.lock().unwrap().push(*event);
        Ok(())
    }
}
