//! ForwardEventsUseCase: delivers received movement events to the pointer
//! actuator.
//!
//! The use case sits at the application layer and delegates to a
//! [`PointerActuator`] trait object. The real HID gadget writer, the no-op
//! fallback, and the recording mock all live in the infrastructure layer.

use std::sync::Arc;

use hidbridge_core::protocol::messages::MoveEvent;
use thiserror::Error;

/// Error type for actuator operations.
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// The device is missing or cannot be opened for writing.
    #[error("actuator unavailable: {0}")]
    Unavailable(String),

    /// A write to the device failed.
    #[error("actuator write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Seam for the exclusive pointer hardware.
///
/// Implementations own the device handle and serialize all writes through a
/// single mutual-exclusion point; callers never coordinate access
/// themselves.
pub trait PointerActuator: Send + Sync {
    /// Realizes one movement event on the hardware.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] when the device write fails.
    fn send(&self, event: &MoveEvent) -> Result<(), ActuatorError>;
}

/// The Forward Events use case.
///
/// Passes each event through unchanged, in arrival order, and counts what
/// it forwarded.
pub struct ForwardEventsUseCase {
    actuator: Arc<dyn PointerActuator>,
    forwarded: u64,
}

impl ForwardEventsUseCase {
    /// Creates a new use case over the given actuator.
    pub fn new(actuator: Arc<dyn PointerActuator>) -> Self {
        Self {
            actuator,
            forwarded: 0,
        }
    }

    /// Forwards one event to the actuator.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] when the hardware write fails.
    pub fn handle_move(&mut self, event: &MoveEvent) -> Result<(), ActuatorError> {
        self.actuator.send(event)?;
        self.forwarded += 1;
        Ok(())
    }

    /// Number of events forwarded so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
