//! Pointer actuator implementations.
//!
//! The actuator capability is probed once at startup: if the USB HID gadget
//! endpoint is present and writable, the real [`hid::HidGadgetActuator`] is
//! selected; otherwise the agent runs with [`NullActuator`], which drops
//! events (useful on development machines without gadget hardware). There
//! is no ad-hoc "is the device there?" checking at call sites.

pub mod hid;
pub mod mock;

use std::path::Path;
use std::sync::Arc;

use hidbridge_core::protocol::messages::MoveEvent;
use tracing::{info, trace, warn};

use crate::application::forward_events::{ActuatorError, PointerActuator};
use self::hid::HidGadgetActuator;

/// Probes `device` and returns the real actuator or the no-op fallback.
pub fn select_actuator(device: &Path) -> Arc<dyn PointerActuator> {
    match HidGadgetActuator::open(device) {
        Ok(actuator) => {
            info!("HID gadget actuator ready at {}", device.display());
            Arc::new(actuator)
        }
        Err(e) => {
            warn!("{e}; pointer events will be dropped");
            Arc::new(NullActuator)
        }
    }
}

/// Accepts and discards every event.
pub struct NullActuator;

impl PointerActuator for NullActuator {
    fn send(&self, event: &MoveEvent) -> Result<(), ActuatorError> {
        trace!("no actuator; dropping {event:?}");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
