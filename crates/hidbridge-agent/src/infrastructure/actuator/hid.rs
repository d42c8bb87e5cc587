//! USB HID mouse gadget writer.
//!
//! The device exposes itself to the controlled machine as a USB mouse via
//! the Linux usb-gadget HID function. Each report written to the gadget
//! endpoint is four bytes: `buttons, dx, dy, wheel`, with the deltas as
//! signed two's-complement bytes. The endpoint is a single exclusive
//! hardware handle, so every write goes through one mutex.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use hidbridge_core::protocol::messages::MoveEvent;

use crate::application::forward_events::{ActuatorError, PointerActuator};

/// Conventional gadget endpoint path on the device.
pub const DEFAULT_DEVICE: &str = "/dev/hidg0";

/// Report layout: buttons, dx, dy, wheel.
const REPORT_LEN: usize = 4;

/// A HID delta byte carries at most ±127.
const MAX_DELTA: i32 = 127;

/// Writes movement reports to the USB gadget endpoint.
pub struct HidGadgetActuator {
    device: PathBuf,
    write_lock: Mutex<()>,
}

impl HidGadgetActuator {
    /// Opens the actuator over `device`, verifying once that the endpoint
    /// exists and is writable.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::Unavailable`] when the endpoint is missing
    /// or not writable (usb-gadget not configured, or missing permissions —
    /// fix with udev rules or run as root).
    pub fn open(device: impl Into<PathBuf>) -> Result<Self, ActuatorError> {
        let device = device.into();
        if !device.exists() {
            return Err(ActuatorError::Unavailable(format!(
                "HID device {} does not exist (is the usb-gadget configured?)",
                device.display()
            )));
        }
        OpenOptions::new()
            .write(true)
            .open(&device)
            .map_err(|e| {
                ActuatorError::Unavailable(format!(
                    "cannot open {} for writing: {e}",
                    device.display()
                ))
            })?;
        Ok(Self {
            device,
            write_lock: Mutex::new(()),
        })
    }

    /// Endpoint this actuator writes to.
    pub fn device(&self) -> &Path {
        &self.device
    }

    /// Builds the 4-byte report for one event, clamping deltas to ±127.
    fn report(event: &MoveEvent) -> [u8; REPORT_LEN] {
        let dx = event.dx.clamp(-MAX_DELTA, MAX_DELTA) as i8;
        let dy = event.dy.clamp(-MAX_DELTA, MAX_DELTA) as i8;
        [event.buttons, dx as u8, dy as u8, 0]
    }
}

impl PointerActuator for HidGadgetActuator {
    fn send(&self, event: &MoveEvent) -> Result<(), ActuatorError> {
        let report = Self::report(event);
        // One writer at a time; interleaved reports corrupt the stream.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut endpoint = OpenOptions::new().write(true).open(&self.device)?;
        endpoint.write_all(&report)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn fake_endpoint() -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hidbridge-hidg-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_open_fails_when_device_missing() {
        let result = HidGadgetActuator::open("/nonexistent/hidg0");
        assert!(matches!(result, Err(ActuatorError::Unavailable(_))));
    }

    #[test]
    fn test_report_encodes_buttons_and_deltas() {
        let report = HidGadgetActuator::report(&MoveEvent { dx: 5, dy: -3, buttons: 1 });
        assert_eq!(report, [1, 5, 0xFD, 0]);
    }

    #[test]
    fn test_report_clamps_oversized_deltas() {
        let report = HidGadgetActuator::report(&MoveEvent { dx: 500, dy: -500, buttons: 0 });
        assert_eq!(report, [0, 127, 0x81, 0]); // 0x81 == -127 as u8
    }

    #[test]
    fn test_send_writes_one_report_to_the_endpoint() {
        let path = fake_endpoint();
        let actuator = HidGadgetActuator::open(&path).expect("open fake endpoint");

        actuator
            .send(&MoveEvent { dx: 1, dy: 2, buttons: 0 })
            .expect("send");

        let mut written = Vec::new();
        std::fs::File::open(&path)
            .unwrap()
            .read_to_end(&mut written)
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(written, vec![0, 1, 2, 0]);
    }
}
