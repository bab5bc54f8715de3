//! Interrupt Dispatcher: the handler-slot table plus the rendezvous-file protocol used
//! to carry one `(device_id, interrupt_id)` record from the device-model process to the
//! driver out-of-band.

use std::fs;
use std::os::raw::c_int;
use std::path::Path;

use anyhow::{ensure, Result};

use crate::state;

/// A driver-registered interrupt callback. Runs on a signal stack: only
/// async-signal-safe operations are permitted inside it.
pub type InterruptHandler = fn(u32);

/// Fixed-size `device_id -> callback` mapping, indexed directly by id up to the region
/// capacity.
#[derive(Default)]
pub struct InterruptSlots {
    handlers: Vec<Option<InterruptHandler>>,
}

impl InterruptSlots {
    pub fn new(capacity: usize) -> Self {
        InterruptSlots {
            handlers: vec![None; capacity],
        }
    }

    pub fn set(&mut self, device_id: u32, handler: InterruptHandler) -> Result<()> {
        let slot = self.handlers.get_mut(device_id as usize);
        ensure!(
            slot.is_some(),
            "device id {device_id} exceeds interrupt table capacity ({})",
            self.handlers.len()
        );
        *slot.unwrap() = Some(handler);
        Ok(())
    }

    pub fn get(&self, device_id: u32) -> Option<InterruptHandler> {
        self.handlers.get(device_id as usize).copied().flatten()
    }
}

/// Parse a rendezvous record of the form `"<device_id>,<interrupt_id>"`.
///
/// Returns `None` for anything malformed; the dispatcher silently drops those rather
/// than invoking a handler with garbage.
pub fn parse_rendezvous(contents: &str) -> Option<(u32, u32)> {
    let mut parts = contents.trim().splitn(2, ',');
    let device_id = parts.next()?.trim().parse().ok()?;
    let interrupt_id = parts.next()?.trim().parse().ok()?;
    Some((device_id, interrupt_id))
}

/// Read, parse, and delete the rendezvous file at `path`.
///
/// Returns the parsed record if the file existed and was well-formed. Missing or
/// malformed files are not errors: they are dropped silently.
pub fn consume_rendezvous(path: &Path) -> Option<(u32, u32)> {
    let contents = fs::read_to_string(path).ok()?;
    let _ = fs::remove_file(path);
    parse_rendezvous(&contents)
}

/// Real `SIGUSR1` entry point installed by [`crate::init_with_config`].
///
/// # Safety
/// Must only be installed as the handler for [`interface_driver_sys::signal::INTERRUPT_SIGNAL`].
pub extern "C" fn handle_interrupt(_signum: c_int) {
    dispatch(&state::config().interrupt_rendezvous_file(state::driver_pid()));
}

/// Consume the rendezvous file at `path` and invoke the matching handler, if any.
///
/// A missing or malformed rendezvous, or a device id with no registered handler, is
/// silently dropped — not an error, just nothing to dispatch.
fn dispatch(path: &Path) {
    let Some((device_id, interrupt_id)) = consume_rendezvous(path) else {
        log::debug!("interrupt signal with no well-formed rendezvous at {path:?}");
        return;
    };

    let handler = state::interrupts().get(device_id);
    match handler {
        Some(handler) => handler(interrupt_id),
        None => log::debug!("interrupt for device {device_id} has no registered handler"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_record() {
        assert_eq!(parse_rendezvous("0,2"), Some((0, 2)));
        assert_eq!(parse_rendezvous("0,2\n"), Some((0, 2)));
    }

    #[test]
    fn rejects_malformed_records() {
        assert_eq!(parse_rendezvous(""), None);
        assert_eq!(parse_rendezvous("not,numbers"), None);
        assert_eq!(parse_rendezvous("5"), None);
    }

    #[test]
    fn consume_deletes_the_file() {
        let path = std::env::temp_dir().join(format!(
            "interface-driver-rendezvous-test-{}",
            std::process::id()
        ));
        fs::write(&path, "3,7").unwrap();

        assert_eq!(consume_rendezvous(&path), Some((3, 7)));
        assert!(!path.exists());
    }

    #[test]
    fn consume_missing_file_returns_none() {
        let path = std::env::temp_dir().join("interface-driver-rendezvous-does-not-exist");
        let _ = fs::remove_file(&path);
        assert_eq!(consume_rendezvous(&path), None);
    }

    #[test]
    fn slots_reject_out_of_range_device_id() {
        let mut slots = InterruptSlots::new(2);
        fn handler(_: u32) {}
        assert!(slots.set(5, handler).is_err());
        assert!(slots.set(1, handler).is_ok());
        assert!(slots.get(1).is_some());
        assert!(slots.get(0).is_none());
    }
}
