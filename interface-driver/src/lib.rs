//! `interface-driver`: runs an unmodified memory-mapped-I/O device driver as an ordinary
//! user-space process while a separate device-model process simulates the hardware.
//!
//! The driver touches its device registers with plain loads and stores. This crate
//! installs a `SIGSEGV` handler over reserved, `PROT_NONE` device windows; every trapped
//! access is decoded, turned into a request against the model over a Unix socket, and
//! spliced back into the faulting execution context before resuming. A `SIGUSR1` handler
//! delivers model-originated interrupts to driver-registered callbacks.
//!
//! ```no_run
//! interface_driver::init()?;
//! interface_driver::register_device(0, 0x4000_0000, 0x1000)?;
//! interface_driver::register_interrupt_handler(0, |interrupt_id| {
//!     eprintln!("device 0 raised interrupt {interrupt_id}");
//! })?;
//! // ... driver dereferences pointers into [0x40000000, 0x40001000) here ...
//! interface_driver::cleanup();
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Strict-address reservations (`MAP_FIXED` at the device's numeric base) can fail on
//! systems that randomize layout; a production driver binary should be built and loaded in
//! a way that leaves the device windows free.

#[macro_use]
extern crate derive_builder;

use std::fs;

use anyhow::{Context, Result};

use interface_driver_sys::signal;

pub mod config;
pub mod decoder;
mod fault;
pub mod interrupt;
pub mod protocol;
pub mod region;
mod state;
pub mod transport;

pub use config::{InterfaceConfig, InterfaceConfigurator};
pub use interrupt::InterruptHandler;

/// Install fault and interrupt handlers with the reference defaults
/// (`/tmp/driver_simulator_socket`, `/tmp`, capacity 16).
pub fn init() -> Result<()> {
    init_with_config(InterfaceConfig::default())
}

/// Install fault and interrupt handlers with a caller-supplied [`InterfaceConfig`].
///
/// Writes `<runtime_dir>/interface_driver_<pid>` containing the driver's process id, so
/// the model knows where to leave interrupt rendezvous files and which process to signal.
pub fn init_with_config(config: InterfaceConfig) -> Result<()> {
    let driver_pid = std::process::id();
    let pid_file = config.driver_pid_file(driver_pid);

    state::install(config)?;

    // Safety: handle_fault/handle_interrupt only ever run as the handlers installed here,
    // and both perform only the signal-safe operations their own contracts promise.
    unsafe {
        signal::install_fault_handler(fault::handle_fault)
            .context("failed to install the memory-access fault handler")?;
        signal::install_interrupt_handler(interrupt::handle_interrupt)
            .context("failed to install the interrupt wake handler")?;
    }

    fs::write(&pid_file, driver_pid.to_string())
        .with_context(|| format!("failed to write driver pid file at {pid_file:?}"))?;

    log::debug!("interface-driver initialized for pid {driver_pid}");
    Ok(())
}

/// Register a device window `[base, base+size)`, reserving it as `PROT_NONE` so any
/// access traps.
pub fn register_device(device_id: u32, base: usize, size: usize) -> Result<()> {
    state::regions().register(device_id, base, size)
}

/// Unregister a previously registered device window and release its reservation.
pub fn unregister_device(device_id: u32) -> Result<()> {
    state::regions().unregister(device_id)
}

/// Record the callback invoked when the model signals an interrupt for `device_id`.
///
/// The callback runs on a signal stack: only async-signal-safe operations are
/// permitted inside it.
pub fn register_interrupt_handler(device_id: u32, handler: InterruptHandler) -> Result<()> {
    state::interrupts().set(device_id, handler)
}

/// Release every registered reservation and remove the driver pid file.
///
/// Does not uninstall the fault/interrupt signal handlers; a driver that calls
/// `cleanup()` is expected to be shutting down.
pub fn cleanup() {
    if !state::is_installed() {
        return;
    }

    state::regions().clear();

    let pid_file = state::config().driver_pid_file(state::driver_pid());
    if let Err(err) = fs::remove_file(&pid_file) {
        if err.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove driver pid file at {pid_file:?}: {err}");
        }
    }

    log::debug!("interface-driver cleaned up for pid {}", state::driver_pid());
}
