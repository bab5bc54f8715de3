use std::ffi::c_void;
use std::os::raw::c_int;

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

/// Signature required of the fault (memory-access trap) handler.
pub type FaultHandlerFn = extern "C" fn(c_int, *mut libc::siginfo_t, *mut c_void);

/// Signature required of the interrupt (out-of-band wake) handler.
pub type InterruptHandlerFn = extern "C" fn(c_int);

/// The signal used for the memory-access trap.
pub const FAULT_SIGNAL: Signal = Signal::SIGSEGV;

/// The signal used for model-originated interrupt delivery.
pub const INTERRUPT_SIGNAL: Signal = Signal::SIGUSR1;

/// Install `handler` for [`FAULT_SIGNAL`].
///
/// The interrupt signal is added to the handler's own mask, so delivery of a driver
/// interrupt is blocked for the duration of a trapped access: the model must not see an
/// interrupt callback interleaved with an unfinished register access.
///
/// # Safety
/// `handler` must only perform async-signal-safe operations.
pub unsafe fn install_fault_handler(handler: FaultHandlerFn) -> nix::Result<()> {
    let mut blocked = SigSet::empty();
    blocked.add(INTERRUPT_SIGNAL);

    let action = SigAction::new(SigHandler::SigAction(handler), SaFlags::SA_SIGINFO, blocked);
    signal::sigaction(FAULT_SIGNAL, &action)?;
    Ok(())
}

/// Install `handler` for [`INTERRUPT_SIGNAL`].
///
/// # Safety
/// `handler` must only perform async-signal-safe operations.
pub unsafe fn install_interrupt_handler(handler: InterruptHandlerFn) -> nix::Result<()> {
    let action = SigAction::new(SigHandler::Handler(handler), SaFlags::empty(), SigSet::empty());
    signal::sigaction(INTERRUPT_SIGNAL, &action)?;
    Ok(())
}
