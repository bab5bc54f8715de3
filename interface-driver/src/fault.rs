//! Fault Handler: the signal entry point that turns a trapped access into
//! `find → decode → transport → patch → resume`.
//!
//! Split into a thin `extern "C"` entry ([`handle_fault`]) and an inner, testable
//! [`dispatch`] that takes a [`FaultContext`] and the faulting address directly. The split
//! lets the orchestration logic run under a normal test harness instead of a real
//! `SIGSEGV`.

use std::ffi::c_void;
use std::os::raw::c_int;

use interface_driver_sys::context::FaultContext;

use crate::decoder::{decode, Direction};
use crate::protocol::Message;
use crate::{state, transport};

/// Real `SIGSEGV` entry point installed by [`crate::init_with_config`].
///
/// # Safety
/// Must only be installed as a `SA_SIGINFO` handler for `SIGSEGV`; `info` and `ctx` must be
/// the pointers the OS passes to such a handler.
pub extern "C" fn handle_fault(_signum: c_int, info: *mut libc::siginfo_t, ctx: *mut c_void) {
    // Safety: invoked only as the installed SA_SIGINFO handler, per the contract above.
    let fault_addr = unsafe { (*info).si_addr() } as usize;
    let mut context = unsafe { FaultContext::from_raw(ctx) };

    dispatch(fault_addr, &mut context);
}

/// Orchestrate one trapped access: find the owning region, decode the instruction,
/// exchange with the model, patch the context, and advance the program counter.
///
/// Terminates the process with a diagnostic on an unmapped fault or a transport hard
/// error — both are unrecoverable for the current access.
fn dispatch(fault_addr: usize, context: &mut FaultContext) {
    let device_id = {
        let regions = state::regions();
        match regions.find_by_address(fault_addr) {
            Some(region) => region.device_id,
            None => {
                die(&format!(
                    "interface-driver: unmapped access at {fault_addr:#x}"
                ));
            }
        }
    };

    let info = unsafe { decode(context.instruction_pointer()) };
    if !info.recognized {
        log::warn!(
            "unrecognized opcode at {:p}, treating as width-4 load (decoded length {})",
            context.instruction_pointer(),
            info.length
        );
    }

    let request = match info.direction {
        Direction::Store => {
            let data = info
                .immediate
                .unwrap_or_else(|| context.accumulator_low_bytes(info.width));
            Message::write_request(device_id, fault_addr as u32, info.width as u32, data)
        }
        Direction::Load => Message::read_request(device_id, fault_addr as u32, info.width as u32),
    };

    log::trace!("device {device_id} access at {fault_addr:#x}: {request:?}");

    let response = match transport::exchange(&state::config().socket_path, request) {
        Ok(response) => response,
        Err(err) => die(&format!(
            "interface-driver: transport failure for device {device_id}: {err:#}"
        )),
    };

    if response.result != 0 {
        log::warn!(
            "device {device_id} reported error {} for access at {fault_addr:#x}",
            response.result
        );
    }

    if info.direction == Direction::Load {
        context.set_accumulator_low_bytes(info.width, response.data);
    }

    context.advance_program_counter(info.length as usize);
}

/// Log `message` to stderr and terminate the process immediately.
///
/// Called only from signal context on an unrecoverable fault; uses `libc::_exit` rather
/// than unwinding or running destructors, neither of which is safe to invoke from inside
/// a signal handler.
fn die(message: &str) -> ! {
    eprintln!("{message}");
    // Safety: terminates the process immediately; nothing below this call runs.
    unsafe { libc::_exit(1) }
}
