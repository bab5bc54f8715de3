//! End-to-end coverage of the interrupt dispatcher: a real rendezvous file plus a real
//! `SIGUSR1` delivery must invoke exactly the registered handler for the device named in
//! the record, and the rendezvous file must be gone afterward.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use interface_driver::InterfaceConfigurator;

static LAST_INTERRUPT: AtomicU32 = AtomicU32::new(u32::MAX);

fn record_interrupt(interrupt_id: u32) {
    LAST_INTERRUPT.store(interrupt_id, Ordering::SeqCst);
}

#[test]
fn wake_signal_dispatches_to_the_registered_handler() {
    let _ = env_logger::try_init();

    let runtime_dir = std::env::temp_dir().join(format!(
        "interface-driver-it-interrupt-{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&runtime_dir).unwrap();

    let config = InterfaceConfigurator::default()
        .socket_path(runtime_dir.join("model.sock"))
        .runtime_dir(runtime_dir.clone())
        .build()
        .unwrap();
    interface_driver::init_with_config(config).unwrap();

    interface_driver::register_device(0, 0, 0).unwrap_err(); // size 0 is invalid; sanity check error path is live
    let page = 4096;
    let base = unsafe {
        let addr = libc::mmap(
            std::ptr::null_mut(),
            page,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        );
        libc::munmap(addr, page);
        addr as usize
    };
    interface_driver::register_device(0, base, page).unwrap();
    interface_driver::register_interrupt_handler(0, record_interrupt).unwrap();

    let rendezvous = runtime_dir.join(format!("interrupt_info_{}", std::process::id()));
    std::fs::write(&rendezvous, "0,2").unwrap();

    unsafe {
        libc::raise(libc::SIGUSR1);
    }

    let deadline = Instant::now() + Duration::from_secs(2);
    while LAST_INTERRUPT.load(Ordering::SeqCst) == u32::MAX && Instant::now() < deadline {
        std::thread::yield_now();
    }

    assert_eq!(LAST_INTERRUPT.load(Ordering::SeqCst), 2);
    assert!(!rendezvous.exists(), "rendezvous file must be consumed");

    interface_driver::unregister_device(0).unwrap();
    interface_driver::cleanup();
    let _ = std::fs::remove_dir_all(&runtime_dir);
}
