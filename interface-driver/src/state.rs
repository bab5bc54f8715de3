//! Process-global singleton tables. The region table and interrupt slots must be
//! reachable from both the driver's main context and the two signal contexts, which
//! rules out threading them through ordinary owned values. Installed once by
//! [`crate::init_with_config`]; every registration/lookup after that takes the same
//! mutex the fault and interrupt handlers lock — a simpler alternative to masking both
//! signals during every mutation.

use std::sync::{Mutex, MutexGuard, OnceLock};

use anyhow::{ensure, Result};

use crate::config::InterfaceConfig;
use crate::interrupt::InterruptSlots;
use crate::region::RegionTable;

struct Globals {
    config: InterfaceConfig,
    driver_pid: u32,
    regions: Mutex<RegionTable>,
    interrupts: Mutex<InterruptSlots>,
}

static GLOBALS: OnceLock<Globals> = OnceLock::new();

pub fn is_installed() -> bool {
    GLOBALS.get().is_some()
}

pub fn install(config: InterfaceConfig) -> Result<()> {
    ensure!(
        !is_installed(),
        "interface-driver is already initialized for this process"
    );

    let regions = Mutex::new(RegionTable::new(config.region_capacity));
    let interrupts = Mutex::new(InterruptSlots::new(config.region_capacity));
    let driver_pid = std::process::id();

    GLOBALS
        .set(Globals {
            config,
            driver_pid,
            regions,
            interrupts,
        })
        .map_err(|_| anyhow::anyhow!("race during interface-driver initialization"))
}

fn globals() -> &'static Globals {
    GLOBALS
        .get()
        .expect("interface-driver: init() must be called before use")
}

pub fn config() -> &'static InterfaceConfig {
    &globals().config
}

pub fn driver_pid() -> u32 {
    globals().driver_pid
}

pub fn regions() -> MutexGuard<'static, RegionTable> {
    globals()
        .regions
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn interrupts() -> MutexGuard<'static, InterruptSlots> {
    globals()
        .interrupts
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
