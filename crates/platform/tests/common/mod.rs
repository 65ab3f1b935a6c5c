//! Minimal in-file hardware for integration tests that must not depend on
//! the simulated MCU (`mocks` needs the `std` feature).

#![allow(dead_code, clippy::arithmetic_side_effects)]

use std::cell::Cell;
use std::rc::Rc;

use boot_hal::{
    ClockControl, ClockError, ClockTreeManager, FlashWaitStates, Hertz, LockTimeout,
    MainOscillator, SystemClock, TickSource, UsbReference,
};

/// Clock hardware whose every status bit reads ready.
pub struct ReadyClock;

impl ClockControl for ReadyClock {
    fn start_main_oscillator(&mut self, _: MainOscillator) {}
    fn main_oscillator_stable(&mut self) -> bool {
        true
    }
    fn start_usb_pll(&mut self, _: UsbReference) {}
    fn usb_pll_locked(&mut self) -> bool {
        true
    }
    fn flash_wait_states(&mut self) -> FlashWaitStates {
        FlashWaitStates::from_field(0)
    }
    fn set_flash_wait_states(&mut self, _: FlashWaitStates) {}
    fn select_main_oscillator(&mut self, _: MainOscillator) {}
    fn main_oscillator_selected(&mut self) -> bool {
        true
    }
    fn select_master_clock_main(&mut self) {}
    fn set_master_clock_prescaler_div1(&mut self) {}
    fn master_clock_ready(&mut self) -> bool {
        true
    }
    fn route_usb_clock(&mut self) {}
}

/// Commit a clock tree at `frequency` and return its proof token.
pub fn commit(frequency: Hertz, crystal_flag: u32) -> Result<SystemClock, ClockError> {
    let committed = ClockTreeManager::new(ReadyClock, LockTimeout::DEFAULT)
        .configure_main_clock(frequency, crystal_flag)?
        .commit_clock_tree()?;
    Ok(committed.system_clock())
}

/// SysTick stand-in: each poll burns `step` core cycles.
pub struct CycleTick {
    pub reload: Option<u32>,
    pub cycles: Rc<Cell<u64>>,
    pub step: u64,
}

impl CycleTick {
    pub fn new(step: u64) -> Self {
        Self {
            reload: None,
            cycles: Rc::new(Cell::new(0)),
            step,
        }
    }
}

impl TickSource for CycleTick {
    fn start(&mut self, reload: u32) {
        self.reload = Some(reload);
        self.cycles.set(0);
    }

    fn period_elapsed(&mut self) -> bool {
        let Some(reload) = self.reload else {
            return false;
        };
        let period = u64::from(reload) + 1;
        let before = self.cycles.get();
        let after = before + self.step;
        self.cycles.set(after);
        after / period != before / period
    }
}
