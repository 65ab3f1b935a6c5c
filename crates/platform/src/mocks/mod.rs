//! Simulated SAMx7x for host tests.
//!
//! [`SimulatedMcu`] models the parts of the chip the cold boot touches: both
//! L1 caches, the write-once watchdog mode register, the PMC main oscillator,
//! USB PLL and master clock, the flash wait states and SysTick. It hands out
//! one handle per collaborator trait; all handles share one state so a test
//! can inspect the chip after a boot and replay one after [`SimulatedMcu::reset`].
//!
//! Every register write that changes state is appended to an event log, so
//! tests can assert on ordering across collaborators.

#![cfg(any(test, feature = "std"))]

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::cache::CacheControl;
use crate::clock_config::{
    FlashWaitStates, Hertz, MainOscillator, UsbReference, RESET_MAIN_CLOCK,
};
use crate::clock_tree::ClockControl;
use crate::timebase::TickSource;
use crate::watchdog::WatchdogControl;

/// How many status polls a simulated oscillator or PLL needs before it
/// reports ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockBehavior {
    /// Ready after this many polls.
    AfterPolls(u32),
    /// Never becomes ready.
    Never,
}

impl Default for LockBehavior {
    fn default() -> Self {
        Self::AfterPolls(3)
    }
}

/// A state-changing register write seen by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEvent {
    /// `SCB` instruction cache disabled.
    InstructionCacheDisabled,
    /// `SCB` data cache cleaned and disabled.
    DataCacheDisabled,
    /// `WDT_MR.WDDIS` written.
    WatchdogDisabled,
    /// Main oscillator enabled.
    MainOscillatorStarted(MainOscillator),
    /// UPLL enabled with the given reference.
    UsbPllStarted(UsbReference),
    /// `EEFC_FMR.FWS` written.
    FlashWaitStatesSet(FlashWaitStates),
    /// MAINCK switched.
    MainOscillatorSelected(MainOscillator),
    /// `PMC_MCKR.CSS` set to MAINCK.
    MasterClockSourceMain,
    /// `PMC_MCKR.PRES`/`MDIV` set to 1.
    MasterClockPrescalerDiv1,
    /// `PMC_USB` routed to the UPLL and the USB clock enabled.
    UsbClockRouted,
    /// SysTick programmed and started.
    TickStarted {
        /// `SYST_RVR` value.
        reload: u32,
    },
}

#[derive(Debug)]
struct McuState {
    icache_enabled: bool,
    dcache_enabled: bool,
    watchdog_armed: bool,
    watchdog_mode_written: bool,

    main_lock: LockBehavior,
    usb_lock: LockBehavior,
    main_polls_left: Option<u32>,
    usb_polls_left: Option<u32>,
    started_main: Option<MainOscillator>,
    usb_pll_locked: bool,
    main_clock: Hertz,
    master_clock: Hertz,
    flash_wait_states: FlashWaitStates,
    usb_clock_routed: bool,

    cycles_per_poll: u64,
    tick_reload: Option<u32>,
    cycles: u64,

    events: Vec<HwEvent>,
}

impl McuState {
    fn new(main_lock: LockBehavior, usb_lock: LockBehavior, cycles_per_poll: u64) -> Self {
        Self {
            icache_enabled: true,
            dcache_enabled: true,
            watchdog_armed: true,
            watchdog_mode_written: false,
            main_lock,
            usb_lock,
            main_polls_left: None,
            usb_polls_left: None,
            started_main: None,
            usb_pll_locked: false,
            main_clock: RESET_MAIN_CLOCK,
            master_clock: RESET_MAIN_CLOCK,
            flash_wait_states: FlashWaitStates::from_field(0),
            usb_clock_routed: false,
            cycles_per_poll,
            tick_reload: None,
            cycles: 0,
            events: Vec::new(),
        }
    }

    /// Count down a lock. `None` means nothing was started.
    fn poll_lock(behavior: LockBehavior, left: &mut Option<u32>) -> bool {
        match (behavior, left.as_mut()) {
            (LockBehavior::Never, _) | (_, None) => false,
            (LockBehavior::AfterPolls(_), Some(0)) => true,
            (LockBehavior::AfterPolls(_), Some(n)) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
        }
    }

    fn lock_budget(behavior: LockBehavior) -> Option<u32> {
        match behavior {
            LockBehavior::AfterPolls(n) => Some(n),
            LockBehavior::Never => Some(u32::MAX),
        }
    }
}

/// Default cycles the simulated core spends per tick-flag poll. Odd, so tick
/// edges land at varying offsets within a poll.
pub const DEFAULT_CYCLES_PER_POLL: u32 = 997;

/// A simulated SAMx7x in its reset state.
#[derive(Clone)]
pub struct SimulatedMcu {
    state: Rc<RefCell<McuState>>,
}

impl Default for SimulatedMcu {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMcu {
    /// Chip fresh out of reset: caches on, watchdog armed, 12 MHz internal RC.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(McuState::new(
                LockBehavior::default(),
                LockBehavior::default(),
                u64::from(DEFAULT_CYCLES_PER_POLL),
            ))),
        }
    }

    /// Main oscillator start-up behaviour.
    #[must_use]
    pub fn with_main_oscillator_lock(self, behavior: LockBehavior) -> Self {
        self.state.borrow_mut().main_lock = behavior;
        self
    }

    /// USB PLL lock behaviour.
    #[must_use]
    pub fn with_usb_pll_lock(self, behavior: LockBehavior) -> Self {
        self.state.borrow_mut().usb_lock = behavior;
        self
    }

    /// Core cycles that pass per tick-flag poll. Zero is raised to one.
    #[must_use]
    pub fn with_cycles_per_poll(self, cycles: u32) -> Self {
        self.state.borrow_mut().cycles_per_poll = u64::from(cycles.max(1));
        self
    }

    /// Simulated power-on reset. Lock behaviour and poll speed survive; all
    /// register state and the event log are cleared.
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        *state = McuState::new(state.main_lock, state.usb_lock, state.cycles_per_poll);
    }

    /// Cache control handle.
    pub fn cache(&self) -> SimCache {
        SimCache(Rc::clone(&self.state))
    }

    /// Watchdog control handle.
    pub fn watchdog(&self) -> SimWatchdog {
        SimWatchdog(Rc::clone(&self.state))
    }

    /// PMC/EEFC handle.
    pub fn clock(&self) -> SimClock {
        SimClock(Rc::clone(&self.state))
    }

    /// SysTick handle.
    pub fn tick(&self) -> SimTick {
        SimTick(Rc::clone(&self.state))
    }

    /// `true` while the instruction cache is enabled.
    pub fn icache_enabled(&self) -> bool {
        self.state.borrow().icache_enabled
    }

    /// `true` while the data cache is enabled.
    pub fn dcache_enabled(&self) -> bool {
        self.state.borrow().dcache_enabled
    }

    /// `true` while the watchdog is armed.
    pub fn watchdog_armed(&self) -> bool {
        self.state.borrow().watchdog_armed
    }

    /// Frequency the core currently runs at.
    pub fn system_clock(&self) -> Hertz {
        self.state.borrow().master_clock
    }

    /// Current MAINCK frequency.
    pub fn main_clock(&self) -> Hertz {
        self.state.borrow().main_clock
    }

    /// Programmed flash wait states.
    pub fn flash_wait_states(&self) -> FlashWaitStates {
        self.state.borrow().flash_wait_states
    }

    /// `true` once the USB clock is routed to the locked UPLL.
    pub fn usb_clock_enabled(&self) -> bool {
        let state = self.state.borrow();
        state.usb_clock_routed && state.usb_pll_locked
    }

    /// SysTick reload, if started.
    pub fn tick_reload(&self) -> Option<u32> {
        self.state.borrow().tick_reload
    }

    /// Core cycles elapsed while polling the tick source.
    pub fn elapsed_cycles(&self) -> u64 {
        self.state.borrow().cycles
    }

    /// Wall time those cycles represent at the current system clock.
    pub fn elapsed_nanos(&self) -> u64 {
        let state = self.state.borrow();
        state
            .cycles
            .saturating_mul(1_000_000_000)
            .checked_div(u64::from(state.master_clock.to_hz()))
            .unwrap_or(0)
    }

    /// Register writes since reset, in order.
    pub fn events(&self) -> Vec<HwEvent> {
        self.state.borrow().events.clone()
    }
}

/// Cache handle of a [`SimulatedMcu`].
pub struct SimCache(Rc<RefCell<McuState>>);

impl CacheControl for SimCache {
    fn disable_instruction_cache(&mut self) {
        let mut state = self.0.borrow_mut();
        if state.icache_enabled {
            state.icache_enabled = false;
            state.events.push(HwEvent::InstructionCacheDisabled);
        }
    }

    fn disable_data_cache(&mut self) {
        let mut state = self.0.borrow_mut();
        if state.dcache_enabled {
            state.dcache_enabled = false;
            state.events.push(HwEvent::DataCacheDisabled);
        }
    }
}

/// Watchdog handle of a [`SimulatedMcu`].
pub struct SimWatchdog(Rc<RefCell<McuState>>);

impl WatchdogControl for SimWatchdog {
    fn disable_watchdog(&mut self) {
        let mut state = self.0.borrow_mut();
        // WDT_MR is write-once: a second write is ignored by the silicon
        if state.watchdog_armed && !state.watchdog_mode_written {
            state.watchdog_mode_written = true;
            state.watchdog_armed = false;
            state.events.push(HwEvent::WatchdogDisabled);
        }
    }
}

/// Clock handle of a [`SimulatedMcu`].
pub struct SimClock(Rc<RefCell<McuState>>);

impl ClockControl for SimClock {
    fn start_main_oscillator(&mut self, oscillator: MainOscillator) {
        let mut state = self.0.borrow_mut();
        state.main_polls_left = McuState::lock_budget(state.main_lock);
        state.started_main = Some(oscillator);
        state.events.push(HwEvent::MainOscillatorStarted(oscillator));
    }

    fn main_oscillator_stable(&mut self) -> bool {
        let mut state = self.0.borrow_mut();
        let behavior = state.main_lock;
        McuState::poll_lock(behavior, &mut state.main_polls_left)
    }

    fn start_usb_pll(&mut self, reference: UsbReference) {
        let mut state = self.0.borrow_mut();
        state.usb_polls_left = McuState::lock_budget(state.usb_lock);
        state.events.push(HwEvent::UsbPllStarted(reference));
    }

    fn usb_pll_locked(&mut self) -> bool {
        let mut state = self.0.borrow_mut();
        let behavior = state.usb_lock;
        let locked = McuState::poll_lock(behavior, &mut state.usb_polls_left);
        state.usb_pll_locked = locked;
        locked
    }

    fn flash_wait_states(&mut self) -> FlashWaitStates {
        self.0.borrow().flash_wait_states
    }

    fn set_flash_wait_states(&mut self, wait_states: FlashWaitStates) {
        let mut state = self.0.borrow_mut();
        state.flash_wait_states = wait_states;
        state.events.push(HwEvent::FlashWaitStatesSet(wait_states));
    }

    fn select_main_oscillator(&mut self, oscillator: MainOscillator) {
        let mut state = self.0.borrow_mut();
        state.main_clock = oscillator.frequency();
        state.events.push(HwEvent::MainOscillatorSelected(oscillator));
    }

    fn main_oscillator_selected(&mut self) -> bool {
        let state = self.0.borrow();
        // switching to an oscillator that was never started never completes
        state
            .started_main
            .is_some_and(|osc| osc.frequency() == state.main_clock)
    }

    fn select_master_clock_main(&mut self) {
        let mut state = self.0.borrow_mut();
        state.master_clock = state.main_clock;
        state.events.push(HwEvent::MasterClockSourceMain);
    }

    fn set_master_clock_prescaler_div1(&mut self) {
        let mut state = self.0.borrow_mut();
        state.master_clock = state.main_clock;
        state.events.push(HwEvent::MasterClockPrescalerDiv1);
    }

    fn master_clock_ready(&mut self) -> bool {
        true
    }

    fn route_usb_clock(&mut self) {
        let mut state = self.0.borrow_mut();
        state.usb_clock_routed = true;
        state.events.push(HwEvent::UsbClockRouted);
    }
}

/// SysTick handle of a [`SimulatedMcu`].
///
/// Each [`TickSource::period_elapsed`] call costs the configured number of
/// core cycles; the flag reports whether the counter wrapped in between.
pub struct SimTick(Rc<RefCell<McuState>>);

impl TickSource for SimTick {
    fn start(&mut self, reload: u32) {
        let mut state = self.0.borrow_mut();
        state.tick_reload = Some(reload);
        state.cycles = 0;
        state.events.push(HwEvent::TickStarted { reload });
    }

    fn period_elapsed(&mut self) -> bool {
        let mut state = self.0.borrow_mut();
        let Some(reload) = state.tick_reload else {
            return false;
        };
        let period = u64::from(reload).saturating_add(1);
        let before = state.cycles;
        let after = before.saturating_add(state.cycles_per_poll);
        state.cycles = after;
        after.checked_div(period) != before.checked_div(period)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
