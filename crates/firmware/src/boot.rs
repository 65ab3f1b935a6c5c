//! Cold-boot sequence for the SAMx7x.
//!
//! Initialization order (MUST be respected, each step depends on the last):
//!   1. Disable I-cache and D-cache (cache timing must not straddle a clock change)
//!   2. Disable the watchdog (oscillator start-up can outlast its reset timeout)
//!   3. Configure the main clock (validate, start oscillator, wait for stable)
//!   4. Optionally lock the USB PLL from its XIN reference
//!   5. Commit the clock tree (flash wait states, MCK switch, USB routing)
//!   6. Initialize the timebase from the committed frequency
//!   7. Enter the steady-state loop ([`crate::app::SteadyState`])
//!
//! Each step is a method on a stage type that consumes the previous stage, so
//! an out-of-order call has no receiver and does not compile:
//!
//! ```text
//! ColdBoot --disable_caches()--> CachesDisabled --disable_watchdog()--> WatchdogDisabled
//!   --configure_main_clock()--> MainClockConfigured --enable_usb_clock(ref)--> UsbClockConfigured
//!                                     |                                           |
//!                                     +------------commit_clock_tree()------------+
//!                                                          v
//!                                                   ClockConfigured --init_timebase()--> TimebaseRunning
//! ```
//!
//! Starting the timebase before the clock tree is committed is rejected at
//! compile time:
//!
//! ```compile_fail
//! use boot_hal::{ClockControl, TickPeriod, TickSource};
//! use coldboot::boot::WatchdogDisabled;
//!
//! fn premature<K: ClockControl, T: TickSource>(stage: WatchdogDisabled<K, T>) {
//!     let _ = stage.init_timebase(TickPeriod::ONE_MS);
//! }
//! ```
//!
//! whereas the same call on a committed clock is fine:
//!
//! ```
//! use boot_hal::{ClockControl, TickPeriod, TickSource};
//! use coldboot::boot::ClockConfigured;
//!
//! fn in_order<K: ClockControl, T: TickSource>(stage: ClockConfigured<K, T>) {
//!     let _ = stage.init_timebase(TickPeriod::ONE_MS);
//! }
//! ```
//!
//! Failures are never retried and nothing is rolled back: the caller halts
//! (see [`crate::halt`]).

use boot_hal::{
    CacheControl, ClockConfiguration, ClockControl, ClockError, ClockTreeManager, CommittedClock,
    Hertz, LockTimeout, PendingClockTree, TickPeriod, TickSource, Timebase, TimebaseError,
    WatchdogControl,
};

use crate::config::BootConfig;

/// Ordered list of boot sequence steps for documentation and testing.
///
/// # Correctness Invariants
///
/// - Both caches are off before the first clock register write.
/// - The watchdog is off before any oscillator wait begins.
/// - Nothing consumes the new main clock until the commit.
/// - The SysTick reload is derived from the committed frequency, never the
///   reset default.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. I-cache: disable before any clock change",
    "2. D-cache: clean and disable before any clock change",
    "3. Watchdog: disable before waiting on oscillators",
    "4. Main clock: validate request, start oscillator, wait for stable",
    "5. USB clock: lock UPLL from the XIN reference",
    "6. Clock commit: raise flash wait states, switch MCK, route USB clock",
    "7. Timebase: program SysTick from the committed frequency",
    "8. Steady state: delay, hook, delay, forever",
];

// ── Boot state ───────────────────────────────────────────────────────────────

/// Positions on the boot trajectory, in the only order they can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootState {
    /// Reset state: both L1 caches on.
    CachesEnabled,
    /// Both caches off.
    CachesDisabled,
    /// Watchdog still running from reset.
    WatchdogArmed,
    /// Watchdog off.
    WatchdogDisabled,
    /// Core still on the reset-default clock.
    ClockDefault,
    /// Clock tree committed.
    ClockConfigured,
    /// No tick programmed yet.
    TimebaseUninit,
    /// SysTick running; the boot is complete.
    TimebaseRunning,
}

impl BootState {
    /// Number of states.
    pub const COUNT: usize = 8;

    /// Short name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CachesEnabled => "caches enabled",
            Self::CachesDisabled => "caches disabled",
            Self::WatchdogArmed => "watchdog armed",
            Self::WatchdogDisabled => "watchdog disabled",
            Self::ClockDefault => "clock default",
            Self::ClockConfigured => "clock configured",
            Self::TimebaseUninit => "timebase uninit",
            Self::TimebaseRunning => "timebase running",
        }
    }
}

/// The states one boot has visited, oldest first.
///
/// Every transition is logged here and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootTrace {
    visited: heapless::Vec<BootState, { BootState::COUNT }>,
}

impl BootTrace {
    fn new() -> Self {
        let mut trace = Self {
            visited: heapless::Vec::new(),
        };
        trace.advance(BootState::CachesEnabled);
        trace
    }

    fn advance(&mut self, state: BootState) {
        debug_assert!(
            self.visited.last().map_or(true, |last| *last < state),
            "boot states must be visited in order"
        );
        #[cfg(feature = "defmt")]
        defmt::info!("boot: {}", state);
        #[cfg(feature = "simulator")]
        tracing::info!(state = state.name(), "boot");
        // capacity equals the number of states and states never repeat
        let _ = self.visited.push(state);
    }

    /// Visited states in order.
    pub fn states(&self) -> &[BootState] {
        &self.visited
    }

    /// The most recent state.
    pub fn current(&self) -> BootState {
        self.visited
            .last()
            .copied()
            .unwrap_or(BootState::CachesEnabled)
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Any error that stops the boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    /// Clock tree configuration or lock failed.
    #[error("clock tree: {0}")]
    Clock(#[from] ClockError),
    /// The timebase could not be programmed.
    #[error("timebase: {0}")]
    Timebase(#[from] TimebaseError),
}

// ── Peripherals ──────────────────────────────────────────────────────────────

/// The four collaborators a boot consumes, one owned handle each.
pub struct BootPeripherals<C, W, K, T> {
    /// Cache control.
    pub cache: C,
    /// Watchdog control.
    pub watchdog: W,
    /// PMC / EEFC clock control.
    pub clock: K,
    /// SysTick.
    pub tick: T,
}

// ── Stages ───────────────────────────────────────────────────────────────────

/// Reset-vector state: caches on, watchdog armed, reset-default clock.
pub struct ColdBoot<C, W, K, T> {
    peripherals: BootPeripherals<C, W, K, T>,
    lock_timeout: LockTimeout,
    trace: BootTrace,
}

impl<C, W, K, T> ColdBoot<C, W, K, T>
where
    C: CacheControl,
    W: WatchdogControl,
    K: ClockControl,
    T: TickSource,
{
    /// Take ownership of the boot peripherals.
    pub fn new(peripherals: BootPeripherals<C, W, K, T>) -> Self {
        Self {
            peripherals,
            lock_timeout: LockTimeout::DEFAULT,
            trace: BootTrace::new(),
        }
    }

    /// Override the clock wait budget.
    #[must_use]
    pub fn with_lock_timeout(mut self, lock_timeout: LockTimeout) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Trace so far.
    pub fn trace(&self) -> &BootTrace {
        &self.trace
    }

    /// Disable the instruction cache, then the data cache.
    #[must_use]
    pub fn disable_caches(self) -> CachesDisabled<W, K, T> {
        let Self {
            peripherals,
            lock_timeout,
            mut trace,
        } = self;
        let BootPeripherals {
            mut cache,
            watchdog,
            clock,
            tick,
        } = peripherals;

        cache.disable_instruction_cache();
        cache.disable_data_cache();
        trace.advance(BootState::CachesDisabled);
        trace.advance(BootState::WatchdogArmed);

        CachesDisabled {
            watchdog,
            clock,
            tick,
            lock_timeout,
            trace,
        }
    }
}

/// Caches off; the watchdog is still running.
pub struct CachesDisabled<W, K, T> {
    watchdog: W,
    clock: K,
    tick: T,
    lock_timeout: LockTimeout,
    trace: BootTrace,
}

impl<W, K, T> CachesDisabled<W, K, T>
where
    W: WatchdogControl,
    K: ClockControl,
    T: TickSource,
{
    /// Trace so far.
    pub fn trace(&self) -> &BootTrace {
        &self.trace
    }

    /// Disable the watchdog.
    #[must_use]
    pub fn disable_watchdog(self) -> WatchdogDisabled<K, T> {
        let Self {
            mut watchdog,
            clock,
            tick,
            lock_timeout,
            mut trace,
        } = self;

        watchdog.disable_watchdog();
        trace.advance(BootState::WatchdogDisabled);
        trace.advance(BootState::ClockDefault);

        WatchdogDisabled {
            manager: ClockTreeManager::new(clock, lock_timeout),
            tick,
            trace,
        }
    }
}

/// Watchdog off; the core still runs from the reset-default clock.
pub struct WatchdogDisabled<K, T> {
    manager: ClockTreeManager<K>,
    tick: T,
    trace: BootTrace,
}

impl<K: ClockControl, T: TickSource> WatchdogDisabled<K, T> {
    /// Trace so far.
    pub fn trace(&self) -> &BootTrace {
        &self.trace
    }

    /// Validate the requested main clock and bring its oscillator up.
    ///
    /// The core keeps running from the reset-default clock.
    pub fn configure_main_clock(
        self,
        frequency: Hertz,
        crystal_flag: u32,
    ) -> Result<MainClockConfigured<K, T>, BootError> {
        let pending = self.manager.configure_main_clock(frequency, crystal_flag)?;
        Ok(MainClockConfigured {
            pending,
            tick: self.tick,
            trace: self.trace,
        })
    }
}

/// Main oscillator stable, not yet in use.
pub struct MainClockConfigured<K, T> {
    pending: PendingClockTree<K>,
    tick: T,
    trace: BootTrace,
}

impl<K: ClockControl, T: TickSource> MainClockConfigured<K, T> {
    /// Trace so far.
    pub fn trace(&self) -> &BootTrace {
        &self.trace
    }

    /// Configuration the commit will apply.
    pub fn configuration(&self) -> &ClockConfiguration {
        self.pending.configuration()
    }

    /// Lock the USB PLL to `reference` on XIN, whatever the main clock is.
    pub fn enable_usb_clock(
        self,
        reference: Hertz,
    ) -> Result<UsbClockConfigured<K, T>, BootError> {
        Ok(UsbClockConfigured {
            pending: self.pending.enable_usb_clock(reference)?,
            tick: self.tick,
            trace: self.trace,
        })
    }

    /// Switch the core to the new main clock without USB.
    pub fn commit_clock_tree(self) -> Result<ClockConfigured<K, T>, BootError> {
        commit(self.pending, self.tick, self.trace)
    }
}

/// Main oscillator stable and USB PLL locked, neither in use yet.
pub struct UsbClockConfigured<K, T> {
    pending: PendingClockTree<K>,
    tick: T,
    trace: BootTrace,
}

impl<K: ClockControl, T: TickSource> UsbClockConfigured<K, T> {
    /// Trace so far.
    pub fn trace(&self) -> &BootTrace {
        &self.trace
    }

    /// Configuration the commit will apply.
    pub fn configuration(&self) -> &ClockConfiguration {
        self.pending.configuration()
    }

    /// Switch the core to the new main clock and route the USB clock.
    pub fn commit_clock_tree(self) -> Result<ClockConfigured<K, T>, BootError> {
        commit(self.pending, self.tick, self.trace)
    }
}

fn commit<K: ClockControl, T>(
    pending: PendingClockTree<K>,
    tick: T,
    mut trace: BootTrace,
) -> Result<ClockConfigured<K, T>, BootError> {
    let clock = pending.commit_clock_tree()?;
    #[cfg(feature = "defmt")]
    defmt::info!(
        "clock tree committed: {=u32} Hz, {=u8} flash WS, usb={=bool}",
        clock.frequency().to_hz(),
        clock.configuration().flash_wait_states.get(),
        clock.configuration().usb_clock_enabled()
    );
    #[cfg(feature = "simulator")]
    tracing::debug!(
        hz = clock.frequency().to_hz(),
        flash_wait_states = clock.configuration().flash_wait_states.get(),
        usb = clock.configuration().usb_clock_enabled(),
        "clock tree committed"
    );
    trace.advance(BootState::ClockConfigured);
    trace.advance(BootState::TimebaseUninit);
    Ok(ClockConfigured { clock, tick, trace })
}

/// Clock tree committed; no tick yet.
pub struct ClockConfigured<K, T> {
    clock: CommittedClock<K>,
    tick: T,
    trace: BootTrace,
}

impl<K: ClockControl, T: TickSource> ClockConfigured<K, T> {
    /// Trace so far.
    pub fn trace(&self) -> &BootTrace {
        &self.trace
    }

    /// Committed system clock.
    pub fn frequency(&self) -> Hertz {
        self.clock.frequency()
    }

    /// Program SysTick for one tick per `period` at the committed frequency.
    pub fn init_timebase(self, period: TickPeriod) -> Result<TimebaseRunning<K, T>, BootError> {
        let Self {
            clock,
            tick,
            mut trace,
        } = self;
        let timebase = Timebase::new(tick, clock.system_clock(), period)?;
        #[cfg(feature = "defmt")]
        defmt::info!(
            "timebase: {=u32} ms tick, reload {=u32}",
            period.as_millis(),
            timebase.reload()
        );
        #[cfg(feature = "simulator")]
        tracing::debug!(
            period_ms = period.as_millis(),
            reload = timebase.reload(),
            "timebase running"
        );
        trace.advance(BootState::TimebaseRunning);
        Ok(TimebaseRunning {
            clock,
            timebase,
            trace,
        })
    }
}

/// Boot complete: clock committed, timebase running.
pub struct TimebaseRunning<K, T> {
    clock: CommittedClock<K>,
    timebase: Timebase<T>,
    trace: BootTrace,
}

impl<K, T: TickSource> TimebaseRunning<K, T> {
    /// Full boot trace.
    pub fn trace(&self) -> &BootTrace {
        &self.trace
    }

    /// The committed clock tree.
    pub fn clock(&self) -> &CommittedClock<K> {
        &self.clock
    }

    /// The running timebase.
    pub fn timebase(&mut self) -> &mut Timebase<T> {
        &mut self.timebase
    }

    /// Split into the committed clock, the timebase and the trace.
    pub fn into_parts(self) -> (CommittedClock<K>, Timebase<T>, BootTrace) {
        (self.clock, self.timebase, self.trace)
    }
}

/// Run steps 1–6 with `config`.
///
/// # Errors
///
/// The first [`BootError`]; later steps are not attempted.
pub fn run_boot_sequence<C, W, K, T>(
    config: &BootConfig,
    peripherals: BootPeripherals<C, W, K, T>,
) -> Result<TimebaseRunning<K, T>, BootError>
where
    C: CacheControl,
    W: WatchdogControl,
    K: ClockControl,
    T: TickSource,
{
    let main = ColdBoot::new(peripherals)
        .with_lock_timeout(config.lock_timeout)
        .disable_caches()
        .disable_watchdog()
        .configure_main_clock(config.main_clock, config.crystal_flag)?;
    let clock = if let Some(reference) = config.usb_reference {
        main.enable_usb_clock(reference)?.commit_clock_tree()?
    } else {
        main.commit_clock_tree()?
    };
    clock.init_timebase(config.tick_period)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use boot_hal::mocks::SimulatedMcu;

    fn peripherals(
        mcu: &SimulatedMcu,
    ) -> BootPeripherals<
        boot_hal::mocks::SimCache,
        boot_hal::mocks::SimWatchdog,
        boot_hal::mocks::SimClock,
        boot_hal::mocks::SimTick,
    > {
        BootPeripherals {
            cache: mcu.cache(),
            watchdog: mcu.watchdog(),
            clock: mcu.clock(),
            tick: mcu.tick(),
        }
    }

    #[test]
    fn boot_states_are_totally_ordered() {
        let states = [
            BootState::CachesEnabled,
            BootState::CachesDisabled,
            BootState::WatchdogArmed,
            BootState::WatchdogDisabled,
            BootState::ClockDefault,
            BootState::ClockConfigured,
            BootState::TimebaseUninit,
            BootState::TimebaseRunning,
        ];
        assert_eq!(states.len(), BootState::COUNT);
        assert!(states.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn trace_starts_at_reset_state() {
        let mcu = SimulatedMcu::new();
        let boot = ColdBoot::new(peripherals(&mcu));
        assert_eq!(boot.trace().states(), [BootState::CachesEnabled]);
        assert_eq!(boot.trace().current(), BootState::CachesEnabled);
    }

    #[test]
    fn stages_advance_the_trace_in_pairs() {
        let mcu = SimulatedMcu::new();
        let caches_off = ColdBoot::new(peripherals(&mcu)).disable_caches();
        assert_eq!(caches_off.trace().current(), BootState::WatchdogArmed);
        let wdt_off = caches_off.disable_watchdog();
        assert_eq!(wdt_off.trace().current(), BootState::ClockDefault);
        let main = wdt_off.configure_main_clock(Hertz::mhz(12), 0).unwrap();
        assert_eq!(
            main.trace().current(),
            BootState::ClockDefault,
            "configuring is not committing"
        );
        let clock = main.commit_clock_tree().unwrap();
        assert_eq!(clock.trace().current(), BootState::TimebaseUninit);
        let running = clock.init_timebase(TickPeriod::ONE_MS).unwrap();
        assert_eq!(running.trace().states().len(), BootState::COUNT);
        assert_eq!(running.trace().current(), BootState::TimebaseRunning);
    }

    #[test]
    fn run_boot_sequence_uses_config() {
        let mcu = SimulatedMcu::new();
        let config = BootConfig {
            main_clock: Hertz::mhz(16),
            crystal_flag: 1,
            usb_reference: Some(Hertz::mhz(16)),
            ..BootConfig::DEFAULT
        };
        let running = run_boot_sequence(&config, peripherals(&mcu)).unwrap();
        assert_eq!(running.clock().frequency(), Hertz::mhz(16));
        assert!(running.clock().configuration().usb_clock_enabled());
        assert_eq!(mcu.system_clock(), Hertz::mhz(16));
        assert_eq!(mcu.tick_reload(), Some(15_999));
    }

    #[test]
    fn usb_clock_can_be_left_off() {
        let mcu = SimulatedMcu::new();
        let config = BootConfig {
            usb_reference: None,
            ..BootConfig::DEFAULT
        };
        let running = run_boot_sequence(&config, peripherals(&mcu)).unwrap();
        assert!(!running.clock().configuration().usb_clock_enabled());
        assert!(!mcu.usb_clock_enabled());
    }

    #[test]
    fn boot_errors_wrap_their_source() {
        let err = BootError::from(ClockError::UnsupportedCrystalFlag { flag: 9 });
        assert_eq!(
            err,
            BootError::Clock(ClockError::UnsupportedCrystalFlag { flag: 9 })
        );
        assert_eq!(
            std::format!("{err}"),
            "clock tree: crystal flag 9 does not select an oscillator"
        );
    }

    #[test]
    fn boot_sequence_steps_put_caches_before_clocks() {
        let steps = BOOT_SEQUENCE_STEPS;
        let position = |needle: &str| {
            steps
                .iter()
                .position(|s| s.contains(needle))
                .expect("step must be documented")
        };
        assert!(position("I-cache") < position("Main clock"));
        assert!(position("D-cache") < position("Main clock"));
        assert!(position("Watchdog") < position("Main clock"));
        assert!(position("Clock commit") < position("Timebase"));
    }
}
