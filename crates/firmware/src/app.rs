//! Steady-state loop.
//!
//! Once the timebase runs the boot is complete and the core settles into one
//! cooperative loop, forever:
//!
//! ```text
//! delay_ms(half) -> hook.on_tick() -> delay_ms(half) -> ...
//! ```
//!
//! The loop owns the timebase and the hook. The hook only gets what the
//! [`AppHook`] signature gives it, so it cannot reconfigure clocks, caches or
//! the watchdog behind the loop's back.

use boot_hal::{TickSource, Timebase};

/// The periodic application action.
pub trait AppHook {
    /// Called once per loop iteration, halfway through the period.
    fn on_tick(&mut self);
}

impl<F: FnMut()> AppHook for F {
    fn on_tick(&mut self) {
        self();
    }
}

/// Placeholder action for a board with nothing attached yet.
///
/// Counts iterations and logs a heartbeat so a debugger or RTT viewer can see
/// the loop is alive.
#[derive(Debug, Default)]
pub struct Heartbeat {
    beats: u32,
}

impl Heartbeat {
    /// Iterations seen so far (wrapping).
    pub fn beats(&self) -> u32 {
        self.beats
    }
}

impl AppHook for Heartbeat {
    fn on_tick(&mut self) {
        self.beats = self.beats.wrapping_add(1);
        #[cfg(feature = "defmt")]
        defmt::debug!("heartbeat {=u32}", self.beats);
        #[cfg(feature = "simulator")]
        tracing::debug!(beats = self.beats, "heartbeat");
    }
}

/// Terminal state of the firmware.
pub struct SteadyState<T, H> {
    timebase: Timebase<T>,
    hook: H,
    half_period_ms: u32,
}

impl<T: TickSource, H: AppHook> SteadyState<T, H> {
    /// Loop with `half_period_ms` on either side of `hook`.
    pub fn new(timebase: Timebase<T>, hook: H, half_period_ms: u32) -> Self {
        Self {
            timebase,
            hook,
            half_period_ms,
        }
    }

    /// One iteration: delay, hook, delay.
    pub fn step(&mut self) {
        self.timebase.delay_ms(self.half_period_ms);
        self.hook.on_tick();
        self.timebase.delay_ms(self.half_period_ms);
    }

    /// Run forever.
    pub fn run(mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// The hook, for inspection between steps.
    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// The timebase.
    pub fn timebase(&self) -> &Timebase<T> {
        &self.timebase
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::boot::{run_boot_sequence, BootPeripherals};
    use crate::config::BootConfig;
    use boot_hal::mocks::SimulatedMcu;

    #[test]
    fn heartbeat_counts_steps() {
        let mcu = SimulatedMcu::new();
        let peripherals = BootPeripherals {
            cache: mcu.cache(),
            watchdog: mcu.watchdog(),
            clock: mcu.clock(),
            tick: mcu.tick(),
        };
        let running = run_boot_sequence(&BootConfig::DEFAULT, peripherals).unwrap();
        let (_, timebase, _) = running.into_parts();
        let mut steady = SteadyState::new(timebase, Heartbeat::default(), 5);
        steady.step();
        steady.step();
        assert_eq!(steady.hook().beats(), 2);
        // four 5 ms halves at 12 MHz
        assert!(mcu.elapsed_cycles() >= 4 * 5 * 12_000);
    }

    #[test]
    fn closures_are_hooks() {
        let mut calls = 0;
        let mut hook = || calls += 1;
        hook.on_tick();
        hook.on_tick();
        assert_eq!(calls, 2);
    }
}
