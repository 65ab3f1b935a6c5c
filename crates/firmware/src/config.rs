//! Board configuration, fixed at compile time.
//!
//! The cold boot has no runtime configuration: no flash-stored settings, no
//! files, no CLI. Everything the sequence needs is a constant here.
//! [`BootConfig`] bundles them so host tests can boot with other values.

use boot_hal::{Hertz, LockTimeout, TickPeriod};

/// Main oscillator frequency: the internal RC at its 12 MHz reset trim.
pub const MAIN_CLOCK_HZ: u32 = 12_000_000;

/// Crystal characteristic flag. `0`: the internal RC drives MAINCK.
pub const CRYSTAL_FLAG: u32 = 0;

/// Crystal on XIN feeding the USB PLL. Independent of the main clock: the
/// core runs from the RC while this crystal only serves USB.
pub const USB_REFERENCE_HZ: u32 = 12_000_000;

/// SysTick period.
pub const TICK_PERIOD_MS: u32 = 1;

/// Poll budget for each oscillator, PLL and master clock wait.
pub const LOCK_TIMEOUT_POLLS: u32 = 1_000_000;

/// Half of the steady-state loop period; the hook runs between two halves.
pub const LOOP_HALF_PERIOD_MS: u32 = 500;

/// Everything one boot needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    /// Requested main clock.
    pub main_clock: Hertz,
    /// Oscillator selection, see [`boot_hal::OscillatorSource`].
    pub crystal_flag: u32,
    /// XIN frequency for the USB PLL; `None` leaves the USB clock off.
    pub usb_reference: Option<Hertz>,
    /// Timebase tick.
    pub tick_period: TickPeriod,
    /// Clock wait budget.
    pub lock_timeout: LockTimeout,
    /// Delay on each side of the steady-state hook.
    pub loop_half_period_ms: u32,
}

impl BootConfig {
    /// The board's compiled-in configuration.
    pub const DEFAULT: Self = Self {
        main_clock: Hertz::hz(MAIN_CLOCK_HZ),
        crystal_flag: CRYSTAL_FLAG,
        usb_reference: Some(Hertz::hz(USB_REFERENCE_HZ)),
        tick_period: TickPeriod::from_millis(TICK_PERIOD_MS),
        lock_timeout: LockTimeout::polls(LOCK_TIMEOUT_POLLS),
        loop_half_period_ms: LOOP_HALF_PERIOD_MS,
    };
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_12mhz_rc_board() {
        let cfg = BootConfig::default();
        assert_eq!(cfg.main_clock, Hertz::mhz(12));
        assert_eq!(cfg.crystal_flag, 0);
        assert_eq!(cfg.usb_reference, Some(Hertz::mhz(12)));
        assert_eq!(cfg.tick_period, TickPeriod::ONE_MS);
        assert_eq!(cfg.lock_timeout, LockTimeout::DEFAULT);
        assert_eq!(cfg.loop_half_period_ms, 500);
    }
}
