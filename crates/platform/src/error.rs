//! Boot-time error types.
//!
//! Only the genuinely fallible steps have an error type: clock selection and
//! lock (the clock tree) and tick period derivation (the timebase). Cache and
//! watchdog control cannot fail and return `()`.

use crate::clock_config::{Hertz, OscillatorSource};

/// The clock stage a bounded wait was polling when it ran out of budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LockStage {
    /// Main oscillator start-up (`PMC_SR.MOSCXTS` / `MOSCRCS`).
    MainOscillator,
    /// USB PLL lock (`PMC_SR.LOCKU`).
    UsbPll,
    /// MAINCK source switch (`PMC_SR.MOSCSELS`).
    MainSelect,
    /// Master clock switch (`PMC_SR.MCKRDY`).
    MasterClock,
}

impl LockStage {
    /// Short name for log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MainOscillator => "main oscillator",
            Self::UsbPll => "USB PLL",
            Self::MainSelect => "main clock select",
            Self::MasterClock => "master clock",
        }
    }
}

/// Clock tree configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// The selected oscillator cannot produce the requested frequency.
    #[error("{requested} is not supported by the {} oscillator", .oscillator.name())]
    UnsupportedFrequency {
        /// Frequency the boot configuration asked for.
        requested: Hertz,
        /// Oscillator the crystal flag selected.
        oscillator: OscillatorSource,
    },
    /// The crystal flag does not name a known oscillator mode.
    #[error("crystal flag {flag} does not select an oscillator")]
    UnsupportedCrystalFlag {
        /// The raw flag.
        flag: u32,
    },
    /// The USB PLL cannot lock to the requested reference.
    #[error("USB PLL needs a 12 or 16 MHz reference, got {reference}")]
    UsbReferenceUnsupported {
        /// The requested XIN frequency.
        reference: Hertz,
    },
    /// XIN already drives the main clock at another frequency.
    #[error("USB reference {reference} conflicts with {xin} already on XIN")]
    UsbReferenceConflict {
        /// The requested USB reference.
        reference: Hertz,
        /// Frequency the external main oscillator runs XIN at.
        xin: Hertz,
    },
    /// A clock source did not report ready within the poll budget.
    #[error("{} did not lock within {polls} polls", .stage.name())]
    ClockLockTimeout {
        /// Which wait expired.
        stage: LockStage,
        /// Poll budget that was exhausted.
        polls: u32,
    },
}

/// Timebase configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimebaseError {
    /// The tick period cannot be expressed as a SysTick reload at this clock.
    #[error("{period_ms} ms tick is out of SysTick range at {clock}")]
    TickPeriodUnreachable {
        /// Committed system clock.
        clock: Hertz,
        /// Requested tick period.
        period_ms: u32,
    },
}
