//! Clock configuration for the SAMx7x (SAM S70 / E70 / V7x) clock tree.
//!
//! Pure data and pure math: validates the requested main-oscillator setup,
//! derives flash wait states and the USB PLL reference. Nothing here touches
//! hardware, so every rule is host-testable.
//!
//! # Main oscillator sources
//!
//! The boot configuration carries a raw `crystal_flag` word. It selects which
//! MAINCK source the requested frequency must come from:
//!
//! | Flag | Source                               | Supported frequencies |
//! |------|--------------------------------------|-----------------------|
//! | 0    | Internal RC (default, no crystal)    | 4, 8, 12 MHz          |
//! | 1    | External crystal oscillator          | 3–20 MHz              |
//! | 2    | External clock on XIN (bypass mode)  | 1–50 MHz              |
//!
//! A frequency the selected source cannot produce is rejected. It is never
//! rounded to the nearest supported value: the SysTick reload and every
//! downstream delay are computed from the requested number.
//!
//! # Sources
//!
//! - SAM E70/S70/V70/V71 datasheet §31 (PMC), "Main Clock" and
//!   "Recommended Programming Sequence"
//! - SAM E70/S70 datasheet §22 (EEFC), Table "Flash Wait States and Operating
//!   Frequency" (VDDIO 3.0 V)
//! - SAM E70/S70 datasheet §39 (UTMI), UTMI PLL reference of 12 or 16 MHz

use crate::error::ClockError;

// ── Hertz ────────────────────────────────────────────────────────────────────

/// A frequency in hertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Hertz(pub u32);

impl Hertz {
    /// `hz` hertz.
    #[must_use]
    pub const fn hz(hz: u32) -> Self {
        Self(hz)
    }

    /// `khz` kilohertz. Saturates at `u32::MAX` Hz.
    #[must_use]
    pub const fn khz(khz: u32) -> Self {
        Self(khz.saturating_mul(1_000))
    }

    /// `mhz` megahertz. Saturates at `u32::MAX` Hz.
    #[must_use]
    pub const fn mhz(mhz: u32) -> Self {
        Self(mhz.saturating_mul(1_000_000))
    }

    /// Raw value in hertz.
    #[must_use]
    pub const fn to_hz(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for Hertz {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

// ── Silicon limits ───────────────────────────────────────────────────────────

/// Frequencies the internal RC oscillator is factory-trimmed for.
///
/// Indexed by the `MOSCRCF` field of `CKGR_MOR`.
pub const RC_FREQUENCIES: [Hertz; 3] = [Hertz::mhz(4), Hertz::mhz(8), Hertz::mhz(12)];

/// Lowest crystal the main crystal oscillator can drive.
pub const CRYSTAL_MIN: Hertz = Hertz::mhz(3);
/// Highest crystal the main crystal oscillator can drive.
pub const CRYSTAL_MAX: Hertz = Hertz::mhz(20);

/// Lowest external clock accepted on XIN in bypass mode.
pub const BYPASS_MIN: Hertz = Hertz::mhz(1);
/// Highest external clock accepted on XIN in bypass mode.
pub const BYPASS_MAX: Hertz = Hertz::mhz(50);

/// MAINCK after reset: the internal RC oscillator at 12 MHz.
pub const RESET_MAIN_CLOCK: Hertz = Hertz::mhz(12);

/// Each flash wait state covers this much additional core frequency.
pub const FLASH_WAIT_STATE_STEP: Hertz = Hertz::mhz(23);

/// Maximum flash wait states (FWS field); also enough for the 150 MHz MCK limit.
pub const MAX_FLASH_WAIT_STATES: u8 = 6;

// ── Oscillator source ────────────────────────────────────────────────────────

/// Index into [`RC_FREQUENCIES`]; the `MOSCRCF` field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RcFrequency {
    /// 4 MHz (`MOSCRCF = 0`).
    Mhz4,
    /// 8 MHz (`MOSCRCF = 1`).
    Mhz8,
    /// 12 MHz (`MOSCRCF = 2`), the reset value.
    Mhz12,
}

impl RcFrequency {
    /// Value of the `MOSCRCF` field.
    #[must_use]
    pub const fn field(self) -> u32 {
        match self {
            Self::Mhz4 => 0,
            Self::Mhz8 => 1,
            Self::Mhz12 => 2,
        }
    }

    fn from_hertz(frequency: Hertz) -> Option<Self> {
        match frequency.to_hz() {
            4_000_000 => Some(Self::Mhz4),
            8_000_000 => Some(Self::Mhz8),
            12_000_000 => Some(Self::Mhz12),
            _ => None,
        }
    }
}

/// Which oscillator feeds MAINCK, decoded from the crystal flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OscillatorSource {
    /// Internal RC oscillator (flag 0, the default; crystal unused).
    InternalRc,
    /// External crystal between XIN and XOUT (flag 1).
    Crystal,
    /// External clock driven onto XIN, crystal amplifier bypassed (flag 2).
    Bypass,
}

impl OscillatorSource {
    /// Short name for log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InternalRc => "internal RC",
            Self::Crystal => "crystal",
            Self::Bypass => "bypass",
        }
    }
}

impl TryFrom<u32> for OscillatorSource {
    type Error = ClockError;

    fn try_from(flag: u32) -> Result<Self, Self::Error> {
        match flag {
            0 => Ok(Self::InternalRc),
            1 => Ok(Self::Crystal),
            2 => Ok(Self::Bypass),
            other => Err(ClockError::UnsupportedCrystalFlag { flag: other }),
        }
    }
}

/// A validated main-oscillator selection, ready to be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MainOscillator {
    /// Internal RC oscillator at one of its trimmed frequencies.
    InternalRc(RcFrequency),
    /// External crystal of the given frequency.
    Crystal(Hertz),
    /// External clock of the given frequency on XIN.
    Bypass(Hertz),
}

impl MainOscillator {
    /// Validate `frequency` against the source chosen by `crystal_flag`.
    ///
    /// # Errors
    ///
    /// - [`ClockError::UnsupportedCrystalFlag`] for a flag other than 0, 1, 2
    /// - [`ClockError::UnsupportedFrequency`] if the source cannot produce
    ///   `frequency` exactly
    pub fn select(frequency: Hertz, crystal_flag: u32) -> Result<Self, ClockError> {
        let source = OscillatorSource::try_from(crystal_flag)?;
        let unsupported = ClockError::UnsupportedFrequency {
            requested: frequency,
            oscillator: source,
        };
        match source {
            OscillatorSource::InternalRc => RcFrequency::from_hertz(frequency)
                .map(Self::InternalRc)
                .ok_or(unsupported),
            OscillatorSource::Crystal if (CRYSTAL_MIN..=CRYSTAL_MAX).contains(&frequency) => {
                Ok(Self::Crystal(frequency))
            }
            OscillatorSource::Bypass if (BYPASS_MIN..=BYPASS_MAX).contains(&frequency) => {
                Ok(Self::Bypass(frequency))
            }
            OscillatorSource::Crystal | OscillatorSource::Bypass => Err(unsupported),
        }
    }

    /// Output frequency of this oscillator.
    #[must_use]
    pub const fn frequency(self) -> Hertz {
        match self {
            Self::InternalRc(RcFrequency::Mhz4) => Hertz::mhz(4),
            Self::InternalRc(RcFrequency::Mhz8) => Hertz::mhz(8),
            Self::InternalRc(RcFrequency::Mhz12) => Hertz::mhz(12),
            Self::Crystal(hz) | Self::Bypass(hz) => hz,
        }
    }

    /// Source kind.
    #[must_use]
    pub const fn source(self) -> OscillatorSource {
        match self {
            Self::InternalRc(_) => OscillatorSource::InternalRc,
            Self::Crystal(_) => OscillatorSource::Crystal,
            Self::Bypass(_) => OscillatorSource::Bypass,
        }
    }
}

// ── Flash wait states ────────────────────────────────────────────────────────

/// Number of flash wait states programmed into `EEFC_FMR.FWS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct FlashWaitStates(u8);

impl FlashWaitStates {
    /// Wait states required to fetch from flash at `core_clock`.
    ///
    /// One wait state per started 23 MHz above the first 23 MHz, capped at
    /// [`MAX_FLASH_WAIT_STATES`].
    #[must_use]
    pub fn for_frequency(core_clock: Hertz) -> Self {
        let extra = core_clock
            .to_hz()
            .saturating_sub(1)
            .checked_div(FLASH_WAIT_STATE_STEP.to_hz())
            .unwrap_or(0);
        let ws = u8::try_from(extra).unwrap_or(MAX_FLASH_WAIT_STATES);
        Self(ws.min(MAX_FLASH_WAIT_STATES))
    }

    /// From a raw FWS field value, e.g. read back from `EEFC_FMR`.
    ///
    /// Values above [`MAX_FLASH_WAIT_STATES`] are capped.
    #[must_use]
    pub const fn from_field(fws: u8) -> Self {
        if fws > MAX_FLASH_WAIT_STATES {
            Self(MAX_FLASH_WAIT_STATES)
        } else {
            Self(fws)
        }
    }

    /// Raw FWS field value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

// ── USB reference ────────────────────────────────────────────────────────────

/// Reference frequency fed to the UTMI PLL (`UTMI_CKTRIM.FREQ`).
///
/// The UPLL always takes its reference from the XIN input, whichever
/// oscillator MAINCK selects. A board running its core from the internal RC
/// still needs a 12 or 16 MHz crystal (or external clock) on XIN for USB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbReference {
    /// 12 MHz on XIN.
    Mhz12,
    /// 16 MHz on XIN.
    Mhz16,
}

impl UsbReference {
    /// USB PLL reference for the frequency present on XIN.
    ///
    /// # Errors
    ///
    /// [`ClockError::UsbReferenceUnsupported`] unless `reference` is exactly
    /// 12 MHz or 16 MHz.
    pub fn from_hertz(reference: Hertz) -> Result<Self, ClockError> {
        match reference.to_hz() {
            12_000_000 => Ok(Self::Mhz12),
            16_000_000 => Ok(Self::Mhz16),
            _ => Err(ClockError::UsbReferenceUnsupported { reference }),
        }
    }

    /// Reference frequency.
    #[must_use]
    pub const fn frequency(self) -> Hertz {
        match self {
            Self::Mhz12 => Hertz::mhz(12),
            Self::Mhz16 => Hertz::mhz(16),
        }
    }

    /// Value of the `UTMI_CKTRIM.FREQ` field.
    #[must_use]
    pub const fn field(self) -> u32 {
        match self {
            Self::Mhz12 => 0,
            Self::Mhz16 => 1,
        }
    }
}

/// UPLL output, fixed by the UTMI macrocell.
pub const UPLL_FREQUENCY: Hertz = Hertz::mhz(480);

/// `PMC_USB.USBDIV` value giving the 48 MHz full-speed clock (480 / (9 + 1)).
pub const USB_FS_DIVIDER: u32 = 9;

// ── Clock configuration ──────────────────────────────────────────────────────

/// The complete clock tree this boot will commit.
///
/// Built up by the clock tree manager and applied as one unit; never mutated
/// after commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfiguration {
    /// Main oscillator feeding MAINCK (and MCK after commit).
    pub main: MainOscillator,
    /// The raw crystal flag the main oscillator was selected with.
    pub crystal_flag: u32,
    /// USB PLL reference on XIN, if the USB clock domain was enabled.
    pub usb: Option<UsbReference>,
    /// Flash wait states for the committed core frequency.
    pub flash_wait_states: FlashWaitStates,
}

impl ClockConfiguration {
    /// Configuration with only the main clock selected.
    ///
    /// # Errors
    ///
    /// See [`MainOscillator::select`].
    pub fn new(frequency: Hertz, crystal_flag: u32) -> Result<Self, ClockError> {
        let main = MainOscillator::select(frequency, crystal_flag)?;
        Ok(Self {
            main,
            crystal_flag,
            usb: None,
            flash_wait_states: FlashWaitStates::for_frequency(main.frequency()),
        })
    }

    /// System clock frequency once this configuration is committed.
    #[must_use]
    pub const fn system_clock(&self) -> Hertz {
        self.main.frequency()
    }

    /// `true` once the USB clock domain has been configured.
    #[must_use]
    pub const fn usb_clock_enabled(&self) -> bool {
        self.usb.is_some()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_flag_selects_internal_rc_at_12mhz() {
        let osc = MainOscillator::select(Hertz::mhz(12), 0).unwrap();
        assert_eq!(osc, MainOscillator::InternalRc(RcFrequency::Mhz12));
        assert_eq!(osc.frequency(), Hertz::hz(12_000_000));
        assert_eq!(osc.source(), OscillatorSource::InternalRc);
    }

    #[test]
    fn internal_rc_rejects_untrimmed_frequency() {
        let err = MainOscillator::select(Hertz::mhz(10), 0).unwrap_err();
        assert_eq!(
            err,
            ClockError::UnsupportedFrequency {
                requested: Hertz::mhz(10),
                oscillator: OscillatorSource::InternalRc,
            }
        );
    }

    #[test]
    fn internal_rc_does_not_round_to_nearest() {
        // 11.999 MHz is closest to 12 MHz but must still be refused
        assert!(MainOscillator::select(Hertz::hz(11_999_000), 0).is_err());
    }

    #[test]
    fn crystal_range_is_inclusive() {
        assert!(MainOscillator::select(CRYSTAL_MIN, 1).is_ok());
        assert!(MainOscillator::select(CRYSTAL_MAX, 1).is_ok());
        assert!(MainOscillator::select(Hertz::hz(2_999_999), 1).is_err());
        assert!(MainOscillator::select(Hertz::hz(20_000_001), 1).is_err());
    }

    #[test]
    fn bypass_accepts_up_to_50mhz() {
        let osc = MainOscillator::select(Hertz::mhz(50), 2).unwrap();
        assert_eq!(osc, MainOscillator::Bypass(Hertz::mhz(50)));
        assert!(MainOscillator::select(Hertz::mhz(51), 2).is_err());
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = MainOscillator::select(Hertz::mhz(12), 7).unwrap_err();
        assert_eq!(err, ClockError::UnsupportedCrystalFlag { flag: 7 });
    }

    #[test]
    fn zero_frequency_is_rejected_for_every_source() {
        for flag in 0..=2 {
            assert!(
                MainOscillator::select(Hertz::hz(0), flag).is_err(),
                "flag {flag} must reject 0 Hz"
            );
        }
    }

    #[test]
    fn flash_wait_states_follow_23mhz_steps() {
        assert_eq!(FlashWaitStates::for_frequency(Hertz::mhz(12)).get(), 0);
        assert_eq!(FlashWaitStates::for_frequency(Hertz::mhz(23)).get(), 0);
        assert_eq!(FlashWaitStates::for_frequency(Hertz::hz(23_000_001)).get(), 1);
        assert_eq!(FlashWaitStates::for_frequency(Hertz::mhz(46)).get(), 1);
        assert_eq!(FlashWaitStates::for_frequency(Hertz::mhz(150)).get(), 6);
    }

    #[test]
    fn flash_wait_states_are_capped() {
        assert_eq!(
            FlashWaitStates::for_frequency(Hertz(u32::MAX)).get(),
            MAX_FLASH_WAIT_STATES
        );
    }

    #[test]
    fn usb_reference_needs_12_or_16mhz() {
        assert_eq!(
            UsbReference::from_hertz(Hertz::mhz(12)).unwrap(),
            UsbReference::Mhz12
        );
        assert_eq!(
            UsbReference::from_hertz(Hertz::mhz(16)).unwrap(),
            UsbReference::Mhz16
        );
        assert_eq!(UsbReference::Mhz16.frequency(), Hertz::mhz(16));
        assert_eq!(
            UsbReference::from_hertz(Hertz::mhz(8)).unwrap_err(),
            ClockError::UsbReferenceUnsupported {
                reference: Hertz::mhz(8)
            }
        );
    }

    #[test]
    fn usb_fs_divider_yields_48mhz() {
        let fs = UPLL_FREQUENCY.to_hz() / (USB_FS_DIVIDER + 1);
        assert_eq!(fs, 48_000_000);
    }

    #[test]
    fn configuration_starts_without_usb() {
        let cfg = ClockConfiguration::new(Hertz::mhz(12), 0).unwrap();
        assert!(!cfg.usb_clock_enabled());
        assert_eq!(cfg.system_clock(), Hertz::mhz(12));
        assert_eq!(cfg.crystal_flag, 0);
        assert_eq!(cfg.flash_wait_states.get(), 0);
    }

    #[test]
    fn hertz_display_has_unit() {
        assert_eq!(std::format!("{}", Hertz::mhz(12)), "12000000 Hz");
    }
}
