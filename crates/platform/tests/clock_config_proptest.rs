//! Property-based tests for clock selection.
//! A requested frequency is either produced exactly or refused; it is never
//! rounded to a neighbouring supported value.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]

use boot_hal::clock_config::{
    BYPASS_MAX, BYPASS_MIN, CRYSTAL_MAX, CRYSTAL_MIN, FLASH_WAIT_STATE_STEP,
    MAX_FLASH_WAIT_STATES, RC_FREQUENCIES,
};
use boot_hal::{ClockConfiguration, ClockError, FlashWaitStates, Hertz, MainOscillator};

proptest::proptest! {
    /// Whatever is accepted runs at exactly the requested frequency.
    #[test]
    fn accepted_frequency_is_exact(hz in 0u32..=60_000_000u32, flag in 0u32..=2u32) {
        if let Ok(osc) = MainOscillator::select(Hertz::hz(hz), flag) {
            assert_eq!(osc.frequency(), Hertz::hz(hz));
        }
    }

    /// Acceptance matches the documented source ranges.
    #[test]
    fn acceptance_matches_source_limits(hz in 0u32..=60_000_000u32, flag in 0u32..=2u32) {
        let f = Hertz::hz(hz);
        let supported = match flag {
            0 => RC_FREQUENCIES.contains(&f),
            1 => (CRYSTAL_MIN..=CRYSTAL_MAX).contains(&f),
            _ => (BYPASS_MIN..=BYPASS_MAX).contains(&f),
        };
        let result = MainOscillator::select(f, flag);
        assert_eq!(result.is_ok(), supported, "{hz} Hz with flag {flag}");
        if let Err(err) = result {
            assert!(
                matches!(err, ClockError::UnsupportedFrequency { requested, .. } if requested == f),
                "wrong error for {hz} Hz: {err}"
            );
        }
    }

    /// Unknown flags fail before the frequency is looked at.
    #[test]
    fn unknown_flags_are_rejected(hz in 0u32..=u32::MAX, flag in 3u32..=u32::MAX) {
        assert_eq!(
            MainOscillator::select(Hertz::hz(hz), flag),
            Err(ClockError::UnsupportedCrystalFlag { flag })
        );
    }

    /// Wait states never decrease with frequency and always cover it.
    #[test]
    fn wait_states_are_monotone_and_sufficient(a in 1u32..=150_000_000u32, b in 1u32..=150_000_000u32) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let ws_lo = FlashWaitStates::for_frequency(Hertz::hz(lo));
        let ws_hi = FlashWaitStates::for_frequency(Hertz::hz(hi));
        assert!(ws_lo <= ws_hi);
        assert!(ws_hi.get() <= MAX_FLASH_WAIT_STATES);
        let covered = u64::from(ws_hi.get() + 1) * u64::from(FLASH_WAIT_STATE_STEP.to_hz());
        assert!(covered >= u64::from(hi), "{} WS too few for {hi} Hz", ws_hi.get());
    }

    /// A configuration carries the wait states for its own frequency.
    #[test]
    fn configuration_is_self_consistent(mhz in 3u32..=20u32) {
        let cfg = ClockConfiguration::new(Hertz::mhz(mhz), 1).unwrap();
        assert_eq!(cfg.main, MainOscillator::Crystal(Hertz::mhz(mhz)));
        assert_eq!(cfg.flash_wait_states, FlashWaitStates::for_frequency(Hertz::mhz(mhz)));
        assert!(!cfg.usb_clock_enabled());
    }
}
