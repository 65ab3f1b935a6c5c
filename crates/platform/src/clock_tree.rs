//! Clock tree manager.
//!
//! Brings the main oscillator up, optionally locks the USB PLL, then switches
//! the master clock over in one step. The manager is a chain of owned stages:
//!
//! ```text
//! ClockTreeManager --configure_main_clock()--> PendingClockTree
//!                                                 |  enable_usb_clock(reference) (optional, idempotent)
//!                                                 v
//!                                            commit_clock_tree()
//!                                                 |
//!                                                 v
//!                                           CommittedClock --system_clock()--> SystemClock
//! ```
//!
//! Until `commit_clock_tree()` returns, every consumer keeps running from the
//! reset-default MAINCK (internal RC at 12 MHz). [`SystemClock`] has no public
//! constructor: holding one proves a commit happened, which is what the
//! timebase requires.
//!
//! Every hardware wait is bounded by a [`LockTimeout`] poll budget. A source
//! that never reports ready yields [`ClockError::ClockLockTimeout`] naming the
//! stage instead of hanging the boot.

use crate::clock_config::{
    ClockConfiguration, FlashWaitStates, Hertz, MainOscillator, UsbReference,
};
use crate::error::{ClockError, LockStage};

// ── Hardware seam ────────────────────────────────────────────────────────────

/// Register-level clock operations the manager sequences.
///
/// Each method is one register write or one status read. Ordering, waiting and
/// validation live in the manager; implementations stay dumb.
pub trait ClockControl {
    /// Enable `oscillator` without selecting it as MAINCK.
    fn start_main_oscillator(&mut self, oscillator: MainOscillator);

    /// `true` once the oscillator started by `start_main_oscillator` is stable.
    fn main_oscillator_stable(&mut self) -> bool;

    /// Program the UTMI reference and enable the USB PLL.
    fn start_usb_pll(&mut self, reference: UsbReference);

    /// `true` once the USB PLL reports lock.
    fn usb_pll_locked(&mut self) -> bool;

    /// Flash wait states currently programmed.
    fn flash_wait_states(&mut self) -> FlashWaitStates;

    /// Program the flash wait states.
    fn set_flash_wait_states(&mut self, wait_states: FlashWaitStates);

    /// Switch MAINCK to `oscillator`.
    fn select_main_oscillator(&mut self, oscillator: MainOscillator);

    /// `true` once the MAINCK switch has completed.
    fn main_oscillator_selected(&mut self) -> bool;

    /// Select MAINCK as the master clock source.
    fn select_master_clock_main(&mut self);

    /// Set the master clock prescaler and divider to 1.
    fn set_master_clock_prescaler_div1(&mut self);

    /// `true` once the last master clock change has taken effect.
    fn master_clock_ready(&mut self) -> bool;

    /// Route the locked USB PLL to the USB clock (48 MHz full-speed).
    fn route_usb_clock(&mut self);
}

impl<T: ClockControl + ?Sized> ClockControl for &mut T {
    fn start_main_oscillator(&mut self, oscillator: MainOscillator) {
        T::start_main_oscillator(self, oscillator);
    }

    fn main_oscillator_stable(&mut self) -> bool {
        T::main_oscillator_stable(self)
    }

    fn start_usb_pll(&mut self, reference: UsbReference) {
        T::start_usb_pll(self, reference);
    }

    fn usb_pll_locked(&mut self) -> bool {
        T::usb_pll_locked(self)
    }

    fn flash_wait_states(&mut self) -> FlashWaitStates {
        T::flash_wait_states(self)
    }

    fn set_flash_wait_states(&mut self, wait_states: FlashWaitStates) {
        T::set_flash_wait_states(self, wait_states);
    }

    fn select_main_oscillator(&mut self, oscillator: MainOscillator) {
        T::select_main_oscillator(self, oscillator);
    }

    fn main_oscillator_selected(&mut self) -> bool {
        T::main_oscillator_selected(self)
    }

    fn select_master_clock_main(&mut self) {
        T::select_master_clock_main(self);
    }

    fn set_master_clock_prescaler_div1(&mut self) {
        T::set_master_clock_prescaler_div1(self);
    }

    fn master_clock_ready(&mut self) -> bool {
        T::master_clock_ready(self)
    }

    fn route_usb_clock(&mut self) {
        T::route_usb_clock(self);
    }
}

// ── Lock timeout ─────────────────────────────────────────────────────────────

/// Poll budget for every clock wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockTimeout(u32);

impl LockTimeout {
    /// One million polls: several hundred ms at the 12 MHz reset clock, well
    /// above the worst-case crystal start-up.
    pub const DEFAULT: Self = Self(1_000_000);

    /// Budget of `polls` status reads. A budget of zero is raised to one.
    #[must_use]
    pub const fn polls(polls: u32) -> Self {
        if polls == 0 {
            Self(1)
        } else {
            Self(polls)
        }
    }

    /// Number of status reads allowed per wait.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for LockTimeout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn wait_until<K, F>(
    control: &mut K,
    timeout: LockTimeout,
    stage: LockStage,
    mut ready: F,
) -> Result<(), ClockError>
where
    F: FnMut(&mut K) -> bool,
{
    for _ in 0..timeout.get() {
        if ready(control) {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(ClockError::ClockLockTimeout {
        stage,
        polls: timeout.get(),
    })
}

// ── Stages ───────────────────────────────────────────────────────────────────

/// Entry point: owns the clock hardware, nothing configured yet.
pub struct ClockTreeManager<K> {
    control: K,
    timeout: LockTimeout,
}

impl<K: ClockControl> ClockTreeManager<K> {
    /// Take ownership of the clock hardware.
    pub fn new(control: K, timeout: LockTimeout) -> Self {
        Self { control, timeout }
    }

    /// Validate the requested main clock, start its oscillator and wait for it
    /// to stabilise.
    ///
    /// Validation happens before any register write: an unsupported request
    /// leaves the hardware untouched. The new oscillator runs but nothing
    /// consumes it until [`PendingClockTree::commit_clock_tree`].
    ///
    /// # Errors
    ///
    /// - [`ClockError::UnsupportedCrystalFlag`], [`ClockError::UnsupportedFrequency`]
    ///   from validation
    /// - [`ClockError::ClockLockTimeout`] with [`LockStage::MainOscillator`]
    pub fn configure_main_clock(
        mut self,
        frequency: Hertz,
        crystal_flag: u32,
    ) -> Result<PendingClockTree<K>, ClockError> {
        let config = ClockConfiguration::new(frequency, crystal_flag)?;
        self.control.start_main_oscillator(config.main);
        wait_until(
            &mut self.control,
            self.timeout,
            LockStage::MainOscillator,
            K::main_oscillator_stable,
        )?;
        Ok(PendingClockTree {
            control: self.control,
            timeout: self.timeout,
            config,
        })
    }
}

/// Main oscillator running and stable; the tree is not yet in use.
pub struct PendingClockTree<K> {
    control: K,
    timeout: LockTimeout,
    config: ClockConfiguration,
}

impl<K: ClockControl> PendingClockTree<K> {
    /// The configuration that `commit_clock_tree` will apply.
    pub fn configuration(&self) -> &ClockConfiguration {
        &self.config
    }

    /// Start the USB PLL from the `reference` on XIN and wait for lock.
    ///
    /// The USB domain does not depend on which oscillator MAINCK selects: an
    /// internal-RC main clock can run next to a 12 MHz crystal feeding the
    /// UPLL. An external main oscillator already fixes XIN, though, so the
    /// reference must then match it.
    ///
    /// A second call with the reference already locked does nothing.
    ///
    /// # Errors
    ///
    /// - [`ClockError::UsbReferenceUnsupported`] unless `reference` is 12 or
    ///   16 MHz
    /// - [`ClockError::UsbReferenceConflict`] if XIN already runs at another
    ///   frequency
    /// - [`ClockError::ClockLockTimeout`] with [`LockStage::UsbPll`]
    pub fn enable_usb_clock(mut self, reference: Hertz) -> Result<Self, ClockError> {
        let usb = UsbReference::from_hertz(reference)?;
        if let Some(xin) = self.xin_frequency().filter(|&xin| xin != reference) {
            return Err(ClockError::UsbReferenceConflict { reference, xin });
        }
        if self.config.usb == Some(usb) {
            return Ok(self);
        }
        self.control.start_usb_pll(usb);
        wait_until(
            &mut self.control,
            self.timeout,
            LockStage::UsbPll,
            K::usb_pll_locked,
        )?;
        self.config.usb = Some(usb);
        Ok(self)
    }

    /// Frequency XIN is already committed to, if any.
    fn xin_frequency(&self) -> Option<Hertz> {
        match self.config.main {
            MainOscillator::Crystal(f) | MainOscillator::Bypass(f) => Some(f),
            MainOscillator::InternalRc(_) => self.config.usb.map(UsbReference::frequency),
        }
    }

    /// Switch the master clock to the pending tree.
    ///
    /// Flash is programmed with the larger of the current and target wait
    /// states before the switch and with the target value after it, so flash
    /// is never read with too few wait states at any frequency in between.
    ///
    /// # Errors
    ///
    /// [`ClockError::ClockLockTimeout`] with [`LockStage::MainSelect`] or
    /// [`LockStage::MasterClock`].
    pub fn commit_clock_tree(mut self) -> Result<CommittedClock<K>, ClockError> {
        let target = self.config.flash_wait_states;
        let current = self.control.flash_wait_states();
        self.control.set_flash_wait_states(current.max(target));

        self.control.select_main_oscillator(self.config.main);
        wait_until(
            &mut self.control,
            self.timeout,
            LockStage::MainSelect,
            K::main_oscillator_selected,
        )?;

        self.control.select_master_clock_main();
        wait_until(
            &mut self.control,
            self.timeout,
            LockStage::MasterClock,
            K::master_clock_ready,
        )?;

        self.control.set_master_clock_prescaler_div1();
        wait_until(
            &mut self.control,
            self.timeout,
            LockStage::MasterClock,
            K::master_clock_ready,
        )?;

        if target != current.max(target) {
            self.control.set_flash_wait_states(target);
        }

        if self.config.usb_clock_enabled() {
            self.control.route_usb_clock();
        }

        Ok(CommittedClock {
            control: self.control,
            config: self.config,
        })
    }
}

/// The clock tree is live. Never mutated again for the rest of the boot.
pub struct CommittedClock<K> {
    control: K,
    config: ClockConfiguration,
}

impl<K> CommittedClock<K> {
    /// Committed system (master) clock frequency.
    pub fn frequency(&self) -> Hertz {
        self.config.system_clock()
    }

    /// The committed configuration.
    pub fn configuration(&self) -> &ClockConfiguration {
        &self.config
    }

    /// Proof of commit, consumed by the timebase.
    pub fn system_clock(&self) -> SystemClock {
        SystemClock {
            frequency: self.config.system_clock(),
        }
    }

    /// Give the clock hardware back.
    pub fn release(self) -> K {
        self.control
    }
}

/// Frequency of a committed clock tree.
///
/// Only [`CommittedClock::system_clock`] creates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemClock {
    frequency: Hertz,
}

impl SystemClock {
    /// System clock frequency.
    pub const fn frequency(self) -> Hertz {
        self.frequency
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
