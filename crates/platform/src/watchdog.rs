//! Watchdog control seam.

/// Hardware watchdog control.
///
/// The watchdog runs from reset with a timeout shorter than a worst-case
/// oscillator start-up, so it must be off before the clock tree is touched.
///
/// On SAMx7x the mode register is write-once after reset: the disable must be
/// the first write to it. Implementations read the current state first and
/// only write while the watchdog is still armed, which also makes the call
/// idempotent.
pub trait WatchdogControl {
    /// Disable the watchdog. Infallible, idempotent.
    fn disable_watchdog(&mut self);
}

impl<T: WatchdogControl + ?Sized> WatchdogControl for &mut T {
    fn disable_watchdog(&mut self) {
        T::disable_watchdog(self);
    }
}
