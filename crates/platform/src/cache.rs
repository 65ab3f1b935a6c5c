//! Cache control seam.
//!
//! The boot sequence turns both L1 caches off before anything touches the
//! clock tree: cache and flash timing are a function of the core clock, and a
//! cache left enabled across a frequency change runs against stale timing.

/// Instruction and data cache control.
///
/// Both operations are infallible and idempotent. On a part without the
/// corresponding cache they are true no-ops.
pub trait CacheControl {
    /// Disable the instruction cache.
    ///
    /// Calling this while the cache is already disabled changes nothing.
    fn disable_instruction_cache(&mut self);

    /// Clean and disable the data cache.
    ///
    /// Calling this while the cache is already disabled changes nothing.
    fn disable_data_cache(&mut self);
}

impl<T: CacheControl + ?Sized> CacheControl for &mut T {
    fn disable_instruction_cache(&mut self) {
        T::disable_instruction_cache(self);
    }

    fn disable_data_cache(&mut self) {
        T::disable_data_cache(self);
    }
}
