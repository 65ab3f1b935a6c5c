//! Terminal failure path.
//!
//! A boot error is fatal: nothing is retried or rolled back. The error is
//! logged once and the core parks in [`boot_failed`], so a debugger attached
//! after the fact finds the PC inside one well-known function.

use crate::boot::BootError;

/// Log `error` and stop forward progress forever.
#[inline(never)]
#[cfg_attr(
    not(any(feature = "defmt", feature = "simulator")),
    allow(unused_variables)
)]
pub fn boot_failed(error: BootError) -> ! {
    #[cfg(feature = "defmt")]
    defmt::error!("boot failed: {}", error);
    #[cfg(feature = "simulator")]
    tracing::error!(%error, "boot failed");
    loop {
        core::hint::spin_loop();
    }
}
