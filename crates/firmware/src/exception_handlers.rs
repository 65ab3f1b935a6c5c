//! Cortex-M exception handlers for the cold-boot firmware.
//!
//! - **HardFault**: raised by bus faults on an unmapped register address,
//!   illegal instructions, or an escalated fault while caches or clocks are
//!   half-configured.
//!
//! # Hardware-only handler
//!
//! The `#[cortex_m_rt::exception]` attribute requires ARM target intrinsics and
//! is therefore gated behind `#[cfg(feature = "hardware")]`. The module itself
//! (and `HARDFAULT_DEFINED`) compiles unconditionally so host tests can verify
//! the module exists without needing an ARM toolchain.

#![allow(clippy::doc_markdown)] // Exception handler docs use hardware terminology (HardFault) as plain text

/// Marker constant: `true` once this module compiled, proving the HardFault
/// handler below is linked into hardware builds.
pub const HARDFAULT_DEFINED: bool = true;

/// HardFault exception handler (hardware target only).
///
/// Reports the stacked exception frame over defmt/RTT, then halts through
/// panic-probe. Returning from a HardFault handler is undefined behavior on
/// Cortex-M; the `-> !` return type enforces that it never does.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::panic!(
        "HardFault at pc=0x{:08X} lr=0x{:08X} xpsr=0x{:08X}",
        ef.pc(),
        ef.lr(),
        ef.xpsr()
    );
}
