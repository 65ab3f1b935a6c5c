//! Architecture boundary tests. Run with `cargo test -p coldboot --test arch_boundaries`
// Architecture test file: expect/panic and constant assertions are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::assertions_on_constants
)]
//!
//! These tests keep the two-crate layering intact:
//!   Rule 1: boot-hal (register seams, clock math) must not depend on coldboot
//!   Rule 2: coldboot must always carry its HardFault handler module
//!   Rule 3: the host simulator stays a cargo example of the firmware crate
//!
//! Most of this is enforced by the dependency graph itself. The tests here
//! fail loudly when a manifest edit or a moved file breaks a rule that the
//! compiler would otherwise let through.

const FIRMWARE_MANIFEST: &str = include_str!("../Cargo.toml");
const PLATFORM_MANIFEST: &str = include_str!("../../platform/Cargo.toml");
const BOOT_SIMULATOR: &str = include_str!("../examples/boot_simulator.rs");

/// Verify that boot-hal exposes its register seams without any firmware types.
///
/// If `boot-hal` depended on `coldboot`, this test binary would fail to link
/// (cycle: coldboot -> boot-hal -> coldboot).
#[test]
fn boot_hal_is_independent() {
    fn _assert_cache_seam<T: boot_hal::CacheControl>() {}
    fn _assert_watchdog_seam<T: boot_hal::WatchdogControl>() {}
    fn _assert_clock_seam<T: boot_hal::ClockControl>() {}
    fn _assert_tick_seam<T: boot_hal::TickSource>() {}

    assert!(
        !PLATFORM_MANIFEST.contains("coldboot"),
        "boot-hal must not depend on the firmware crate"
    );
}

/// Verify that the HardFault handler module is present.
///
/// Without a HardFault handler, a bus fault on a mistyped register address
/// during the boot produces undefined behaviour instead of a diagnostic halt.
/// The `#[cortex_m_rt::exception]` handler is `#[cfg(feature = "hardware")]`
/// because it needs ARM intrinsics, but the module must always be present.
#[test]
fn hardfault_handler_module_exists() {
    // HARDFAULT_DEFINED is a compile-time marker: it exists only when the
    // exception_handlers module compiled into the firmware crate.
    assert!(
        coldboot::exception_handlers::HARDFAULT_DEFINED,
        "coldboot::exception_handlers::HARDFAULT_DEFINED must be true; \
         the exception_handlers module with the HardFault handler must exist"
    );
}

/// Verify that the simulator builds as `cargo run --example boot_simulator`.
///
/// The include_str! above already fails compilation if the file leaves
/// `examples/`; the manifest must point cargo at the same place.
#[test]
fn boot_simulator_is_a_firmware_example() {
    assert!(
        FIRMWARE_MANIFEST.contains("path = \"examples/boot_simulator.rs\""),
        "the boot_simulator target must live under crates/firmware/examples"
    );
    assert!(
        BOOT_SIMULATOR.contains("SimulatedMcu"),
        "boot_simulator must boot the simulated MCU"
    );
}
