//! Dependency audit tests.
// Audit test file: expect/unwrap lints are intentional test mechanisms.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Real enforcement is via cargo-deny in CI. These tests verify the deny.toml
//! configuration exists and contains the required bans, and that the firmware
//! manifest keeps host-only crates out of the hardware image.
//!
//! Run with: cargo test -p coldboot --test dependency_audit

const DENY_TOML: &str = include_str!("../../../deny.toml");
const FIRMWARE_MANIFEST: &str = include_str!("../Cargo.toml");
const PLATFORM_MANIFEST: &str = include_str!("../../platform/Cargo.toml");

/// deny.toml bans allocator crates: the cold boot runs with no heap.
#[test]
fn deny_toml_bans_allocator_crates() {
    assert!(
        DENY_TOML.contains("embedded-alloc"),
        "deny.toml must ban embedded-alloc (no heap allocation, use heapless instead)"
    );
    assert!(
        DENY_TOML.contains("wee_alloc"),
        "deny.toml must ban wee_alloc (unmaintained + memory corruption RUSTSEC-2022-0054)"
    );
}

/// deny.toml bans getrandom (no OS entropy source on bare-metal SAMx7x).
#[test]
fn deny_toml_bans_random_number_generator() {
    assert!(
        DENY_TOML.contains("getrandom"),
        "deny.toml must ban getrandom (no OS entropy on bare metal thumbv7em-none-eabihf)"
    );
}

/// deny.toml denies multiple versions of the same crate.
///
/// Two embedded-hal versions in one graph would give the timebase a `DelayNs`
/// that drivers compiled against the other version cannot use.
#[test]
fn deny_toml_multiple_versions_is_deny() {
    assert!(
        DENY_TOML.contains("multiple-versions = \"deny\""),
        "deny.toml must deny multiple versions of the same crate to prevent \
         embedded-hal version conflicts between drivers"
    );
}

/// The simulator's tracing stack is optional and gated behind `simulator`.
#[test]
fn tracing_is_host_only() {
    for line in FIRMWARE_MANIFEST
        .lines()
        .filter(|l| l.starts_with("tracing"))
    {
        assert!(
            line.contains("optional = true"),
            "tracing crates must be optional: {line}"
        );
    }
    let hardware = FIRMWARE_MANIFEST
        .split("hardware = [")
        .nth(1)
        .and_then(|rest| rest.split(']').next())
        .expect("hardware feature must exist");
    assert!(
        !hardware.contains("tracing"),
        "hardware feature must not pull tracing"
    );
}

/// The hardware feature carries the whole embedded runtime.
#[test]
fn hardware_feature_enables_runtime_and_logging() {
    let hardware = FIRMWARE_MANIFEST
        .split("hardware = [")
        .nth(1)
        .and_then(|rest| rest.split(']').next())
        .expect("hardware feature must exist");
    for dep in ["cortex-m-rt", "defmt-rtt", "panic-probe", "boot-hal/defmt"] {
        assert!(
            hardware.contains(dep),
            "hardware feature must enable {dep}"
        );
    }
}

/// Versionless path dependencies pass `wildcards = "deny"` only when the
/// wildcard-path exemption is on and every workspace crate is unpublishable.
#[test]
fn path_dependencies_pass_the_wildcard_ban() {
    assert!(
        DENY_TOML.contains("wildcards = \"deny\""),
        "deny.toml must keep wildcard version requirements banned"
    );
    assert!(
        DENY_TOML.contains("allow-wildcard-paths = true"),
        "deny.toml must exempt path dependencies from the wildcard ban"
    );
    for (name, manifest) in [("coldboot", FIRMWARE_MANIFEST), ("boot-hal", PLATFORM_MANIFEST)] {
        assert!(
            manifest.lines().any(|l| l.trim() == "publish = false"),
            "{name} must set publish = false for the wildcard-path exemption to apply"
        );
    }
}

/// Turning on `defmt` alone must also give boot-hal its defmt derives,
/// otherwise the firmware logs boot-hal types that have no `Format` impl.
#[test]
fn defmt_feature_propagates_to_boot_hal() {
    let defmt = FIRMWARE_MANIFEST
        .lines()
        .find(|l| l.starts_with("defmt = ["))
        .expect("firmware must declare an explicit defmt feature");
    assert!(defmt.contains("\"dep:defmt\""), "defmt feature must enable the crate: {defmt}");
    assert!(
        defmt.contains("\"boot-hal/defmt\""),
        "defmt feature must enable boot-hal/defmt: {defmt}"
    );
}
