//! Cold-boot firmware for SAM S70/E70 (Cortex-M7) boards.
//!
//! Brings the chip from reset-vector entry to a steady-state loop:
//! caches off, watchdog off, clock tree configured and committed, SysTick
//! timebase running, then `delay / hook / delay` forever.
//!
//! # Architecture
//!
//! ```text
//! main.rs (entry, peripheral hand-off)
//!         ↓
//! boot (typestate orchestrator) → app (steady-state loop)
//!         ↓
//! boot-hal (clock tree manager, timebase, collaborator traits)
//!         ↓
//! hardware (SAMx7x registers)  |  boot_hal::mocks (simulated MCU)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the SAM S70/E70 target (cortex-m-rt, defmt, RTT)
//! - `simulator` - Host simulator with `tracing` output
//! - `std` - Enable standard library (for the simulator and testing)
//!
//! # Examples
//!
//! ## Hardware Target
//!
//! ```bash
//! cargo run --release --target thumbv7em-none-eabihf --features hardware
//! ```
//!
//! ## Host Simulator
//!
//! ```bash
//! cargo run --example boot_simulator --features simulator
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]

pub mod app;
pub mod boot;
pub mod config;
pub mod exception_handlers;
pub mod halt;

#[cfg(feature = "hardware")]
pub mod hardware;

// Re-export key types
pub use app::{AppHook, Heartbeat, SteadyState};
pub use boot::{
    run_boot_sequence, BootError, BootPeripherals, BootState, BootTrace, ColdBoot,
    BOOT_SEQUENCE_STEPS,
};
pub use config::BootConfig;
pub use halt::boot_failed;
