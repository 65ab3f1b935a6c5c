//! Hardware abstraction for the SAMx7x cold boot.
//!
//! This crate holds the trait seams the boot sequence drives, the pure clock
//! and timebase math behind them, and a simulated chip for host tests.
//!
//! # Architecture Layers
//!
//! ```text
//! Boot orchestrator + steady-state loop (coldboot crate)
//!         ↓
//! Clock tree manager, timebase service (this crate)
//!         ↓
//! Collaborator traits (this crate)
//!         ↓
//! SAMx7x registers (coldboot `hardware` feature) or SimulatedMcu (`std`)
//! ```
//!
//! # Collaborators
//!
//! - [`CacheControl`] - L1 instruction/data cache disable
//! - [`WatchdogControl`] - watchdog disable
//! - [`ClockControl`] - PMC, EEFC and UTMI register operations
//! - [`TickSource`] - SysTick
//!
//! # Features
//!
//! - `std`: enable [`mocks`] (the simulated MCU) for downstream tests
//! - `defmt`: derive `defmt::Format` on all public types
//!
//! # Example
//!
//! ```
//! use boot_hal::timebase::systick_reload;
//! use boot_hal::{ClockConfiguration, Hertz, TickPeriod};
//!
//! // Default board: internal RC at 12 MHz, 1 ms tick
//! let config = ClockConfiguration::new(Hertz::mhz(12), 0).unwrap();
//! assert_eq!(config.flash_wait_states.get(), 0);
//! assert_eq!(systick_reload(config.system_clock(), TickPeriod::ONE_MS), Ok(11_999));
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cache;
pub mod clock_config;
pub mod clock_tree;
pub mod error;
pub mod timebase;
pub mod watchdog;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use cache::CacheControl;
pub use clock_config::{
    ClockConfiguration, FlashWaitStates, Hertz, MainOscillator, OscillatorSource, RcFrequency,
    UsbReference,
};
pub use clock_tree::{
    ClockControl, ClockTreeManager, CommittedClock, LockTimeout, PendingClockTree, SystemClock,
};
pub use error::{ClockError, LockStage, TimebaseError};
pub use timebase::{CounterWord, TickCounter, TickPeriod, TickSource, Timebase};
pub use watchdog::WatchdogControl;
