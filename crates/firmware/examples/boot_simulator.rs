//! Host simulator: boots a simulated SAMx7x and runs a few loop iterations.
//!
//! Run with:
//!   cargo run -p coldboot --example boot_simulator --features simulator
//!
//! Set `RUST_LOG=debug` to see clock and timebase details.

use boot_hal::mocks::SimulatedMcu;
use coldboot::app::{Heartbeat, SteadyState};
use coldboot::boot::{run_boot_sequence, BootPeripherals};
use coldboot::config::BootConfig;
use tracing_subscriber::EnvFilter;

const ITERATIONS: u32 = 3;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mcu = SimulatedMcu::new();
    let config = BootConfig::DEFAULT;
    let peripherals = BootPeripherals {
        cache: mcu.cache(),
        watchdog: mcu.watchdog(),
        clock: mcu.clock(),
        tick: mcu.tick(),
    };

    let running = match run_boot_sequence(&config, peripherals) {
        Ok(running) => running,
        Err(error) => {
            tracing::error!(%error, "boot failed");
            std::process::exit(1);
        }
    };

    let (clock, timebase, trace) = running.into_parts();
    tracing::info!(
        states = trace.states().len(),
        hz = clock.frequency().to_hz(),
        reload = timebase.reload(),
        "boot complete"
    );

    let mut steady = SteadyState::new(timebase, Heartbeat::default(), config.loop_half_period_ms);
    for _ in 0..ITERATIONS {
        steady.step();
    }
    tracing::info!(
        beats = steady.hook().beats(),
        simulated_ms = mcu.elapsed_nanos() / 1_000_000,
        "steady state"
    );
}
