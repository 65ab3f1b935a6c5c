//! Cold-boot firmware - Main Entry Point
//!
//! Hardware-only entry point for SAM S70/E70.

#![no_std]
#![no_main]

use coldboot::app::{Heartbeat, SteadyState};
use coldboot::boot::{run_boot_sequence, BootPeripherals};
use coldboot::config::BootConfig;
use coldboot::hardware::{Samx7xCache, Samx7xClock, Samx7xWatchdog, SysTickSource};
use coldboot::halt::boot_failed;
use cortex_m_rt::entry;

// Global logger (RTT) and panic handler
use defmt_rtt as _;
use panic_probe as _;

#[entry]
fn main() -> ! {
    defmt::info!("coldboot v{=str}", env!("CARGO_PKG_VERSION"));

    // `take()` only fails if called twice; `#[entry]` runs once.
    let Some(core) = cortex_m::Peripherals::take() else {
        defmt::error!("core peripherals already taken");
        loop {
            cortex_m::asm::wfi();
        }
    };

    let config = BootConfig::DEFAULT;
    let peripherals = BootPeripherals {
        cache: Samx7xCache::new(core.SCB, core.CPUID),
        watchdog: Samx7xWatchdog::new(),
        clock: Samx7xClock::new(),
        tick: SysTickSource::new(core.SYST),
    };

    match run_boot_sequence(&config, peripherals) {
        Ok(running) => {
            defmt::info!("boot complete, entering steady state");
            let (_clock, timebase, _trace) = running.into_parts();
            SteadyState::new(timebase, Heartbeat::default(), config.loop_half_period_ms).run()
        }
        Err(error) => boot_failed(error),
    }
}
