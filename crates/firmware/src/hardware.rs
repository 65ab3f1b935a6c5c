//! SAMx7x register implementations of the boot collaborators.
//!
//! Only compiled when targeting real hardware (`--features hardware`). Host
//! tests never compile or link this module.
//!
//! PMC, EEFC, WDT, RSWDT and UTMI are reached through raw volatile accesses at
//! their datasheet addresses; the Cortex-M7 core peripherals (SCB, CPUID,
//! SYST) through `cortex-m`.
//!
//! # Sources
//!
//! - SAM E70/S70/V70/V71 datasheet §31 (PMC), §22 (EEFC), §25 (WDT),
//!   §26 (RSWDT), §39 (UTMI)
//! - ARM DDI0489F §B3.3 (SysTick)

use boot_hal::{
    CacheControl, ClockControl, FlashWaitStates, MainOscillator, TickSource, UsbReference,
    WatchdogControl,
};
use boot_hal::clock_config::USB_FS_DIVIDER;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{CPUID, SCB, SYST};

// ── Register access ──────────────────────────────────────────────────────────

/// A 32-bit memory-mapped register at a fixed SAMx7x address.
#[derive(Clone, Copy)]
struct Reg(usize);

impl Reg {
    fn read(self) -> u32 {
        // SAFETY: every `Reg` is one of the constants below, an aligned,
        // always-mapped peripheral register on SAMx7x.
        unsafe { core::ptr::read_volatile(self.0 as *const u32) }
    }

    fn write(self, value: u32) {
        // SAFETY: see `read`. The boot runs in a single context, so no other
        // code races these read-modify-write sequences.
        unsafe { core::ptr::write_volatile(self.0 as *mut u32, value) }
    }

    fn modify(self, f: impl FnOnce(u32) -> u32) {
        self.write(f(self.read()));
    }

    fn is_set(self, mask: u32) -> bool {
        self.read() & mask != 0
    }
}

// PMC at 0x400E_0600
const PMC_SCER: Reg = Reg(0x400E_0600);
const CKGR_UCKR: Reg = Reg(0x400E_061C);
const CKGR_MOR: Reg = Reg(0x400E_0620);
const PMC_MCKR: Reg = Reg(0x400E_0630);
const PMC_USB: Reg = Reg(0x400E_0638);
const PMC_SR: Reg = Reg(0x400E_0668);

// EEFC at 0x400E_0C00, WDT at 0x400E_1850, RSWDT at 0x400E_1900, UTMI at 0x400E_0400
const EEFC_FMR: Reg = Reg(0x400E_0C00);
const WDT_MR: Reg = Reg(0x400E_1854);
const RSWDT_MR: Reg = Reg(0x400E_1904);
const UTMI_CKTRIM: Reg = Reg(0x400E_0430);

// CKGR_MOR
const MOR_KEY: u32 = 0x37 << 16;
const MOR_KEY_MASK: u32 = 0xFF << 16;
const MOR_MOSCXTEN: u32 = 1 << 0;
const MOR_MOSCXTBY: u32 = 1 << 1;
const MOR_MOSCRCEN: u32 = 1 << 3;
const MOR_MOSCRCF_SHIFT: u32 = 4;
const MOR_MOSCRCF_MASK: u32 = 0x7 << MOR_MOSCRCF_SHIFT;
const MOR_MOSCXTST_MAX: u32 = 0xFF << 8;
const MOR_MOSCSEL: u32 = 1 << 24;

// CKGR_UCKR
const UCKR_UPLLEN: u32 = 1 << 16;
const UCKR_UPLLCOUNT_MAX: u32 = 0xF << 20;

// PMC_MCKR
const MCKR_CSS_MASK: u32 = 0x3;
const MCKR_CSS_MAIN: u32 = 0x1;
const MCKR_PRES_MASK: u32 = 0x7 << 4;
const MCKR_MDIV_MASK: u32 = 0x3 << 8;

// PMC_USB
const USB_USBS_UPLL: u32 = 1 << 0;
const USB_USBDIV_SHIFT: u32 = 8;
const USB_USBDIV_MASK: u32 = 0xF << USB_USBDIV_SHIFT;

// PMC_SCER
const SCER_USBCLK: u32 = 1 << 5;

// PMC_SR
const SR_MOSCXTS: u32 = 1 << 0;
const SR_MCKRDY: u32 = 1 << 3;
const SR_LOCKU: u32 = 1 << 6;
const SR_MOSCSELS: u32 = 1 << 16;
const SR_MOSCRCS: u32 = 1 << 17;

// EEFC_FMR
const FMR_FWS_SHIFT: u32 = 8;
const FMR_FWS_MASK: u32 = 0xF << FMR_FWS_SHIFT;

// WDT_MR / RSWDT_MR
const MR_WDDIS: u32 = 1 << 15;

// UTMI_CKTRIM
const CKTRIM_FREQ_MASK: u32 = 0x3;

// ── Cache ────────────────────────────────────────────────────────────────────

/// Cortex-M7 L1 caches.
pub struct Samx7xCache {
    scb: SCB,
    cpuid: CPUID,
}

impl Samx7xCache {
    /// Take the SCB and CPUID.
    pub fn new(scb: SCB, cpuid: CPUID) -> Self {
        Self { scb, cpuid }
    }
}

impl CacheControl for Samx7xCache {
    fn disable_instruction_cache(&mut self) {
        if SCB::icache_enabled() {
            self.scb.disable_icache();
        }
    }

    fn disable_data_cache(&mut self) {
        if SCB::dcache_enabled() {
            // cleans before disabling
            self.scb.disable_dcache(&mut self.cpuid);
        }
    }
}

// ── Watchdog ─────────────────────────────────────────────────────────────────

/// WDT and RSWDT. Both mode registers are write-once after reset.
pub struct Samx7xWatchdog {
    _private: (),
}

impl Samx7xWatchdog {
    /// Claim both watchdogs.
    ///
    /// Only one instance may exist: the mode registers accept one write.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl WatchdogControl for Samx7xWatchdog {
    fn disable_watchdog(&mut self) {
        for mr in [WDT_MR, RSWDT_MR] {
            if !mr.is_set(MR_WDDIS) {
                mr.write(MR_WDDIS);
            }
        }
    }
}

// ── Clock ────────────────────────────────────────────────────────────────────

/// PMC, EEFC and UTMI.
///
/// The internal RC feeds MAINCK from reset, so retrimming it in
/// `start_main_oscillator` would change the core clock before the commit.
/// The RC frequency is therefore only written in `select_main_oscillator`.
pub struct Samx7xClock {
    started: Option<MainOscillator>,
}

impl Samx7xClock {
    /// Claim the PMC.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { started: None }
    }
}

fn mor_write(f: impl FnOnce(u32) -> u32) {
    CKGR_MOR.modify(|mor| (f(mor) & !MOR_KEY_MASK) | MOR_KEY);
}

impl ClockControl for Samx7xClock {
    fn start_main_oscillator(&mut self, oscillator: MainOscillator) {
        self.started = Some(oscillator);
        match oscillator {
            MainOscillator::InternalRc(_) => mor_write(|mor| mor | MOR_MOSCRCEN),
            MainOscillator::Crystal(_) => {
                mor_write(|mor| (mor & !MOR_MOSCXTBY) | MOR_MOSCXTEN | MOR_MOSCXTST_MAX);
            }
            MainOscillator::Bypass(_) => {
                mor_write(|mor| (mor & !MOR_MOSCXTEN) | MOR_MOSCXTBY);
            }
        }
    }

    fn main_oscillator_stable(&mut self) -> bool {
        match self.started {
            Some(MainOscillator::InternalRc(_)) => PMC_SR.is_set(SR_MOSCRCS),
            Some(MainOscillator::Crystal(_)) => PMC_SR.is_set(SR_MOSCXTS),
            // no start-up time in bypass mode
            Some(MainOscillator::Bypass(_)) => true,
            None => false,
        }
    }

    fn start_usb_pll(&mut self, reference: UsbReference) {
        // the UPLL reference comes from XIN even while MAINCK runs on the RC
        if !matches!(
            self.started,
            Some(MainOscillator::Crystal(_) | MainOscillator::Bypass(_))
        ) {
            mor_write(|mor| (mor & !MOR_MOSCXTBY) | MOR_MOSCXTEN | MOR_MOSCXTST_MAX);
        }
        UTMI_CKTRIM.modify(|trim| (trim & !CKTRIM_FREQ_MASK) | reference.field());
        CKGR_UCKR.write(UCKR_UPLLEN | UCKR_UPLLCOUNT_MAX);
    }

    fn usb_pll_locked(&mut self) -> bool {
        PMC_SR.is_set(SR_LOCKU)
    }

    fn flash_wait_states(&mut self) -> FlashWaitStates {
        let fws = (EEFC_FMR.read() & FMR_FWS_MASK).wrapping_shr(FMR_FWS_SHIFT);
        FlashWaitStates::from_field(u8::try_from(fws).unwrap_or(u8::MAX))
    }

    fn set_flash_wait_states(&mut self, wait_states: FlashWaitStates) {
        let fws = u32::from(wait_states.get()).wrapping_shl(FMR_FWS_SHIFT);
        EEFC_FMR.modify(|fmr| (fmr & !FMR_FWS_MASK) | fws);
    }

    fn select_main_oscillator(&mut self, oscillator: MainOscillator) {
        match oscillator {
            MainOscillator::InternalRc(rc) => mor_write(|mor| {
                (mor & !(MOR_MOSCSEL | MOR_MOSCRCF_MASK)) | rc.field().wrapping_shl(MOR_MOSCRCF_SHIFT)
            }),
            MainOscillator::Crystal(_) | MainOscillator::Bypass(_) => {
                mor_write(|mor| mor | MOR_MOSCSEL);
            }
        }
    }

    fn main_oscillator_selected(&mut self) -> bool {
        let sr = PMC_SR.read();
        match self.started {
            // a retrimmed RC must settle again
            Some(MainOscillator::InternalRc(_)) => sr & SR_MOSCRCS != 0,
            Some(_) => sr & SR_MOSCSELS != 0,
            None => false,
        }
    }

    fn select_master_clock_main(&mut self) {
        PMC_MCKR.modify(|mckr| (mckr & !MCKR_CSS_MASK) | MCKR_CSS_MAIN);
    }

    fn set_master_clock_prescaler_div1(&mut self) {
        PMC_MCKR.modify(|mckr| mckr & !(MCKR_PRES_MASK | MCKR_MDIV_MASK));
    }

    fn master_clock_ready(&mut self) -> bool {
        PMC_SR.is_set(SR_MCKRDY)
    }

    fn route_usb_clock(&mut self) {
        PMC_USB.write(USB_USBS_UPLL | (USB_FS_DIVIDER.wrapping_shl(USB_USBDIV_SHIFT) & USB_USBDIV_MASK));
        PMC_SCER.write(SCER_USBCLK);
    }
}

// ── SysTick ──────────────────────────────────────────────────────────────────

/// SysTick on the core clock.
pub struct SysTickSource {
    syst: SYST,
}

impl SysTickSource {
    /// Take the SYST peripheral.
    pub fn new(syst: SYST) -> Self {
        Self { syst }
    }
}

impl TickSource for SysTickSource {
    fn start(&mut self, reload: u32) {
        self.syst.disable_counter();
        self.syst.set_clock_source(SystClkSource::Core);
        self.syst.set_reload(reload);
        self.syst.clear_current();
        self.syst.enable_counter();
    }

    fn period_elapsed(&mut self) -> bool {
        // reads and clears COUNTFLAG
        self.syst.has_wrapped()
    }
}
