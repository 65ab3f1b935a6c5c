//! Millisecond timebase on top of a periodic hardware tick.
//!
//! The Cortex-M SysTick counts down from a reload value and sets `COUNTFLAG`
//! each time it wraps. The timebase programs the reload for a fixed tick
//! period and turns observed wraps into a monotonically increasing, wrapping
//! [`TickCounter`]. `delay_ms` busy-waits on that counter.
//!
//! # Ordering
//!
//! [`Timebase::new`] takes a [`SystemClock`], which only a committed clock tree
//! hands out. Initialising the timebase before the clock commit therefore does
//! not type-check, and the reload is always derived from the frequency the
//! core actually runs at.
//!
//! # Reload
//!
//! ```text
//! reload = ceil(f_sysclk * period_ms / 1000) - 1      (must be 1..=0xFF_FFFF)
//! ```
//!
//! Rounding up makes every tick at least `period_ms` long, so delays never
//! come out short when the frequency is not a multiple of 1 kHz.

use embedded_hal::delay::DelayNs;

use crate::clock_config::Hertz;
use crate::clock_tree::SystemClock;
use crate::error::TimebaseError;

/// SysTick `RVR` is 24 bits wide.
pub const SYSTICK_MAX_RELOAD: u32 = 0x00FF_FFFF;

// ── Hardware seam ────────────────────────────────────────────────────────────

/// A free-running periodic tick, e.g. SysTick on the core clock.
pub trait TickSource {
    /// Program `reload` and start counting. The first period starts now.
    fn start(&mut self, reload: u32);

    /// `true` if at least one period has elapsed since the last call.
    ///
    /// Reading clears the flag. Several periods elapsing between two calls
    /// still read as one.
    fn period_elapsed(&mut self) -> bool;
}

impl<T: TickSource + ?Sized> TickSource for &mut T {
    fn start(&mut self, reload: u32) {
        T::start(self, reload);
    }

    fn period_elapsed(&mut self) -> bool {
        T::period_elapsed(self)
    }
}

// ── Tick period ──────────────────────────────────────────────────────────────

/// Length of one tick in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickPeriod(u32);

impl TickPeriod {
    /// 1 ms, the default tick.
    pub const ONE_MS: Self = Self(1);

    /// A tick of `ms` milliseconds. Zero is rejected by [`Timebase::new`].
    #[must_use]
    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    /// Period in milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u32 {
        self.0
    }
}

impl Default for TickPeriod {
    fn default() -> Self {
        Self::ONE_MS
    }
}

/// SysTick reload value giving one `period` at `clock`.
///
/// # Errors
///
/// [`TimebaseError::TickPeriodUnreachable`] if the reload is zero (period too
/// short or zero) or wider than 24 bits (period too long).
pub fn systick_reload(clock: Hertz, period: TickPeriod) -> Result<u32, TimebaseError> {
    let unreachable = TimebaseError::TickPeriodUnreachable {
        clock,
        period_ms: period.as_millis(),
    };
    // u32 * u32 always fits in u64
    let cycles = u64::from(clock.to_hz())
        .saturating_mul(u64::from(period.as_millis()))
        .div_ceil(1_000);
    let reload = cycles.checked_sub(1).ok_or(unreachable)?;
    if reload == 0 || reload > u64::from(SYSTICK_MAX_RELOAD) {
        return Err(unreachable);
    }
    u32::try_from(reload).map_err(|_| unreachable)
}

// ── Tick counter ─────────────────────────────────────────────────────────────

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Unsigned integer widths usable as a [`TickCounter`].
pub trait CounterWord: Copy + Eq + core::fmt::Debug + sealed::Sealed {
    /// Counter value after init.
    const ZERO: Self;
    /// Largest number of ticks [`CounterWord::elapsed_since`] can report
    /// without ambiguity.
    const SPAN: u32;

    /// Next value, wrapping to zero after the maximum.
    #[must_use]
    fn increment(self) -> Self;

    /// Ticks from `earlier` to `self`, modulo the counter width.
    fn elapsed_since(self, earlier: Self) -> u32;
}

macro_rules! counter_word {
    ($($t:ty),*) => {$(
        impl CounterWord for $t {
            const ZERO: Self = 0;
            const SPAN: u32 = <$t>::MAX as u32;

            fn increment(self) -> Self {
                self.wrapping_add(1)
            }

            fn elapsed_since(self, earlier: Self) -> u32 {
                u32::from(self.wrapping_sub(earlier))
            }
        }
    )*};
}

counter_word!(u8, u16, u32);

/// Number of ticks observed since the timebase started.
///
/// Only the [`Timebase`] that owns it can advance it. It wraps at the width
/// of `W`; compare values with [`CounterWord::elapsed_since`], never with `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickCounter<W = u32> {
    ticks: W,
}

impl<W: CounterWord> TickCounter<W> {
    const fn new() -> Self {
        Self { ticks: W::ZERO }
    }

    fn advance(&mut self) {
        self.ticks = self.ticks.increment();
    }

    /// Current count.
    pub fn get(&self) -> W {
        self.ticks
    }
}

// ── Timebase ─────────────────────────────────────────────────────────────────

/// Running tick service. Sole writer of its [`TickCounter`].
pub struct Timebase<T, W = u32> {
    source: T,
    counter: TickCounter<W>,
    clock: SystemClock,
    period: TickPeriod,
    reload: u32,
}

impl<T: TickSource, W: CounterWord> Timebase<T, W> {
    /// Program `source` for one tick per `period` at the committed `clock`
    /// and start it.
    ///
    /// # Errors
    ///
    /// [`TimebaseError::TickPeriodUnreachable`], see [`systick_reload`].
    /// Nothing is written to `source` in that case.
    pub fn new(
        mut source: T,
        clock: SystemClock,
        period: TickPeriod,
    ) -> Result<Self, TimebaseError> {
        let reload = systick_reload(clock.frequency(), period)?;
        source.start(reload);
        Ok(Self {
            source,
            counter: TickCounter::new(),
            clock,
            period,
            reload,
        })
    }

    /// Reload value programmed into the tick source.
    pub fn reload(&self) -> u32 {
        self.reload
    }

    /// Clock the timebase was derived from.
    pub fn clock(&self) -> SystemClock {
        self.clock
    }

    /// Tick period.
    pub fn period(&self) -> TickPeriod {
        self.period
    }

    /// Read-only view of the tick counter.
    pub fn counter(&self) -> &TickCounter<W> {
        &self.counter
    }

    /// Current tick count.
    pub fn now(&self) -> W {
        self.counter.get()
    }

    /// Check the tick source once and advance the counter if a period elapsed.
    pub fn poll(&mut self) -> bool {
        let elapsed = self.source.period_elapsed();
        if elapsed {
            self.counter.advance();
        }
        elapsed
    }

    fn wait_for_tick(&mut self) {
        while !self.poll() {
            core::hint::spin_loop();
        }
    }

    /// Block for at least `ms` milliseconds. Never returns early.
    ///
    /// A stale elapsed flag is discarded and the call first waits for the next
    /// tick edge, so each counted tick is a whole period. Delays longer than
    /// the counter can span are waited out in chunks.
    pub fn delay_ms(&mut self, ms: u32) {
        if ms == 0 {
            return;
        }
        let mut remaining = ms.div_ceil(self.period.as_millis().max(1));

        self.poll();
        self.wait_for_tick();

        while remaining > 0 {
            let chunk = remaining.min(W::SPAN);
            let start = self.counter.get();
            while self.counter.get().elapsed_since(start) < chunk {
                self.wait_for_tick();
            }
            remaining = remaining.saturating_sub(chunk);
        }
    }

    /// Stop using the timebase and hand the tick source back.
    pub fn release(self) -> T {
        self.source
    }
}

impl<T: TickSource, W: CounterWord> DelayNs for Timebase<T, W> {
    fn delay_ns(&mut self, ns: u32) {
        Timebase::delay_ms(self, ns.div_ceil(1_000_000));
    }

    fn delay_us(&mut self, us: u32) {
        Timebase::delay_ms(self, us.div_ceil(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        Timebase::delay_ms(self, ms);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
