//! Kernel tick and the sleep-proof time base
//!
//! Timer1 in CTC mode is the kernel tick. Timer0 runs from the 32.768 kHz
//! watch crystal in asynchronous mode and keeps counting in power-save; it
//! serves as the low-power timer, the idle alarm and the software RTC.

use avr_device::atmega128::{TC0, TC1};
use avr_device::interrupt::{self, Mutex};
use core::cell::Cell;

use crate::config::{CPU_FREQ_HZ, OS_TICK_HZ, US_PER_SEC};
use crate::drivers::{AlarmFlag, AlarmScheduler};
use crate::os::{ticks_until, LowPowerAlarm, LowPowerTimer, TickSource};

const TOSC_HZ: u64 = 32_768;
/// Timer0 clock select: TOSC / 8
const TC0_PRESCALE: u64 = 8;
const TC0_HZ: u64 = TOSC_HZ / TC0_PRESCALE;

const TC1_PRESCALE: u32 = 64;
const TC1_TOP: u16 = (CPU_FREQ_HZ / TC1_PRESCALE / OS_TICK_HZ - 1) as u16;

static TICKS: Mutex<Cell<u64>> = Mutex::new(Cell::new(0));
static DEADLINE: Mutex<Cell<Option<u64>>> = Mutex::new(Cell::new(None));

static OVERFLOWS: Mutex<Cell<u64>> = Mutex::new(Cell::new(0));
static ALARM_AT: Mutex<Cell<Option<u64>>> = Mutex::new(Cell::new(None));
static RTC_AT: Mutex<Cell<Option<u64>>> = Mutex::new(Cell::new(None));
static RTC_FIRED: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

/// Timer0 counts since boot
fn counts(cs: interrupt::CriticalSection<'_>) -> u64 {
    let mut overflows = OVERFLOWS.borrow(cs).get();
    let (tcnt, pending) = unsafe {
        let p = TC0::ptr();
        ((*p).tcnt0.read().bits(), (*p).tifr.read().bits() & 0x01 != 0)
    };
    // Overflow not yet serviced
    if pending && tcnt < 0x80 {
        overflows += 1;
    }
    (overflows << 8) | u64::from(tcnt)
}

fn us_to_counts(us: u64) -> u64 {
    us * TC0_HZ / US_PER_SEC
}

fn counts_to_us(counts: u64) -> u64 {
    counts * US_PER_SEC / TC0_HZ
}

/// Start Timer0 on the watch crystal
pub fn init_async_timer() {
    unsafe {
        let p = TC0::ptr();
        (*p).timsk.modify(|r, w| w.bits(r.bits() & !0x03));
        (*p).assr.write(|w| w.bits(0x08));
        (*p).tcnt0.write(|w| w.bits(0));
        (*p).tccr0.write(|w| w.bits(0x02));
        // Wait for the asynchronous register updates
        while (*p).assr.read().bits() & 0x07 != 0 {}
        (*p).tifr.write(|w| w.bits(0x03));
        (*p).timsk.modify(|r, w| w.bits(r.bits() | 0x01));
    }
}

/// Timer0 overflow work. Returns true when the software RTC alarm fired.
pub fn on_overflow() -> bool {
    interrupt::free(|cs| {
        let overflows = OVERFLOWS.borrow(cs);
        overflows.set(overflows.get() + 1);
        let now = counts(cs);

        match RTC_AT.borrow(cs).get() {
            Some(at) if now >= at => {
                RTC_AT.borrow(cs).set(None);
                RTC_FIRED.borrow(cs).set(true);
                true
            }
            _ => false,
        }
    })
}

/// Idle alarm expired
pub fn alarm_due() -> bool {
    interrupt::free(|cs| match ALARM_AT.borrow(cs).get() {
        Some(at) => counts(cs) >= at,
        None => false,
    })
}

pub struct SysTick {
    _private: (),
}

impl SysTick {
    pub fn new() -> Self {
        unsafe {
            let p = TC1::ptr();
            (*p).ocr1a.write(|w| w.bits(TC1_TOP));
            (*p).tccr1a.write(|w| w.bits(0));
        }
        let mut tick = Self { _private: () };
        tick.start();
        unsafe {
            (*TC1::ptr()).timsk.modify(|r, w| w.bits(r.bits() | 0x10));
        }
        tick
    }

    fn start(&mut self) {
        unsafe {
            let p = TC1::ptr();
            (*p).tcnt1.write(|w| w.bits(0));
            // CTC on OCR1A, clk/64
            (*p).tccr1b.write(|w| w.bits(0x0B));
        }
    }

    fn stop(&mut self) {
        unsafe {
            (*TC1::ptr()).tccr1b.write(|w| w.bits(0x08));
        }
    }

    /// Kernel ticks since boot
    pub fn now() -> u64 {
        interrupt::free(|cs| TICKS.borrow(cs).get())
    }

    /// Tick the parked thread wants to run again at, if any
    pub fn set_deadline(deadline: Option<u64>) {
        interrupt::free(|cs| DEADLINE.borrow(cs).set(deadline));
    }

    /// Timer1 compare-match work
    pub fn on_tick() {
        interrupt::free(|cs| {
            let ticks = TICKS.borrow(cs);
            ticks.set(ticks.get() + 1);
        });
    }
}

impl TickSource for SysTick {
    fn suspend_ticks(&mut self) -> u32 {
        self.stop();
        interrupt::free(|cs| {
            ticks_until(TICKS.borrow(cs).get(), DEADLINE.borrow(cs).get())
        })
    }

    fn resume_ticks(&mut self, elapsed: u32) {
        interrupt::free(|cs| {
            let ticks = TICKS.borrow(cs);
            ticks.set(ticks.get() + u64::from(elapsed));
        });
        self.start();
    }
}

/// Stopwatch over Timer0. Timer0 itself never stops; this only keeps a
/// baseline.
pub struct LpTimer {
    base: u64,
    stopped_at: Option<u64>,
}

impl LpTimer {
    pub const fn new() -> Self {
        Self {
            base: 0,
            stopped_at: Some(0),
        }
    }
}

impl LowPowerTimer for LpTimer {
    fn reset(&mut self) {
        self.base = interrupt::free(counts);
        if self.stopped_at.is_some() {
            self.stopped_at = Some(self.base);
        }
    }

    fn start(&mut self) {
        if let Some(at) = self.stopped_at.take() {
            self.base += interrupt::free(counts) - at;
        }
    }

    fn stop(&mut self) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(interrupt::free(counts));
        }
    }

    fn elapsed_us(&self) -> u64 {
        let end = match self.stopped_at {
            Some(at) => at,
            None => interrupt::free(counts),
        };
        counts_to_us(end - self.base)
    }
}

/// Idle wake-up alarm. Checked on every Timer0 overflow wake.
pub struct LpAlarm {
    _private: (),
}

impl LpAlarm {
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl LowPowerAlarm for LpAlarm {
    fn arm_oneshot(&mut self, after_us: u64) {
        interrupt::free(|cs| {
            let at = counts(cs) + us_to_counts(after_us);
            ALARM_AT.borrow(cs).set(Some(at));
        });
    }

    fn disarm(&mut self) {
        interrupt::free(|cs| ALARM_AT.borrow(cs).set(None));
    }
}

/// Software RTC alarm on the Timer0 time base
pub struct RtcAlarm {
    _private: (),
}

impl RtcAlarm {
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl AlarmFlag for RtcAlarm {
    fn take_alarm(&mut self) -> bool {
        interrupt::free(|cs| RTC_FIRED.borrow(cs).replace(false))
    }
}

impl AlarmScheduler for RtcAlarm {
    type Error = core::convert::Infallible;

    fn schedule_alarm(&mut self, secs: u32) -> Result<(), Self::Error> {
        interrupt::free(|cs| {
            let at = counts(cs) + secs as u64 * TC0_HZ;
            RTC_AT.borrow(cs).set(Some(at));
        });
        Ok(())
    }
}
