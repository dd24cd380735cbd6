use avr_device::atmega128::CPU;
use avr_device::interrupt;
use portable_atomic::{AtomicBool, Ordering};

use super::timer;
use crate::drivers::{ConfigError, WakeLatch};
use crate::os::{avr, DeepSleep};

#[derive(Clone, Copy)]
#[repr(u8)]
pub enum SleepMode {
    Idle = 0b000,
    AdcNoiseReduction = 0b001,
    PowerDown = 0b010,
    /// Power-down with the asynchronous Timer0 still running
    PowerSave = 0b011,
    Standby = 0b110,
    ExtendedStandby = 0b111,
}

static LATCH_ENABLED: AtomicBool = AtomicBool::new(false);
static LEFT_POWER_SAVE: AtomicBool = AtomicBool::new(false);

pub struct Power {
    _private: (),
}

impl Power {
    pub fn new() -> Self {
        Self { _private: () }
    }

    // SM2 is MCUCR bit 2, SM1..SM0 bits 4..3, SE bit 5
    #[inline]
    pub fn set_sleep_mode(&mut self, mode: SleepMode) {
        let m = mode as u8;
        let bits = (m & 0b100) | ((m & 0b011) << 3);
        unsafe {
            (*CPU::ptr()).mcucr.modify(|r, w| w.bits((r.bits() & !0x1C) | bits));
        }
    }

    #[inline]
    pub fn enable_sleep(&mut self) {
        unsafe {
            (*CPU::ptr()).mcucr.modify(|r, w| w.bits(r.bits() | 0x20));
        }
    }

    #[inline]
    pub fn disable_sleep(&mut self) {
        unsafe {
            (*CPU::ptr()).mcucr.modify(|r, w| w.bits(r.bits() & !0x20));
        }
    }

    /// Sleep in `mode` unless `stay_awake` already holds. The check and the
    /// `sleep` are atomic: an interrupt that makes `stay_awake` true can only
    /// fire after the core is asleep, and then wakes it.
    fn sleep_unless(&mut self, mode: SleepMode, stay_awake: impl Fn() -> bool) -> bool {
        interrupt::disable();
        if stay_awake() {
            unsafe { interrupt::enable() };
            return false;
        }
        self.set_sleep_mode(mode);
        self.enable_sleep();
        // SEI takes effect after the next instruction
        unsafe { interrupt::enable() };
        avr_device::asm::sleep();
        self.disable_sleep();
        true
    }

    pub fn enter_idle_mode(&mut self) {
        self.sleep_unless(SleepMode::Idle, avr::wake_pending);
    }
}

impl Default for Power {
    fn default() -> Self {
        Self::new()
    }
}

impl DeepSleep for Power {
    fn deep_sleep(&mut self) {
        // Timer0 overflows wake the core every period; only a producer or
        // the alarm ends the sleep
        let mut slept = false;
        while self.sleep_unless(SleepMode::PowerSave, || {
            avr::wake_pending() || timer::alarm_due()
        }) {
            slept = true;
        }

        if slept && LATCH_ENABLED.load(Ordering::Acquire) {
            LEFT_POWER_SAVE.store(true, Ordering::Release);
        }
    }
}

/// Software stand-in for a power-down wake latch. The AVR has no flag that
/// survives the wake-up interrupt, so [`Power::deep_sleep`] sets this one
/// when it leaves power-save.
pub struct PowerSaveLatch {
    _private: (),
}

impl PowerSaveLatch {
    pub fn new() -> Self {
        Self { _private: () }
    }

    #[inline]
    pub fn pending() -> bool {
        LEFT_POWER_SAVE.load(Ordering::Acquire)
    }
}

impl Default for PowerSaveLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeLatch for PowerSaveLatch {
    fn enable(&mut self) -> Result<(), ConfigError> {
        LATCH_ENABLED.store(true, Ordering::Release);
        Ok(())
    }

    fn clear(&mut self) {
        LEFT_POWER_SAVE.store(false, Ordering::Release);
    }
}
