use crate::drivers::{ConfigError, WatchdogWake};

/// The ATmega128 watchdog can only reset the part. It has no interrupt
/// mode, so it cannot serve as a wake-up source.
pub struct Watchdog {
    _private: (),
}

impl Watchdog {
    #[inline]
    pub fn new() -> Self {
        Self { _private: () }
    }

    #[inline]
    pub fn feed(&mut self) {
        avr_device::asm::wdr();
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchdogWake for Watchdog {
    fn enable_wakeup(&mut self) -> Result<(), ConfigError> {
        Err(ConfigError::Unsupported)
    }

    fn take_timeout(&mut self) -> bool {
        false
    }

    fn reset_counter(&mut self) {
        self.feed();
    }

    fn take_wakeup(&mut self) -> bool {
        false
    }
}
