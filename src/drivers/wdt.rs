use super::{ConfigError, WakeSource};
use crate::os::{Clock, Waiter};
use crate::rtos::EventRegistry;
use crate::wakeup::WakeReason;

/// Watchdog interrupt and wake-up flags
pub trait WatchdogWake {
    /// Interrupt-only mode with wake-up enabled, system reset disabled.
    /// Parts that cannot wake on the watchdog return `Unsupported`.
    fn enable_wakeup(&mut self) -> Result<(), ConfigError>;
    /// Read and clear the timeout interrupt flag
    fn take_timeout(&mut self) -> bool;
    fn reset_counter(&mut self);
    /// Read and clear the wake-up flag
    fn take_wakeup(&mut self) -> bool;
}

pub struct WdtWakeup<'r, P, W> {
    wdt: W,
    registry: &'r EventRegistry<P>,
}

impl<'r, P: Waiter + Clock, W: WatchdogWake> WdtWakeup<'r, P, W> {
    pub fn new(wdt: W, registry: &'r EventRegistry<P>) -> Self {
        Self { wdt, registry }
    }

    pub fn on_interrupt(&mut self) {
        if self.wdt.take_timeout() {
            self.wdt.reset_counter();
        }

        if self.wdt.take_wakeup() {
            self.registry.set(WakeReason::WDT_TIMEOUT);
        }
    }
}

impl<'r, P: Waiter + Clock, W: WatchdogWake> WakeSource for WdtWakeup<'r, P, W> {
    fn reason(&self) -> WakeReason {
        WakeReason::WDT_TIMEOUT
    }

    fn configure(&mut self) -> Result<(), ConfigError> {
        self.wdt.enable_wakeup()
    }
}
