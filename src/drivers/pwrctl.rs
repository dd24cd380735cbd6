use super::{ConfigError, WakeSource};
use crate::os::{Clock, Waiter};
use crate::rtos::EventRegistry;
use crate::wakeup::WakeReason;

/// Power controller's "left power-down" latch
pub trait WakeLatch {
    /// Enable the power-down wake-up interrupt
    fn enable(&mut self) -> Result<(), ConfigError>;
    /// Acknowledge the latch so the core can enter power-down again
    fn clear(&mut self);
}

/// Fires on every exit from deep sleep without knowing who caused it, so it
/// can only ever say `UNIDENTIFIED`.
pub struct PowerWakeup<'r, P, L> {
    latch: L,
    registry: &'r EventRegistry<P>,
}

impl<'r, P: Waiter + Clock, L: WakeLatch> PowerWakeup<'r, P, L> {
    pub fn new(latch: L, registry: &'r EventRegistry<P>) -> Self {
        Self { latch, registry }
    }

    pub fn on_interrupt(&mut self) {
        self.latch.clear();
        self.registry.set(WakeReason::UNIDENTIFIED);
    }
}

impl<'r, P: Waiter + Clock, L: WakeLatch> WakeSource for PowerWakeup<'r, P, L> {
    fn reason(&self) -> WakeReason {
        WakeReason::UNIDENTIFIED
    }

    fn configure(&mut self) -> Result<(), ConfigError> {
        self.latch.enable()
    }
}
