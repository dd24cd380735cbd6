use super::deferred::Confirm;
use super::{ConfigError, WakeSource};
use crate::os::{Clock, Waiter};
use crate::rtos::EventRegistry;
use crate::wakeup::WakeReason;

/// UART with RTS/CTS flow control able to wake the core on a CTS change
pub trait CtsWakeSource {
    fn enable_cts_wakeup(&mut self) -> Result<(), ConfigError>;
}

/// Worker half of the CTS producer. The interrupt half is a plain
/// [`IrqSignal`](super::IrqSignal) raised from the UART handler.
pub struct UartCtsWakeup<C> {
    uart: C,
}

impl<C: CtsWakeSource> UartCtsWakeup<C> {
    pub fn new(uart: C) -> Self {
        Self { uart }
    }
}

impl<C: CtsWakeSource> Confirm for UartCtsWakeup<C> {
    fn confirm<P: Waiter + Clock>(&mut self, registry: &EventRegistry<P>) -> Result<(), &'static str> {
        registry.set(WakeReason::UART_CTS);
        Ok(())
    }
}

impl<C: CtsWakeSource> WakeSource for UartCtsWakeup<C> {
    fn reason(&self) -> WakeReason {
        WakeReason::UART_CTS
    }

    fn configure(&mut self) -> Result<(), ConfigError> {
        self.uart.enable_cts_wakeup()
    }
}
