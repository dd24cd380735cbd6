use embedded_hal::digital::v2::InputPin;

use super::{ConfigError, WakeSource};
use crate::os::{Clock, Waiter};
use crate::rtos::EventRegistry;
use crate::wakeup::WakeReason;

/// Edges that count as a wake-up. Buttons are active low, so a release is a
/// rising edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Release,
    /// Press and release. Works around parts whose GPIO wake from power-down
    /// only latches with both edge triggers enabled.
    Both,
}

/// Direct producer for a push button on a pin-change interrupt
pub struct ButtonWakeup<'r, P, PIN> {
    pin: PIN,
    reason: WakeReason,
    edges: Edge,
    registry: &'r EventRegistry<P>,
}

impl<'r, P, PIN> ButtonWakeup<'r, P, PIN>
where
    P: Waiter + Clock,
    PIN: InputPin,
{
    pub fn new(pin: PIN, reason: WakeReason, registry: &'r EventRegistry<P>) -> Self {
        Self {
            pin,
            reason,
            edges: Edge::Release,
            registry,
        }
    }

    pub fn button1(pin: PIN, registry: &'r EventRegistry<P>) -> Self {
        Self::new(pin, WakeReason::BUTTON1, registry)
    }

    pub fn button2(pin: PIN, registry: &'r EventRegistry<P>) -> Self {
        Self::new(pin, WakeReason::BUTTON2, registry)
    }

    pub fn with_edges(mut self, edges: Edge) -> Self {
        self.edges = edges;
        self
    }

    /// Pin-change interrupt entry
    pub fn on_edge(&mut self) {
        // Unreadable pin: drop the edge
        let released = match self.pin.is_high() {
            Ok(level) => level,
            Err(_) => return,
        };

        if released || self.edges == Edge::Both {
            self.registry.set(self.reason);
        }
    }
}

impl<'r, P, PIN> WakeSource for ButtonWakeup<'r, P, PIN>
where
    P: Waiter + Clock,
    PIN: InputPin,
{
    fn reason(&self) -> WakeReason {
        self.reason
    }

    fn configure(&mut self) -> Result<(), ConfigError> {
        // Edge interrupt is set up by the board when it hands over the pin
        Ok(())
    }
}
