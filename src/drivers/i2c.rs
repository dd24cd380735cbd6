//! I2C address-match producer
//!
//! The wake-up interrupt only says "there is traffic". The worker then serves
//! the bus as a slave until it has been quiet for a whole window, asserting
//! its bit once for the burst.

use core::time::Duration;

use super::deferred::Confirm;
use super::{ConfigError, WakeSource};
use crate::config::{I2C_BUFFER_LEN, I2C_QUIET_WINDOW_US, I2C_SLAVE_ADDR};
use crate::os::{Clock, Waiter};
use crate::rtos::EventRegistry;
use crate::wakeup::WakeReason;

/// Direction the master addressed us in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Addressed {
    /// Master reads, we transmit
    Read,
    /// Master writes, we receive
    Write,
}

pub trait I2cSlave {
    type Error;

    fn set_address(&mut self, addr: u8) -> Result<(), Self::Error>;
    /// Poll for an address match. Also re-enables the slave interrupt the
    /// wake-up path may have masked.
    fn listen(&mut self) -> nb::Result<Addressed, Self::Error>;
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}

pub struct I2cWakeup<I, C> {
    slave: I,
    clock: C,
    quiet: Duration,
    buf: [u8; I2C_BUFFER_LEN],
    bursts: u32,
}

impl<I: I2cSlave, C: Clock> I2cWakeup<I, C> {
    pub fn new(slave: I, clock: C) -> Self {
        Self {
            slave,
            clock,
            quiet: Duration::from_micros(I2C_QUIET_WINDOW_US),
            buf: [0; I2C_BUFFER_LEN],
            bursts: 0,
        }
    }

    pub fn with_quiet_window(mut self, quiet: Duration) -> Self {
        self.quiet = quiet;
        self
    }

    /// Bursts that asserted the bit
    pub fn bursts(&self) -> u32 {
        self.bursts
    }

    /// Last data received from, or next data served to, the master
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn transfer(&mut self, dir: Addressed) -> Result<(), I::Error> {
        match dir {
            Addressed::Read => self.slave.write(&self.buf),
            Addressed::Write => self.slave.read(&mut self.buf),
        }
    }
}

impl<I: I2cSlave, C: Clock> Confirm for I2cWakeup<I, C> {
    fn confirm<P: Waiter + Clock>(&mut self, registry: &EventRegistry<P>) -> Result<(), &'static str> {
        let mut asserted = false;
        let mut faulted = false;
        let mut last_traffic = self.clock.now();

        while self.clock.now().saturating_sub(last_traffic) < self.quiet {
            let dir = match self.slave.listen() {
                Ok(dir) => dir,
                Err(nb::Error::WouldBlock) => continue,
                Err(nb::Error::Other(_)) => {
                    faulted = true;
                    continue;
                }
            };

            if !asserted {
                asserted = true;
                self.bursts = self.bursts.wrapping_add(1);
                registry.set(WakeReason::I2C_ADDR_MATCH);
            }

            if self.transfer(dir).is_err() {
                faulted = true;
            }
            last_traffic = self.clock.now();
        }

        if faulted {
            Err("I2C slave transfer failed")
        } else {
            Ok(())
        }
    }
}

impl<I: I2cSlave, C: Clock> WakeSource for I2cWakeup<I, C> {
    fn reason(&self) -> WakeReason {
        WakeReason::I2C_ADDR_MATCH
    }

    fn configure(&mut self) -> Result<(), ConfigError> {
        self.slave
            .set_address(I2C_SLAVE_ADDR)
            .map_err(|_| ConfigError::Hardware)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SimPort, SteppingClock};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Bus {
        script: VecDeque<nb::Result<Addressed, ()>>,
        address: Option<u8>,
        served: usize,
        received: usize,
        polls: usize,
    }

    impl Bus {
        fn with(script: impl IntoIterator<Item = nb::Result<Addressed, ()>>) -> Self {
            Self {
                script: script.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl I2cSlave for Bus {
        type Error = ();

        fn set_address(&mut self, addr: u8) -> Result<(), ()> {
            self.address = Some(addr);
            Ok(())
        }

        fn listen(&mut self) -> nb::Result<Addressed, ()> {
            self.polls += 1;
            self.script.pop_front().unwrap_or(Err(nb::Error::WouldBlock))
        }

        fn write(&mut self, data: &[u8]) -> Result<(), ()> {
            self.served += data.len();
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<(), ()> {
            buf.fill(0xA5);
            self.received += buf.len();
            Ok(())
        }
    }

    fn worker(bus: Bus) -> I2cWakeup<Bus, SteppingClock> {
        I2cWakeup::new(bus, SteppingClock::new(Duration::from_micros(1000)))
    }

    #[test]
    fn configure_sets_slave_address() {
        let mut i2c = worker(Bus::default());
        i2c.configure().unwrap();
        assert_eq!(i2c.slave.address, Some(0x90));
    }

    #[test]
    fn burst_asserts_once_and_serves_every_transaction() {
        let registry = EventRegistry::new(SimPort::new());
        let mut i2c = worker(Bus::with([
            Ok(Addressed::Write),
            Err(nb::Error::WouldBlock),
            Ok(Addressed::Read),
            Ok(Addressed::Write),
        ]));

        assert_eq!(i2c.confirm(&registry), Ok(()));

        assert_eq!(registry.get(), WakeReason::I2C_ADDR_MATCH);
        assert_eq!(i2c.bursts(), 1);
        assert_eq!(i2c.slave.served, 32);
        assert_eq!(i2c.slave.received, 64);
        assert!(i2c.buffer().iter().all(|&b| b == 0xA5));
    }

    #[test]
    fn quiet_bus_returns_without_asserting() {
        let registry = EventRegistry::new(SimPort::new());
        let mut i2c = worker(Bus::default());

        assert_eq!(i2c.confirm(&registry), Ok(()));

        assert!(registry.get().is_empty());
        assert_eq!(i2c.bursts(), 0);
        // Clock steps 1 ms per read; window is 5 ms
        assert!(i2c.slave.polls <= 5);
    }

    #[test]
    fn each_burst_is_counted_separately() {
        let registry = EventRegistry::new(SimPort::new());
        let mut i2c = worker(Bus::with([Ok(Addressed::Read)]));
        i2c.confirm(&registry).unwrap();

        i2c.slave.script.push_back(Ok(Addressed::Read));
        i2c.confirm(&registry).unwrap();

        assert_eq!(i2c.bursts(), 2);
    }

    #[test]
    fn bus_error_is_reported_after_the_window() {
        let registry = EventRegistry::new(SimPort::new());
        let mut i2c = worker(Bus::with([Err(nb::Error::Other(()))]));

        assert_eq!(i2c.confirm(&registry), Err("I2C slave transfer failed"));
        assert!(registry.get().is_empty());
    }
}
