//! Host-side test doubles for the kernel port and the console

use std::cell::Cell;
use std::string::String;
use std::time::Duration;

use crate::logger::Console;
use crate::os::{Clock, OsError, Waiter};

/// Single-threaded port with a virtual clock.
///
/// A bounded `park` jumps the clock to the end of its timeout unless a
/// `notify` is pending. An unbounded `park` with nothing pending can never
/// return in a single thread, so it reports `Resource` instead.
pub struct SimPort {
    now: Cell<Duration>,
    notified: Cell<bool>,
    parks: Cell<u32>,
    fault: Option<OsError>,
}

impl SimPort {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            notified: Cell::new(false),
            parks: Cell::new(0),
            fault: None,
        }
    }

    /// Port whose every `park` fails with `err`
    pub fn failing(err: OsError) -> Self {
        Self {
            fault: Some(err),
            ..Self::new()
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn parks(&self) -> u32 {
        self.parks.get()
    }
}

impl Default for SimPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimPort {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl Waiter for SimPort {
    fn notify(&self) {
        self.notified.set(true);
    }

    fn park(&self, timeout: Option<Duration>) -> Result<(), OsError> {
        self.parks.set(self.parks.get() + 1);
        if let Some(err) = self.fault {
            return Err(err);
        }
        if self.notified.replace(false) {
            return Ok(());
        }
        match timeout {
            Some(limit) => {
                self.advance(limit);
                Ok(())
            }
            None => Err(OsError::Resource),
        }
    }
}

/// Clock that ticks forward by a fixed step on every read, for code that
/// polls until a time window closes
pub struct SteppingClock {
    now: Cell<Duration>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// Console that keeps everything written to it
#[derive(Default)]
pub struct MemoryConsole {
    text: String,
    flushes: u32,
}

impl MemoryConsole {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn flushes(&self) -> u32 {
        self.flushes
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

impl ufmt::uWrite for MemoryConsole {
    type Error = core::convert::Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.text.push_str(s);
        Ok(())
    }
}

impl Console for MemoryConsole {
    fn flush(&mut self) {
        self.flushes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_park_advances_virtual_time() {
        let port = SimPort::new();
        port.park(Some(Duration::from_millis(100))).unwrap();
        assert_eq!(port.now(), Duration::from_millis(100));
    }

    #[test]
    fn pending_notify_short_circuits_park() {
        let port = SimPort::new();
        port.notify();
        port.park(Some(Duration::from_millis(100))).unwrap();
        assert_eq!(port.now(), Duration::ZERO);
        assert_eq!(port.parks(), 1);
    }

    #[test]
    fn stepping_clock_moves_on_each_read() {
        let clock = SteppingClock::new(Duration::from_micros(500));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_micros(500));
    }
}
