//! Host port backed by `std` threads, used for simulation and tests

use std::io::Write;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use super::{Clock, OsError, Waiter};
use crate::logger::Console;

/// Condition-variable parking spot with a wall clock
pub struct HostPort {
    epoch: Instant,
    notified: Mutex<bool>,
    wakeup: Condvar,
}

impl HostPort {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            notified: Mutex::new(false),
            wakeup: Condvar::new(),
        }
    }
}

impl Default for HostPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostPort {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

impl Waiter for HostPort {
    fn notify(&self) {
        // A poisoned lock means a producer thread panicked; the flag is still usable.
        let mut notified = match self.notified.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *notified = true;
        self.wakeup.notify_all();
    }

    fn park(&self, timeout: Option<Duration>) -> Result<(), OsError> {
        let mut notified = self.notified.lock().map_err(|_| OsError::Resource)?;
        if !*notified {
            notified = match timeout {
                Some(limit) => {
                    self.wakeup
                        .wait_timeout(notified, limit)
                        .map_err(|_| OsError::Resource)?
                        .0
                }
                None => self.wakeup.wait(notified).map_err(|_| OsError::Resource)?,
            };
        }
        *notified = false;
        Ok(())
    }
}

/// Console on the process stdout
#[derive(Default)]
pub struct StdoutConsole;

impl ufmt::uWrite for StdoutConsole {
    type Error = std::io::Error;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        std::io::stdout().write_all(s.as_bytes())
    }
}

impl Console for StdoutConsole {
    fn flush(&mut self) {
        std::io::stdout().flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn notify_before_park_is_not_lost() {
        let port = HostPort::new();
        port.notify();
        let start = Instant::now();
        port.park(None).unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn park_times_out() {
        let port = HostPort::new();
        let start = Instant::now();
        port.park(Some(Duration::from_millis(20))).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn notify_from_other_thread_wakes_parked_thread() {
        let port = Arc::new(HostPort::new());
        let remote = Arc::clone(&port);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.notify();
        });
        port.park(Some(Duration::from_secs(5))).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn clock_is_monotonic() {
        let port = HostPort::new();
        let a = port.now();
        let b = port.now();
        assert!(b >= a);
    }
}
