//! Binary semaphore for deferring interrupt work to a thread

use portable_atomic::{AtomicBool, Ordering};

use super::event_flags::WaitError;
use crate::os::{Clock, OsError, Timeout, Waiter};

/// Count capped at one. Releases that arrive while a token is pending
/// coalesce into it.
pub struct BinarySemaphore<P> {
    token: AtomicBool,
    port: P,
}

impl<P: Waiter + Clock> BinarySemaphore<P> {
    pub const fn new(port: P) -> Self {
        Self {
            token: AtomicBool::new(false),
            port,
        }
    }

    /// Hand out the token. Safe from interrupt context.
    ///
    /// Fails with `Resource` when a token is already pending.
    pub fn release(&self) -> Result<(), OsError> {
        if self.token.swap(true, Ordering::AcqRel) {
            return Err(OsError::Resource);
        }
        self.port.notify();
        Ok(())
    }

    /// Block until the token is available and take it
    pub fn acquire(&self) -> Result<(), WaitError> {
        self.try_acquire(Timeout::Forever)
    }

    pub fn try_acquire(&self, timeout: Timeout) -> Result<(), WaitError> {
        let deadline = match timeout {
            Timeout::After(limit) => Some(self.port.now() + limit),
            _ => None,
        };

        loop {
            if self.token.swap(false, Ordering::AcqRel) {
                return Ok(());
            }

            let remaining = match timeout {
                Timeout::Poll => return Err(WaitError::Timeout),
                Timeout::Forever => None,
                Timeout::After(_) => {
                    let now = self.port.now();
                    match deadline.and_then(|d| d.checked_sub(now)) {
                        Some(left) if !left.is_zero() => Some(left),
                        _ => return Err(WaitError::Timeout),
                    }
                }
            };

            self.port.park(remaining)?;
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.token.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimPort;
    use core::time::Duration;

    #[test]
    fn release_then_acquire() {
        let sem = BinarySemaphore::new(SimPort::new());
        sem.release().unwrap();
        assert!(sem.is_pending());
        assert_eq!(sem.acquire(), Ok(()));
        assert!(!sem.is_pending());
    }

    #[test]
    fn second_release_coalesces() {
        let sem = BinarySemaphore::new(SimPort::new());
        assert_eq!(sem.release(), Ok(()));
        assert_eq!(sem.release(), Err(OsError::Resource));
        assert_eq!(sem.try_acquire(Timeout::Poll), Ok(()));
        assert_eq!(sem.try_acquire(Timeout::Poll), Err(WaitError::Timeout));
    }

    #[test]
    fn bounded_acquire_times_out() {
        let port = SimPort::new();
        let sem = BinarySemaphore::new(port);
        assert_eq!(sem.try_acquire(Timeout::ms(5)), Err(WaitError::Timeout));
        assert_eq!(sem.port.now(), Duration::from_millis(5));
    }

    #[test]
    fn acquire_with_nothing_to_wake_it_reports_the_port_error() {
        let sem = BinarySemaphore::new(SimPort::new());
        assert_eq!(sem.acquire(), Err(WaitError::Os(OsError::Resource)));
    }
}
