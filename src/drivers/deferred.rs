//! Two-stage producers for sources that cannot be resolved at interrupt level
//!
//! The interrupt stage ([`IrqSignal`]) only says "check me". The thread stage
//! ([`Worker`]) blocks on the semaphore, runs the source's [`Confirm`] logic
//! (polling, debouncing, re-arming) and owns the decision to set a bit.

use crate::logger::{Console, Logger};
use crate::os::{Clock, Timeout, Waiter};
use crate::rtos::{BinarySemaphore, EventRegistry, WaitError};

/// Thread-context half of a deferred producer
pub trait Confirm {
    fn confirm<P: Waiter + Clock>(&mut self, registry: &EventRegistry<P>) -> Result<(), &'static str>;
}

/// Interrupt-context half: hands the worker a token
pub struct IrqSignal<'s, P> {
    sem: &'s BinarySemaphore<P>,
}

impl<'s, P: Waiter + Clock> IrqSignal<'s, P> {
    pub const fn new(sem: &'s BinarySemaphore<P>) -> Self {
        Self { sem }
    }

    #[inline]
    pub fn raise(&self) {
        // Already pending: the worker has not run yet and will see this edge too
        self.sem.release().ok();
    }
}

pub struct Worker<'s, 'r, P, Q, C> {
    sem: &'s BinarySemaphore<P>,
    registry: &'r EventRegistry<Q>,
    check: C,
    failures: u32,
}

impl<'s, 'r, P, Q, C> Worker<'s, 'r, P, Q, C>
where
    P: Waiter + Clock,
    Q: Waiter + Clock,
    C: Confirm,
{
    pub fn new(sem: &'s BinarySemaphore<P>, registry: &'r EventRegistry<Q>, check: C) -> Self {
        Self {
            sem,
            registry,
            check,
            failures: 0,
        }
    }

    /// Wait for one signal and confirm it
    pub fn run_once<W: Console>(&mut self, log: &mut Logger<W>) -> Result<(), WaitError> {
        self.sem.acquire()?;
        self.service(log);
        Ok(())
    }

    /// Confirm a pending signal without blocking. For single-threaded
    /// boards that service workers from their main loop.
    pub fn poll<W: Console>(&mut self, log: &mut Logger<W>) -> bool {
        if self.sem.try_acquire(Timeout::Poll).is_err() {
            return false;
        }
        self.service(log);
        true
    }

    fn service<W: Console>(&mut self, log: &mut Logger<W>) {
        if let Err(msg) = self.check.confirm(self.registry) {
            self.failures = self.failures.wrapping_add(1);
            log.warn(msg);
        }
    }

    pub fn run<W: Console>(&mut self, log: &mut Logger<W>) -> ! {
        loop {
            if let Err(WaitError::Os(err)) = self.run_once(log) {
                log.os_error(err);
            }
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn check(&self) -> &C {
        &self.check
    }

    pub fn check_mut(&mut self) -> &mut C {
        &mut self.check
    }
}
