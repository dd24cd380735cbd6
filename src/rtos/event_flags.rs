//! Wake-up event registry
//!
//! A single byte of wake-up bits shared between interrupt handlers, worker
//! threads and the one thread that consumes them. Producers only ever OR in
//! the bit they own, so `set` is a lone atomic RMW and never needs a lock.
//! The consumer is the only party that clears bits.

use portable_atomic::{AtomicU8, Ordering};
use core::time::Duration;

use crate::os::{Clock, OsError, Timeout, Waiter};
use crate::wakeup::WakeReason;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitError {
    /// Nothing arrived within the timeout. Routine, not a fault.
    Timeout,
    Os(OsError),
}

impl From<OsError> for WaitError {
    fn from(err: OsError) -> Self {
        WaitError::Os(err)
    }
}

pub struct EventRegistry<P> {
    flags: AtomicU8,
    port: P,
}

impl<P: Waiter + Clock> EventRegistry<P> {
    pub const fn new(port: P) -> Self {
        Self {
            flags: AtomicU8::new(0),
            port,
        }
    }

    /// OR `bits` into the registry and wake the consumer.
    ///
    /// Safe from interrupt context. Returns the flags after the update.
    #[inline]
    pub fn set(&self, bits: WakeReason) -> WakeReason {
        let prev = self.flags.fetch_or(bits.bits(), Ordering::AcqRel);
        self.port.notify();
        WakeReason::from_bits_retain(prev | bits.bits())
    }

    #[inline]
    pub fn get(&self) -> WakeReason {
        WakeReason::from_bits_retain(self.flags.load(Ordering::Acquire))
    }

    /// Clear `bits`, returning the flags as they were before
    #[inline]
    pub fn clear(&self, bits: WakeReason) -> WakeReason {
        WakeReason::from_bits_retain(self.flags.fetch_and(!bits.bits(), Ordering::AcqRel))
    }

    #[inline]
    pub fn clear_all(&self) -> WakeReason {
        self.clear(WakeReason::ALL)
    }

    /// Kernel port the registry parks its consumer on
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Block until any bit of `mask` is set.
    ///
    /// Returns the pending subset of `mask`. With `clear`, exactly those bits
    /// are removed in the same atomic step that observed them; bits set later
    /// stay for the next wait.
    pub fn wait_any(
        &self,
        mask: WakeReason,
        timeout: Timeout,
        clear: bool,
    ) -> Result<WakeReason, WaitError> {
        self.wait(mask, timeout, |flags| {
            let hit = flags & mask.bits();
            (hit != 0).then_some(hit)
        }, clear)
    }

    /// Block until every bit of `mask` is set
    pub fn wait_all(
        &self,
        mask: WakeReason,
        timeout: Timeout,
        clear: bool,
    ) -> Result<WakeReason, WaitError> {
        self.wait(mask, timeout, |flags| {
            (flags & mask.bits() == mask.bits()).then_some(mask.bits())
        }, clear)
    }

    fn wait<F>(
        &self,
        mask: WakeReason,
        timeout: Timeout,
        ready: F,
        clear: bool,
    ) -> Result<WakeReason, WaitError>
    where
        F: Fn(u8) -> Option<u8>,
    {
        if mask.is_empty() {
            return Err(WaitError::Os(OsError::Parameter));
        }

        let deadline = match timeout {
            Timeout::After(limit) => Some(self.port.now() + limit),
            _ => None,
        };

        loop {
            if let Some(hit) = self.take(&ready, clear) {
                return Ok(WakeReason::from_bits_retain(hit));
            }

            let remaining = match (timeout, deadline) {
                (Timeout::Poll, _) => return Err(WaitError::Timeout),
                (_, Some(deadline)) => match time_left(deadline, self.port.now()) {
                    Some(left) => Some(left),
                    None => return Err(WaitError::Timeout),
                },
                _ => None,
            };

            self.port.park(remaining)?;
        }
    }

    fn take<F>(&self, ready: &F, clear: bool) -> Option<u8>
    where
        F: Fn(u8) -> Option<u8>,
    {
        if !clear {
            return ready(self.flags.load(Ordering::Acquire));
        }

        let mut current = self.flags.load(Ordering::Acquire);
        loop {
            let hit = ready(current)?;
            match self.flags.compare_exchange_weak(
                current,
                current & !hit,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(hit),
                Err(actual) => current = actual,
            }
        }
    }
}

fn time_left(deadline: Duration, now: Duration) -> Option<Duration> {
    deadline.checked_sub(now).filter(|left| !left.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimPort;

    fn registry() -> EventRegistry<SimPort> {
        EventRegistry::new(SimPort::new())
    }

    #[test]
    fn wait_any_returns_exactly_the_pending_subset_and_clears_it() {
        let reg = registry();
        for bits in 1..=u8::MAX {
            let subset = WakeReason::from_bits_retain(bits);
            reg.set(subset);
            let got = reg.wait_any(WakeReason::ALL, Timeout::Forever, true);
            assert_eq!(got, Ok(subset));
            assert!(reg.get().is_empty());
        }
    }

    #[test]
    fn clear_on_return_only_removes_masked_bits() {
        let reg = registry();
        reg.set(WakeReason::BUTTON1 | WakeReason::RTC_ALARM);
        let got = reg.wait_any(WakeReason::BUTTON1, Timeout::Poll, true);
        assert_eq!(got, Ok(WakeReason::BUTTON1));
        assert_eq!(reg.get(), WakeReason::RTC_ALARM);
    }

    #[test]
    fn wait_without_clear_keeps_bits() {
        let reg = registry();
        reg.set(WakeReason::UART_CTS);
        assert_eq!(
            reg.wait_any(WakeReason::ALL, Timeout::Poll, false),
            Ok(WakeReason::UART_CTS)
        );
        assert_eq!(reg.get(), WakeReason::UART_CTS);
    }

    #[test]
    fn set_is_idempotent() {
        let reg = registry();
        reg.set(WakeReason::BUTTON2);
        reg.set(WakeReason::BUTTON2);
        reg.set(WakeReason::BUTTON2);
        assert_eq!(reg.get(), WakeReason::BUTTON2);
        assert_eq!(
            reg.wait_any(WakeReason::ALL, Timeout::Poll, true),
            Ok(WakeReason::BUTTON2)
        );
        assert_eq!(
            reg.wait_any(WakeReason::ALL, Timeout::Poll, true),
            Err(WaitError::Timeout)
        );
    }

    #[test]
    fn poll_on_empty_registry_times_out_without_parking() {
        let reg = registry();
        assert_eq!(
            reg.wait_any(WakeReason::ALL, Timeout::Poll, true),
            Err(WaitError::Timeout)
        );
        assert_eq!(reg.port.parks(), 0);
    }

    #[test]
    fn bounded_wait_times_out_after_the_window() {
        let reg = registry();
        let got = reg.wait_any(WakeReason::UNIDENTIFIED, Timeout::ms(100), true);
        assert_eq!(got, Err(WaitError::Timeout));
        assert_eq!(reg.port.now(), Duration::from_millis(100));
    }

    #[test]
    fn unrelated_bits_do_not_satisfy_the_wait() {
        let reg = registry();
        reg.set(WakeReason::BUTTON1);
        let got = reg.wait_any(WakeReason::UNIDENTIFIED, Timeout::ms(100), true);
        assert_eq!(got, Err(WaitError::Timeout));
        assert_eq!(reg.get(), WakeReason::BUTTON1);
    }

    #[test]
    fn empty_mask_is_a_parameter_error() {
        let reg = registry();
        assert_eq!(
            reg.wait_any(WakeReason::empty(), Timeout::Forever, true),
            Err(WaitError::Os(OsError::Parameter))
        );
    }

    #[test]
    fn park_failure_surfaces_as_os_error() {
        let reg = EventRegistry::new(SimPort::failing(OsError::Resource));
        assert_eq!(
            reg.wait_any(WakeReason::ALL, Timeout::Forever, true),
            Err(WaitError::Os(OsError::Resource))
        );
    }

    #[test]
    fn wait_all_needs_every_bit() {
        let reg = registry();
        let mask = WakeReason::BUTTON1 | WakeReason::BUTTON2;
        reg.set(WakeReason::BUTTON1);
        assert_eq!(reg.wait_all(mask, Timeout::Poll, true), Err(WaitError::Timeout));
        assert_eq!(reg.get(), WakeReason::BUTTON1);

        reg.set(WakeReason::BUTTON2 | WakeReason::RTC_ALARM);
        assert_eq!(reg.wait_all(mask, Timeout::Poll, true), Ok(mask));
        assert_eq!(reg.get(), WakeReason::RTC_ALARM);
    }

    #[test]
    fn clear_reports_previous_flags() {
        let reg = registry();
        reg.set(WakeReason::WDT_TIMEOUT | WakeReason::LP_TICKER);
        let prev = reg.clear(WakeReason::WDT_TIMEOUT);
        assert_eq!(prev, WakeReason::WDT_TIMEOUT | WakeReason::LP_TICKER);
        assert_eq!(reg.clear_all(), WakeReason::LP_TICKER);
        assert!(reg.get().is_empty());
    }
}
