//! Kernel port
//!
//! The wake-up core never talks to an RTOS or to silicon directly. Everything
//! it borrows from the platform goes through the traits below, so the same
//! monitor runs on the ATmega128 port and on the host port used by tests.

use core::time::Duration;

#[cfg(target_arch = "avr")]
pub mod avr;
#[cfg(feature = "std")]
pub mod host;

/// How long a blocking primitive may suspend its caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// Check once, never block
    Poll,
    /// Block at most this long
    After(Duration),
    /// Block until signalled
    Forever,
}

impl Timeout {
    #[inline]
    pub const fn ms(ms: u64) -> Self {
        Timeout::After(Duration::from_millis(ms))
    }
}

/// Kernel primitive failure. Timeout is not a failure and has no variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OsError {
    Unknown,
    Resource,
    Parameter,
    Isr,
}

impl OsError {
    /// Status word as the kernel reports it
    pub const fn code(self) -> u32 {
        match self {
            OsError::Unknown => 0xFFFF_FFFF,
            OsError::Resource => 0xFFFF_FFFD,
            OsError::Parameter => 0xFFFF_FFFC,
            OsError::Isr => 0xFFFF_FFFA,
        }
    }
}

/// Monotonic time since boot
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Parking spot for the single thread that consumes a primitive.
///
/// `notify` must be callable from interrupt context. A `notify` that lands
/// before `park` makes the next `park` return at once. `park` may also return
/// spuriously; callers re-check their condition.
pub trait Waiter {
    fn notify(&self);
    fn park(&self, timeout: Option<Duration>) -> Result<(), OsError>;
}

/// The kernel's own periodic tick
pub trait TickSource {
    /// Stop the tick and return the ticks until the next kernel timer event,
    /// or 0 when nothing is pending.
    fn suspend_ticks(&mut self) -> u32;
    /// Restart the tick, advancing the tick counter by `elapsed` first.
    fn resume_ticks(&mut self, elapsed: u32);
}

/// Kernel tick at which a wait of `limit` starting at `now` ends, rounded up
/// to whole ticks
pub fn deadline_tick(now: u64, limit: Duration, us_per_tick: u64) -> u64 {
    let us = u64::try_from(limit.as_micros()).unwrap_or(u64::MAX);
    now.saturating_add(us.div_ceil(us_per_tick))
}

/// Ticks left until `deadline`, in the range a `TickSource` reports. No
/// deadline leaves the sleep bounded only by the idle hook.
pub fn ticks_until(now: u64, deadline: Option<u64>) -> u32 {
    match deadline {
        Some(at) => u32::try_from(at.saturating_sub(now)).unwrap_or(u32::MAX),
        None => u32::MAX,
    }
}

/// Free running timer that keeps counting in the deepest sleep state
pub trait LowPowerTimer {
    fn reset(&mut self);
    fn start(&mut self);
    fn stop(&mut self);
    fn elapsed_us(&self) -> u64;
}

/// One-shot wake-up alarm that survives the deepest sleep state
pub trait LowPowerAlarm {
    fn arm_oneshot(&mut self, after_us: u64);
    fn disarm(&mut self);
}

/// Deepest low-power state; returns on any enabled interrupt
pub trait DeepSleep {
    fn deep_sleep(&mut self);
}

/// Work the kernel runs when no thread is ready
pub trait IdleHook {
    fn on_idle(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_kernel_status_words() {
        assert_eq!(OsError::Resource.code(), 0xFFFF_FFFD);
        assert_eq!(OsError::Parameter.code(), 0xFFFF_FFFC);
        assert_eq!(OsError::Isr.code(), 0xFFFF_FFFA);
        assert_eq!(OsError::Unknown.code(), u32::MAX);
    }

    #[test]
    fn deadline_past_the_32_bit_tick_range_still_leaves_a_sleep() {
        let now = u32::MAX as u64 - 50;
        let at = deadline_tick(now, Duration::from_millis(100), 1000);

        assert_eq!(at, u32::MAX as u64 + 50);
        assert_eq!(ticks_until(now, Some(at)), 100);
        assert_eq!(ticks_until(at - 1, Some(at)), 1);
        assert_eq!(ticks_until(at, Some(at)), 0);
    }

    #[test]
    fn partial_ticks_round_up_and_long_waits_saturate() {
        assert_eq!(deadline_tick(7, Duration::from_micros(1), 1000), 8);
        assert_eq!(deadline_tick(7, Duration::ZERO, 1000), 7);
        assert_eq!(ticks_until(0, Some(u64::MAX)), u32::MAX);
        assert_eq!(ticks_until(0, None), u32::MAX);
        assert_eq!(deadline_tick(u64::MAX - 1, Duration::from_secs(1), 1000), u64::MAX);
    }

    #[test]
    fn ms_timeout() {
        assert_eq!(Timeout::ms(100), Timeout::After(Duration::from_millis(100)));
    }
}
