//! RTC alarm producer
//!
//! The alarm interrupt sets its bit directly, then hands off to a worker that
//! schedules the next alarm. Scheduling touches the calendar registers and
//! waits on the slow RTC clock domain, which is no work for an ISR.

use super::deferred::{Confirm, IrqSignal};
use super::{ConfigError, WakeSource};
use crate::config::RTC_ALARM_PERIOD_SECS;
use crate::os::{Clock, Waiter};
use crate::rtos::EventRegistry;
use crate::wakeup::WakeReason;

pub trait AlarmFlag {
    /// Read and clear the alarm interrupt flag
    fn take_alarm(&mut self) -> bool;
}

pub trait AlarmScheduler {
    type Error;

    /// Fire the alarm `secs` seconds from the current RTC time
    fn schedule_alarm(&mut self, secs: u32) -> Result<(), Self::Error>;
}

/// Interrupt half
pub struct RtcWakeup<'r, 's, P, Q, F> {
    flag: F,
    registry: &'r EventRegistry<P>,
    rearm: IrqSignal<'s, Q>,
}

impl<'r, 's, P, Q, F> RtcWakeup<'r, 's, P, Q, F>
where
    P: Waiter + Clock,
    Q: Waiter + Clock,
    F: AlarmFlag,
{
    pub fn new(flag: F, registry: &'r EventRegistry<P>, rearm: IrqSignal<'s, Q>) -> Self {
        Self {
            flag,
            registry,
            rearm,
        }
    }

    pub fn on_interrupt(&mut self) {
        if self.flag.take_alarm() {
            self.registry.set(WakeReason::RTC_ALARM);
        }
        // Re-arm even on a stray interrupt so the alarm chain never stalls
        self.rearm.raise();
    }
}

/// Worker half: keeps one alarm outstanding
pub struct RtcRearm<S> {
    scheduler: S,
    period_secs: u32,
    scheduled: u32,
}

impl<S: AlarmScheduler> RtcRearm<S> {
    pub fn new(scheduler: S) -> Self {
        Self::with_period(scheduler, RTC_ALARM_PERIOD_SECS)
    }

    pub fn with_period(scheduler: S, period_secs: u32) -> Self {
        Self {
            scheduler,
            period_secs,
            scheduled: 0,
        }
    }

    /// Alarms scheduled so far, including the first one
    pub fn scheduled(&self) -> u32 {
        self.scheduled
    }

    fn schedule(&mut self) -> Result<(), S::Error> {
        self.scheduler.schedule_alarm(self.period_secs)?;
        self.scheduled = self.scheduled.wrapping_add(1);
        Ok(())
    }
}

impl<S: AlarmScheduler> Confirm for RtcRearm<S> {
    fn confirm<P: Waiter + Clock>(&mut self, _registry: &EventRegistry<P>) -> Result<(), &'static str> {
        self.schedule().map_err(|_| "RTC alarm re-arm failed")
    }
}

impl<S: AlarmScheduler> WakeSource for RtcRearm<S> {
    fn reason(&self) -> WakeReason {
        WakeReason::RTC_ALARM
    }

    /// Schedules the first alarm
    fn configure(&mut self) -> Result<(), ConfigError> {
        self.schedule().map_err(|_| ConfigError::Hardware)
    }
}
