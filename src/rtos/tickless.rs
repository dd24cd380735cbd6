//! Tickless idle
//!
//! Installed as the kernel idle hook. Stops the OS tick, sleeps in the deepest
//! state until the next kernel timer event (or any wake-up interrupt), then
//! hands the kernel exactly the ticks that really passed. No tick interrupt
//! fires while asleep, so the kernel counter only moves through
//! `resume_ticks`.

use crate::config::IdleConfig;
use crate::os::{DeepSleep, IdleHook, LowPowerAlarm, LowPowerTimer, TickSource};

/// Tick ledger of one idle period
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdleBudget {
    /// Ticks until the next kernel timer event when the tick was suspended
    pub ticks_requested: u32,
    /// Ticks credited back to the kernel on resume
    pub ticks_elapsed: u32,
}

pub struct TicklessIdle<K, T, A, S> {
    kernel: K,
    timer: T,
    alarm: A,
    sleep: S,
    config: IdleConfig,
}

impl<K, T, A, S> TicklessIdle<K, T, A, S>
where
    K: TickSource,
    T: LowPowerTimer,
    A: LowPowerAlarm,
    S: DeepSleep,
{
    pub fn new(kernel: K, timer: T, alarm: A, sleep: S, config: IdleConfig) -> Self {
        Self {
            kernel,
            timer,
            alarm,
            sleep,
            config,
        }
    }

    /// Run one idle period and return its ledger
    pub fn idle(&mut self) -> IdleBudget {
        let us_per_tick = self.config.us_per_tick();
        let ticks_requested = self.kernel.suspend_ticks();
        let mut ticks_elapsed = 0;

        if ticks_requested != 0 {
            let us_to_sleep =
                (ticks_requested as u64 * us_per_tick).min(self.config.max_sleep_us());

            self.timer.reset();
            self.timer.start();
            // Fallback wake-up if no source fires first
            self.alarm.arm_oneshot(us_to_sleep);

            self.sleep.deep_sleep();

            // Woken by the alarm or by any wake-up source
            let us_asleep = self.timer.elapsed_us();
            self.timer.stop();
            self.alarm.disarm();

            ticks_elapsed = (us_asleep / us_per_tick) as u32;
        }

        self.kernel.resume_ticks(ticks_elapsed);

        IdleBudget {
            ticks_requested,
            ticks_elapsed,
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

impl<K, T, A, S> IdleHook for TicklessIdle<K, T, A, S>
where
    K: TickSource,
    T: LowPowerTimer,
    A: LowPowerAlarm,
    S: DeepSleep,
{
    fn on_idle(&mut self) {
        self.idle();
    }
}
