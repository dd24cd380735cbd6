//! ATmega128 port
//!
//! There is no RTOS on this board. The main loop is the only thread and
//! parking it means sleeping until a producer notifies or the deadline
//! passes. With the `tickless` feature the sleep is the tickless idle hook in
//! power-save; without it the core idles with the tick running.

use core::time::Duration;

use portable_atomic::{AtomicBool, Ordering};

use super::{deadline_tick, Clock, OsError, Waiter};
use crate::config::IdleConfig;
use crate::hal::SysTick;

#[cfg(feature = "tickless")]
use super::IdleHook;
#[cfg(feature = "tickless")]
use crate::hal::{LpAlarm, LpTimer, Power};
#[cfg(feature = "tickless")]
use crate::rtos::TicklessIdle;
#[cfg(feature = "tickless")]
use avr_device::interrupt::{self, Mutex};
#[cfg(feature = "tickless")]
use core::cell::{Cell, RefCell};

#[cfg(feature = "tickless")]
pub type AvrIdle = TicklessIdle<SysTick, LpTimer, LpAlarm, Power>;

static WAKE_PENDING: AtomicBool = AtomicBool::new(false);

#[cfg(feature = "tickless")]
static IDLE: Mutex<RefCell<Option<AvrIdle>>> = Mutex::new(RefCell::new(None));
#[cfg(feature = "tickless")]
static DEEP_WAKE_HOOK: Mutex<Cell<Option<fn()>>> = Mutex::new(Cell::new(None));

/// A producer has notified since the thread last parked
#[inline]
pub fn wake_pending() -> bool {
    WAKE_PENDING.load(Ordering::Acquire)
}

/// Hand the idle hook to the port. Until this runs, `park` fails.
#[cfg(feature = "tickless")]
pub fn install_idle(idle: AvrIdle) {
    interrupt::free(|cs| {
        IDLE.borrow(cs).replace(Some(idle));
    });
}

/// Run `hook` after every idle period, once the core is back from
/// power-save. The power-down wake producer hangs off this.
#[cfg(feature = "tickless")]
pub fn on_deep_wake(hook: fn()) {
    interrupt::free(|cs| DEEP_WAKE_HOOK.borrow(cs).set(Some(hook)));
}

#[derive(Clone, Copy, Default)]
pub struct AvrPort;

impl AvrPort {
    fn us_per_tick() -> u64 {
        IdleConfig::new().us_per_tick()
    }

    #[cfg(feature = "tickless")]
    fn sleep(&self) -> Result<(), OsError> {
        // Out of the cell while sleeping: wake-up ISRs must not find it
        // borrowed
        let mut idle = interrupt::free(|cs| IDLE.borrow(cs).borrow_mut().take())
            .ok_or(OsError::Resource)?;
        idle.on_idle();
        let hook = interrupt::free(|cs| {
            IDLE.borrow(cs).replace(Some(idle));
            DEEP_WAKE_HOOK.borrow(cs).get()
        });
        if let Some(hook) = hook {
            hook();
        }
        Ok(())
    }

    #[cfg(not(feature = "tickless"))]
    fn sleep(&self) -> Result<(), OsError> {
        crate::hal::Power::new().enter_idle_mode();
        Ok(())
    }
}

impl Clock for AvrPort {
    fn now(&self) -> Duration {
        Duration::from_micros(SysTick::now().saturating_mul(Self::us_per_tick()))
    }
}

impl Waiter for AvrPort {
    fn notify(&self) {
        WAKE_PENDING.store(true, Ordering::Release);
    }

    fn park(&self, timeout: Option<Duration>) -> Result<(), OsError> {
        if WAKE_PENDING.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let deadline =
            timeout.map(|limit| deadline_tick(SysTick::now(), limit, Self::us_per_tick()));
        SysTick::set_deadline(deadline);

        let slept = self.sleep();

        SysTick::set_deadline(None);
        WAKE_PENDING.store(false, Ordering::Release);
        slept
    }
}
