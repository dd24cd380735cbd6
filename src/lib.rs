//! Wake-up source aggregation and tickless idle
//!
//! Interrupt handlers and worker threads OR wake-up bits into an
//! [`EventRegistry`](rtos::EventRegistry). A single [`WakeupMonitor`] waits on
//! it, works out whether the core came out of shallow or deep sleep and
//! reports every cause. The [`TicklessIdle`](rtos::TicklessIdle) hook keeps
//! the core in its deepest sleep state between events without losing kernel
//! time.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

pub mod application;
pub mod config;
pub mod diagnostics;
pub mod drivers;
#[cfg(target_arch = "avr")]
pub mod hal;
pub mod logger;
pub mod os;
pub mod rtos;
#[cfg(any(test, feature = "std"))]
pub mod testing;
pub mod wakeup;

pub use application::WakeupMonitor;
pub use config::{IdleConfig, TickRateError, WakeupConfig};
pub use logger::{Console, Level, Logger};
pub use os::{OsError, Timeout};
pub use rtos::{BinarySemaphore, EventRegistry, WaitError};
pub use wakeup::{Classification, SleepDepth, WakeReason};
