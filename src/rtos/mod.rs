//! Kernel-side primitives of the wake-up core

pub mod event_flags;
pub mod semaphore;
#[cfg(feature = "tickless")]
pub mod tickless;

pub use event_flags::{EventRegistry, WaitError};
pub use semaphore::BinarySemaphore;
#[cfg(feature = "tickless")]
pub use tickless::{IdleBudget, TicklessIdle};
