//! Wake-up source producers
//!
//! Each producer owns one [`WakeReason`] bit. Sources whose condition can be
//! checked and cleared inside the interrupt handler set their bit directly.
//! The rest go through [`deferred`]: the handler only releases a semaphore and
//! a worker thread decides whether to set the bit.

pub mod button;
pub mod deferred;
pub mod i2c;
pub mod pwrctl;
pub mod rtc;
#[cfg(target_arch = "avr")]
pub mod serial_console;
pub mod uart;
pub mod wdt;

pub use button::{ButtonWakeup, Edge};
pub use deferred::{Confirm, IrqSignal, Worker};
pub use i2c::{Addressed, I2cSlave, I2cWakeup};
pub use pwrctl::{PowerWakeup, WakeLatch};
pub use rtc::{AlarmFlag, AlarmScheduler, RtcRearm, RtcWakeup};
#[cfg(target_arch = "avr")]
pub use serial_console::SerialConsole;
pub use uart::{CtsWakeSource, UartCtsWakeup};
pub use wdt::{WatchdogWake, WdtWakeup};

use crate::diagnostics::{Diagnostics, ErrorCode};
use crate::logger::{Console, Level, Logger};
use crate::wakeup::WakeReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The running hardware variant cannot wake on this source
    Unsupported,
    /// The peripheral rejected its wake-up setup
    Hardware,
}

/// Startup half of a producer
pub trait WakeSource {
    fn reason(&self) -> WakeReason;
    fn configure(&mut self) -> Result<(), ConfigError>;
}

/// Configure `source`, reporting a failure once. A source that fails here
/// never contributes bits.
pub fn config_wakeup<S, W>(
    source: &mut S,
    log: &mut Logger<W>,
    diag: &mut Diagnostics,
) -> Result<(), ConfigError>
where
    S: WakeSource + ?Sized,
    W: Console,
{
    let name = source.reason().name().unwrap_or("unknown");
    match source.configure() {
        Ok(()) => {
            log.debug(name);
            Ok(())
        }
        Err(ConfigError::Unsupported) => {
            diag.record(ErrorCode::ConfigurationUnsupported);
            if log.enabled(Level::Warn) {
                ufmt::uwriteln!(log.console_mut(), "Disable {} wake-up on this target", name).ok();
            }
            Err(ConfigError::Unsupported)
        }
        Err(ConfigError::Hardware) => {
            log.error("wake-up source setup failed:");
            log.error(name);
            Err(ConfigError::Hardware)
        }
    }
}
