//! ATmega128 peripherals behind the kernel port and the producers

pub mod gpio;
pub mod power;
pub mod timer;
pub mod uart;
pub mod watchdog;

pub use gpio::{board, Edge, ExtInt, Input, Pin};
pub use power::{Power, PowerSaveLatch, SleepMode};
pub use timer::{LpAlarm, LpTimer, RtcAlarm, SysTick};
pub use uart::Uart;
pub use watchdog::Watchdog;
