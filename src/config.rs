//! Configuration constants for the wake-up firmware

use core::num::NonZeroU64;
use core::time::Duration;

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// Console UART baud rate
pub const UART_BAUD: u32 = 9600;

/// OS tick frequency in Hz
pub const OS_TICK_HZ: u32 = 1000;

/// Microseconds per second
pub const US_PER_SEC: u64 = 1_000_000;

/// Counting range of the low-power timeout timer in microseconds
pub const LP_TIMER_RANGE_US: u64 = i32::MAX as u64;

/// How long the monitor waits for a deferred wake-up source to surface.
///
/// Tuned against observed latency of the power-down wake latch; boards with a
/// slower latch need a wider window.
pub const RESOLVE_WINDOW_MS: u64 = 100;

/// Bus silence that ends an I2C traffic burst
pub const I2C_QUIET_WINDOW_US: u64 = 5000;

/// I2C slave address answered while asleep
pub const I2C_SLAVE_ADDR: u8 = 0x90;

/// I2C transfer buffer length
pub const I2C_BUFFER_LEN: usize = 32;

/// Seconds between RTC alarms
pub const RTC_ALARM_PERIOD_SECS: u32 = 3;

/// Disambiguation loop settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WakeupConfig {
    /// Upper bound for each of the two resolve waits
    pub resolve_window: Duration,
}

impl WakeupConfig {
    pub const fn new() -> Self {
        Self {
            resolve_window: Duration::from_millis(RESOLVE_WINDOW_MS),
        }
    }

    pub const fn with_resolve_window(mut self, window: Duration) -> Self {
        self.resolve_window = window;
        self
    }
}

impl Default for WakeupConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Tickless idle settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdleConfig {
    tick_hz: u32,
    us_per_tick: NonZeroU64,
    timer_range_us: u64,
}

/// Tick rate that is zero or too fast to last a whole microsecond
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickRateError(pub u32);

const DEFAULT_US_PER_TICK: NonZeroU64 = match NonZeroU64::new(US_PER_SEC / OS_TICK_HZ as u64) {
    Some(us) => us,
    None => panic!("OS_TICK_HZ above 1 MHz"),
};

impl IdleConfig {
    pub const fn new() -> Self {
        Self {
            tick_hz: OS_TICK_HZ,
            us_per_tick: DEFAULT_US_PER_TICK,
            timer_range_us: LP_TIMER_RANGE_US,
        }
    }

    pub const fn with_rates(tick_hz: u32, timer_range_us: u64) -> Result<Self, TickRateError> {
        if tick_hz == 0 {
            return Err(TickRateError(tick_hz));
        }
        match NonZeroU64::new(US_PER_SEC / tick_hz as u64) {
            Some(us_per_tick) => Ok(Self {
                tick_hz,
                us_per_tick,
                timer_range_us,
            }),
            None => Err(TickRateError(tick_hz)),
        }
    }

    pub const fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    pub const fn timer_range_us(&self) -> u64 {
        self.timer_range_us
    }

    #[inline]
    pub const fn us_per_tick(&self) -> u64 {
        self.us_per_tick.get()
    }

    /// Longest sleep the timeout timer can count, rounded down to whole ticks
    #[inline]
    pub const fn max_sleep_us(&self) -> u64 {
        let per_tick = self.us_per_tick();
        (self.timer_range_us / per_tick) * per_tick
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self::new()
    }
}
