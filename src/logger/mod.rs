//! Console logging and wake-up reports

use ufmt::{uDisplay, uWrite, uwrite, uwriteln, Formatter};

use crate::os::OsError;
use crate::wakeup::Classification;

/// Byte sink the logger writes to, usually a UART
pub trait Console: uWrite {
    /// Drain any buffered output to the wire. Called before sleeping so the
    /// transmitter is idle when clocks stop.
    fn flush(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl Level {
    const fn prefix(self) -> &'static str {
        match self {
            Level::Error => "[ERR] ",
            Level::Warn => "[WRN] ",
            Level::Info => "[INF] ",
            Level::Debug => "[DBG] ",
        }
    }
}

/// Fixed width `0xXXXXXXXX`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hex(pub u32);

impl uDisplay for Hex {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";
        let mut buf = *b"0x00000000";
        for (i, slot) in buf[2..].iter_mut().enumerate() {
            let nibble = (self.0 >> (28 - 4 * i)) & 0xF;
            *slot = HEX_CHARS[nibble as usize];
        }
        // Only ASCII went into the buffer
        match core::str::from_utf8(&buf) {
            Ok(s) => f.write_str(s),
            Err(_) => Ok(()),
        }
    }
}

pub struct Logger<W> {
    console: W,
    level: Level,
}

impl<W: Console> Logger<W> {
    pub fn new(console: W) -> Self {
        let level = if cfg!(feature = "debug") {
            Level::Debug
        } else {
            Level::Info
        };
        Self { console, level }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn log(&mut self, level: Level, msg: &str) {
        if self.enabled(level) {
            uwriteln!(self.console, "{}{}", level.prefix(), msg).ok();
        }
    }

    pub fn error(&mut self, msg: &str) {
        self.log(Level::Error, msg);
    }

    pub fn warn(&mut self, msg: &str) {
        self.log(Level::Warn, msg);
    }

    pub fn info(&mut self, msg: &str) {
        self.log(Level::Info, msg);
    }

    pub fn debug(&mut self, msg: &str) {
        self.log(Level::Debug, msg);
    }

    /// Message followed by a hex value, e.g. register contents
    pub fn log_hex(&mut self, level: Level, msg: &str, val: u32) {
        if self.enabled(level) {
            uwriteln!(self.console, "{}{}{}", level.prefix(), msg, Hex(val)).ok();
        }
    }

    pub fn os_error(&mut self, err: OsError) {
        self.log_hex(Level::Error, "OS error code: ", err.code());
    }

    /// One line per identified reason
    pub fn report(&mut self, classification: &Classification) {
        for (_, name) in classification.reasons.each() {
            uwriteln!(
                self.console,
                "Wake up by {} from {}",
                name,
                classification.depth
            )
            .ok();
        }
    }

    /// Unprefixed text, not subject to the level filter
    pub fn write_line(&mut self, msg: &str) {
        uwrite!(self.console, "{}\n", msg).ok();
    }

    pub fn flush(&mut self) {
        self.console.flush();
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut W {
        &mut self.console
    }

    pub fn into_inner(self) -> W {
        self.console
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryConsole;
    use crate::wakeup::{SleepDepth, WakeReason};

    fn logger() -> Logger<MemoryConsole> {
        Logger::new(MemoryConsole::default()).with_level(Level::Info)
    }

    #[test]
    fn hex_is_fixed_width_uppercase() {
        let mut log = logger();
        log.log_hex(Level::Info, "val=", 0xBEEF);
        assert_eq!(log.console().text(), "[INF] val=0x0000BEEF\n");
    }

    #[test]
    fn os_error_line() {
        let mut log = logger();
        log.os_error(OsError::Resource);
        assert_eq!(log.console().text(), "[ERR] OS error code: 0xFFFFFFFD\n");
    }

    #[test]
    fn debug_is_filtered_at_info() {
        let mut log = logger();
        log.debug("hidden");
        log.warn("shown");
        assert_eq!(log.console().text(), "[WRN] shown\n");
    }

    #[test]
    fn report_lists_each_reason_in_bit_order() {
        let mut log = logger();
        log.report(&Classification {
            reasons: WakeReason::RTC_ALARM | WakeReason::BUTTON1,
            depth: SleepDepth::Deep,
        });
        assert_eq!(
            log.console().text(),
            "Wake up by Button1 from deep sleep\nWake up by RTC alarm from deep sleep\n"
        );
    }

    #[test]
    fn flush_reaches_the_console() {
        let mut log = logger();
        log.flush();
        assert_eq!(log.console().flushes(), 1);
    }
}
