//! Wake-up reasons and the sleep classification derived from them

use bitflags::bitflags;
use ufmt::{uDisplay, uWrite, Formatter};

bitflags! {
    /// One bit per physical wake-up source. Each producer owns exactly one bit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct WakeReason: u8 {
        const BUTTON1 = 1 << 0;
        const BUTTON2 = 1 << 1;
        const LP_TICKER = 1 << 2;
        const WDT_TIMEOUT = 1 << 3;
        const RTC_ALARM = 1 << 4;
        const UART_CTS = 1 << 5;
        const I2C_ADDR_MATCH = 1 << 6;
        /// Left power-down, cause not yet known
        const UNIDENTIFIED = 1 << 7;
    }
}

const NAMES: [(WakeReason, &str); 8] = [
    (WakeReason::BUTTON1, "Button1"),
    (WakeReason::BUTTON2, "Button2"),
    (WakeReason::LP_TICKER, "lp_ticker"),
    (WakeReason::WDT_TIMEOUT, "WDT timeout"),
    (WakeReason::RTC_ALARM, "RTC alarm"),
    (WakeReason::UART_CTS, "UART CTS"),
    (WakeReason::I2C_ADDR_MATCH, "I2C address match"),
    (WakeReason::UNIDENTIFIED, "Unidentified"),
];

impl WakeReason {
    pub const ALL: Self = Self::all();

    /// Every source that names a concrete cause
    pub const IDENTIFIED: Self = Self::ALL.difference(Self::UNIDENTIFIED);

    /// Display name of a single-bit reason
    pub fn name(self) -> Option<&'static str> {
        NAMES
            .iter()
            .find(|(reason, _)| *reason == self)
            .map(|(_, name)| *name)
    }

    /// Single-bit reasons in report order
    pub fn each(self) -> impl Iterator<Item = (WakeReason, &'static str)> {
        NAMES
            .iter()
            .copied()
            .filter(move |(reason, _)| self.contains(*reason))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepDepth {
    /// Idle mode; sources are identified directly
    Shallow,
    /// Power-down; the wake latch fires before the cause is known
    Deep,
}

impl uDisplay for SleepDepth {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            SleepDepth::Shallow => f.write_str("shallow sleep"),
            SleepDepth::Deep => f.write_str("deep sleep"),
        }
    }
}

/// Outcome of one disambiguation cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub reasons: WakeReason,
    pub depth: SleepDepth,
}

impl Classification {
    /// Classify the flags collected over a cycle. `None` when nothing fired.
    pub fn from_flags(flags: WakeReason) -> Option<Self> {
        if flags.is_empty() {
            return None;
        }

        let depth = if flags.contains(WakeReason::UNIDENTIFIED) {
            SleepDepth::Deep
        } else {
            SleepDepth::Shallow
        };

        // A concrete cause replaces the placeholder
        let reasons = if flags.intersects(WakeReason::IDENTIFIED) {
            flags - WakeReason::UNIDENTIFIED
        } else {
            flags
        };

        Some(Self { reasons, depth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_layout_matches_hardware_flags() {
        assert_eq!(WakeReason::BUTTON1.bits(), 0x01);
        assert_eq!(WakeReason::RTC_ALARM.bits(), 0x10);
        assert_eq!(WakeReason::UNIDENTIFIED.bits(), 0x80);
        assert_eq!(WakeReason::ALL.bits(), 0xFF);
        assert_eq!(WakeReason::IDENTIFIED.bits(), 0x7F);
    }

    #[test]
    fn names() {
        assert_eq!(WakeReason::WDT_TIMEOUT.name(), Some("WDT timeout"));
        assert_eq!(WakeReason::LP_TICKER.name(), Some("lp_ticker"));
        assert_eq!((WakeReason::BUTTON1 | WakeReason::BUTTON2).name(), None);
    }

    #[test]
    fn each_follows_bit_order() {
        let names: Vec<_> = (WakeReason::UNIDENTIFIED | WakeReason::BUTTON2 | WakeReason::RTC_ALARM)
            .each()
            .map(|(_, name)| name)
            .collect();
        assert_eq!(names, ["Button2", "RTC alarm", "Unidentified"]);
    }

    #[test]
    fn empty_flags_are_not_classified() {
        assert_eq!(Classification::from_flags(WakeReason::empty()), None);
    }

    #[test]
    fn lone_unidentified_is_deep() {
        let c = Classification::from_flags(WakeReason::UNIDENTIFIED).unwrap();
        assert_eq!(c.depth, SleepDepth::Deep);
        assert_eq!(c.reasons, WakeReason::UNIDENTIFIED);
    }

    #[test]
    fn identified_cause_drops_placeholder() {
        let c = Classification::from_flags(WakeReason::UNIDENTIFIED | WakeReason::RTC_ALARM).unwrap();
        assert_eq!(c.depth, SleepDepth::Deep);
        assert_eq!(c.reasons, WakeReason::RTC_ALARM);
    }

    #[test]
    fn no_latch_is_shallow() {
        let c = Classification::from_flags(WakeReason::BUTTON1).unwrap();
        assert_eq!(c.depth, SleepDepth::Shallow);
        assert_eq!(c.reasons, WakeReason::BUTTON1);
    }
}
