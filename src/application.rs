//! Wake-up disambiguation loop
//!
//! One cycle blocks until something fires, then spends at most two short
//! windows working out what. The power controller's `UNIDENTIFIED` bit only
//! says the core left power-down; the real cause may arrive a little later
//! from a deferred producer, or may already be there.

use crate::config::WakeupConfig;
use crate::diagnostics::{Diagnostics, ErrorCode, Stage};
use crate::drivers::{config_wakeup, ConfigError, WakeSource};
use crate::logger::{Console, Logger};
use crate::os::{Clock, OsError, Timeout, Waiter};
use crate::rtos::{EventRegistry, WaitError};
use crate::wakeup::{Classification, WakeReason};

pub struct WakeupMonitor<'r, P, W> {
    registry: &'r EventRegistry<P>,
    log: Logger<W>,
    config: WakeupConfig,
    diag: Diagnostics,
}

impl<'r, P, W> WakeupMonitor<'r, P, W>
where
    P: Waiter + Clock,
    W: Console,
{
    pub fn new(registry: &'r EventRegistry<P>, log: Logger<W>) -> Self {
        Self {
            registry,
            log,
            config: WakeupConfig::default(),
            diag: Diagnostics::new(),
        }
    }

    pub fn with_config(mut self, config: WakeupConfig) -> Self {
        self.config = config;
        self
    }

    /// Set up one wake-up source, reporting it if this board lacks it
    pub fn configure<S>(&mut self, source: &mut S) -> Result<(), ConfigError>
    where
        S: WakeSource + ?Sized,
    {
        config_wakeup(source, &mut self.log, &mut self.diag)
    }

    /// Run one cycle. Returns what was reported, if anything.
    pub fn run_once(&mut self) -> Option<Classification> {
        self.log.write_line("I am going to shallow/deep sleep");
        // UART must be idle before the clocks stop
        self.log.flush();

        let mut flags = match self
            .registry
            .wait_any(WakeReason::ALL, Timeout::Forever, true)
        {
            Ok(bits) => bits,
            Err(err) => {
                self.absorb(Stage::PrimaryWake, err);
                self.diag.cycle_spurious();
                return None;
            }
        };

        // The latch may trail the cause; a lone latch still gets its own
        // window before the search for the cause starts
        let explained = flags.contains(WakeReason::UNIDENTIFIED)
            && flags.intersects(WakeReason::IDENTIFIED);
        if !explained {
            flags |= self.resolve(Stage::ResolveUnidentified, WakeReason::UNIDENTIFIED);
        }

        if flags == WakeReason::UNIDENTIFIED {
            flags |= self.resolve(Stage::ResolveOthers, WakeReason::IDENTIFIED);
        }

        // Bits that landed during the windows above are folded into this
        // cycle or dropped with it
        self.registry.clear_all();

        match Classification::from_flags(flags) {
            Some(classification) => {
                self.log.report(&classification);
                self.log.write_line("");
                self.diag.cycle_completed();
                Some(classification)
            }
            None => {
                self.diag.cycle_spurious();
                None
            }
        }
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.run_once();
        }
    }

    /// Bounded wait for `mask`; nothing on timeout or fault
    fn resolve(&mut self, stage: Stage, mask: WakeReason) -> WakeReason {
        match self
            .registry
            .wait_any(mask, Timeout::After(self.config.resolve_window), true)
        {
            Ok(bits) => bits,
            Err(err) => {
                self.absorb(stage, err);
                WakeReason::empty()
            }
        }
    }

    fn absorb(&mut self, stage: Stage, err: WaitError) {
        match err {
            WaitError::Timeout => self.diag.record(ErrorCode::Timeout),
            WaitError::Os(err) => self.fault(stage, err),
        }
    }

    fn fault(&mut self, stage: Stage, err: OsError) {
        self.log.os_error(err);
        self.diag.record_fault(stage, err);
    }

    pub fn config(&self) -> &WakeupConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn logger(&self) -> &Logger<W> {
        &self.log
    }

    pub fn logger_mut(&mut self) -> &mut Logger<W> {
        &mut self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Fault;
    use crate::logger::Level;
    use crate::testing::{MemoryConsole, SimPort};
    use crate::wakeup::SleepDepth;
    use core::time::Duration;

    fn monitor(registry: &EventRegistry<SimPort>) -> WakeupMonitor<'_, SimPort, MemoryConsole> {
        WakeupMonitor::new(
            registry,
            Logger::new(MemoryConsole::default()).with_level(Level::Info),
        )
    }

    #[test]
    fn button_alone_is_a_shallow_wake() {
        let registry = EventRegistry::new(SimPort::new());
        let mut mon = monitor(&registry);

        registry.set(WakeReason::BUTTON1);
        let got = mon.run_once();

        assert_eq!(
            got,
            Some(Classification {
                reasons: WakeReason::BUTTON1,
                depth: SleepDepth::Shallow,
            })
        );
        assert_eq!(
            mon.logger().console().text(),
            "I am going to shallow/deep sleep\nWake up by Button1 from shallow sleep\n\n"
        );
        assert_eq!(mon.logger().console().flushes(), 1);
        // Only the unidentified window was waited out
        assert_eq!(registry.port().now(), Duration::from_millis(100));
        assert!(registry.get().is_empty());
    }

    #[test]
    fn unidentified_alone_reports_itself_from_deep_sleep() {
        let registry = EventRegistry::new(SimPort::new());
        let mut mon = monitor(&registry);

        registry.set(WakeReason::UNIDENTIFIED);
        let got = mon.run_once();

        assert_eq!(
            got,
            Some(Classification {
                reasons: WakeReason::UNIDENTIFIED,
                depth: SleepDepth::Deep,
            })
        );
        let lines: Vec<_> = mon.logger().console().lines().collect();
        assert_eq!(lines[1], "Wake up by Unidentified from deep sleep");
        // Both windows waited out
        assert_eq!(registry.port().now(), Duration::from_millis(200));
    }

    #[test]
    fn identified_reason_replaces_unidentified() {
        let registry = EventRegistry::new(SimPort::new());
        let mut mon = monitor(&registry);

        registry.set(WakeReason::UNIDENTIFIED | WakeReason::RTC_ALARM);
        let got = mon.run_once();

        assert_eq!(
            got,
            Some(Classification {
                reasons: WakeReason::RTC_ALARM,
                depth: SleepDepth::Deep,
            })
        );
        // Neither resolve window needed
        assert_eq!(registry.port().now(), Duration::ZERO);
    }

    #[test]
    fn several_reasons_are_listed_in_bit_order() {
        let registry = EventRegistry::new(SimPort::new());
        let mut mon = monitor(&registry);

        registry.set(WakeReason::I2C_ADDR_MATCH | WakeReason::BUTTON2);
        mon.run_once();

        let lines: Vec<_> = mon.logger().console().lines().collect();
        assert_eq!(
            lines,
            [
                "I am going to shallow/deep sleep",
                "Wake up by Button2 from shallow sleep",
                "Wake up by I2C address match from shallow sleep",
                "",
            ]
        );
    }

    #[test]
    fn resolve_window_follows_config() {
        let registry = EventRegistry::new(SimPort::new());
        let mut mon = monitor(&registry)
            .with_config(WakeupConfig::new().with_resolve_window(Duration::from_millis(20)));

        registry.set(WakeReason::WDT_TIMEOUT);
        mon.run_once();

        assert_eq!(registry.port().now(), Duration::from_millis(20));
        assert_eq!(mon.config().resolve_window, Duration::from_millis(20));
    }

    #[test]
    fn primary_fault_is_logged_and_cycle_restarts() {
        let registry = EventRegistry::new(SimPort::failing(OsError::Isr));
        let mut mon = monitor(&registry);

        assert_eq!(mon.run_once(), None);

        assert_eq!(
            mon.logger().console().text(),
            "I am going to shallow/deep sleep\n[ERR] OS error code: 0xFFFFFFFA\n"
        );
        assert_eq!(mon.diagnostics().spurious(), 1);
        assert_eq!(
            mon.diagnostics().last_fault(),
            Some(Fault {
                stage: Stage::PrimaryWake,
                error: OsError::Isr,
            })
        );
    }

    #[test]
    fn fault_while_resolving_keeps_what_was_collected() {
        let registry = EventRegistry::new(SimPort::failing(OsError::Resource));
        let mut mon = monitor(&registry);

        registry.set(WakeReason::UNIDENTIFIED);
        let got = mon.run_once();

        assert_eq!(
            got,
            Some(Classification {
                reasons: WakeReason::UNIDENTIFIED,
                depth: SleepDepth::Deep,
            })
        );
        // One fault per window
        assert_eq!(mon.diagnostics().os_faults(), 2);
        assert_eq!(mon.diagnostics().cycles(), 1);
        assert_eq!(
            mon.diagnostics().last_fault().map(|f| f.stage),
            Some(Stage::ResolveOthers)
        );
    }

    #[test]
    fn fault_in_unidentified_window_still_reports() {
        let registry = EventRegistry::new(SimPort::failing(OsError::Resource));
        let mut mon = monitor(&registry);

        registry.set(WakeReason::BUTTON1);
        let got = mon.run_once().map(|c| c.reasons);

        assert_eq!(got, Some(WakeReason::BUTTON1));
        assert_eq!(
            mon.diagnostics().last_fault().map(|f| f.stage),
            Some(Stage::ResolveUnidentified)
        );
        assert!(mon
            .logger()
            .console()
            .text()
            .contains("[ERR] OS error code: 0xFFFFFFFD\n"));
    }

    #[test]
    fn timeouts_are_never_logged_as_errors() {
        let registry = EventRegistry::new(SimPort::new());
        let mut mon = monitor(&registry);

        registry.set(WakeReason::UNIDENTIFIED);
        mon.run_once();
        registry.set(WakeReason::BUTTON2);
        mon.run_once();

        assert!(!mon.logger().console().text().contains("[ERR]"));
        assert_eq!(mon.diagnostics().os_faults(), 0);
        assert_eq!(mon.diagnostics().cycles(), 2);
    }
}
