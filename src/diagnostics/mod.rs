//! Error taxonomy and monitor health counters

use crate::os::OsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No event inside a wait window. Expected; drives protocol branching.
    Timeout = 0x1000,
    /// Kernel primitive failed. Logged, cycle continues or restarts.
    OsFault = 0x2000,
    /// Wake-up source missing on this hardware variant
    ConfigurationUnsupported = 0x3000,
}

/// Monitor stage a fault was observed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PrimaryWake,
    ResolveUnidentified,
    ResolveOthers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub stage: Stage,
    pub error: OsError,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    cycles: u32,
    spurious: u32,
    os_faults: u32,
    unsupported_sources: u32,
    last_fault: Option<Fault>,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            cycles: 0,
            spurious: 0,
            os_faults: 0,
            unsupported_sources: 0,
            last_fault: None,
        }
    }

    pub fn record(&mut self, code: ErrorCode) {
        match code {
            ErrorCode::Timeout => {}
            ErrorCode::OsFault => self.os_faults = self.os_faults.wrapping_add(1),
            ErrorCode::ConfigurationUnsupported => {
                self.unsupported_sources = self.unsupported_sources.wrapping_add(1)
            }
        }
    }

    pub fn record_fault(&mut self, stage: Stage, error: OsError) {
        self.record(ErrorCode::OsFault);
        self.last_fault = Some(Fault { stage, error });
    }

    pub fn cycle_completed(&mut self) {
        self.cycles = self.cycles.wrapping_add(1);
    }

    pub fn cycle_spurious(&mut self) {
        self.spurious = self.spurious.wrapping_add(1);
    }

    /// Cycles that produced a report
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Cycles that ended with nothing to report
    pub fn spurious(&self) -> u32 {
        self.spurious
    }

    pub fn os_faults(&self) -> u32 {
        self.os_faults
    }

    pub fn unsupported_sources(&self) -> u32 {
        self.unsupported_sources
    }

    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_not_counted_as_faults() {
        let mut diag = Diagnostics::new();
        diag.record(ErrorCode::Timeout);
        assert_eq!(diag.os_faults(), 0);
        assert_eq!(diag.last_fault(), None);
    }

    #[test]
    fn fault_remembers_stage() {
        let mut diag = Diagnostics::new();
        diag.record_fault(Stage::ResolveOthers, OsError::Isr);
        assert_eq!(diag.os_faults(), 1);
        assert_eq!(
            diag.last_fault(),
            Some(Fault {
                stage: Stage::ResolveOthers,
                error: OsError::Isr
            })
        );
    }

    #[test]
    fn unsupported_sources_are_counted() {
        let mut diag = Diagnostics::new();
        diag.record(ErrorCode::ConfigurationUnsupported);
        diag.record(ErrorCode::ConfigurationUnsupported);
        assert_eq!(diag.unsupported_sources(), 2);
    }
}
