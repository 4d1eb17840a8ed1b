//! Import counters.

use crate::scanner::ScanSummary;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters updated by the workers while an import runs.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub total_commands: AtomicU64,
    pub total_inserts: AtomicU64,
    pub failed_inserts: AtomicU64,
    /// Lines of the final partial batch: counted as inserted, never written
    pub unwritten_inserts: AtomicU64,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_command(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_written(&self, lines: u64) {
        self.total_inserts.fetch_add(lines, Ordering::Relaxed);
    }

    pub fn record_batch_failed(&self, lines: u64) {
        self.failed_inserts.fetch_add(lines, Ordering::Relaxed);
    }

    /// Final partial batch at shutdown. Kept in `total_inserts` for
    /// compatibility with existing import reports.
    pub fn record_batch_unwritten(&self, lines: u64) {
        self.total_inserts.fetch_add(lines, Ordering::Relaxed);
        self.unwritten_inserts.fetch_add(lines, Ordering::Relaxed);
    }

    /// Snapshot the counters into a report
    pub fn report(&self, scan: ScanSummary, elapsed: Duration) -> ImportReport {
        ImportReport {
            total_commands: self.total_commands.load(Ordering::Relaxed),
            total_inserts: self.total_inserts.load(Ordering::Relaxed),
            failed_inserts: self.failed_inserts.load(Ordering::Relaxed),
            unwritten_inserts: self.unwritten_inserts.load(Ordering::Relaxed),
            scan,
            elapsed,
        }
    }
}

/// Outcome of a completed import
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Statements received by the executor
    pub total_commands: u64,
    /// Lines counted as inserted (includes `unwritten_inserts`)
    pub total_inserts: u64,
    /// Lines of batches whose write failed
    pub failed_inserts: u64,
    /// Lines of the final partial batch, counted but not written
    pub unwritten_inserts: u64,
    /// What the scanner saw
    pub scan: ScanSummary,
    /// Wall time of the import
    pub elapsed: Duration,
}

impl ImportReport {
    /// Summary lines to log, only present once something was inserted.
    pub fn summary_lines(&self) -> Option<[String; 3]> {
        if self.total_inserts == 0 {
            return None;
        }
        Some([
            format!("Processed {} commands", self.total_commands),
            format!("Processed {} inserts", self.total_inserts),
            format!("Failed {} inserts", self.failed_inserts),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_report() {
        let stats = ImportStats::new();
        stats.record_command();
        stats.record_command();
        stats.record_batch_written(5000);
        stats.record_batch_failed(5000);
        stats.record_batch_unwritten(42);

        let report = stats.report(ScanSummary::default(), Duration::from_secs(1));
        assert_eq!(report.total_commands, 2);
        assert_eq!(report.total_inserts, 5042);
        assert_eq!(report.failed_inserts, 5000);
        assert_eq!(report.unwritten_inserts, 42);
    }

    #[test]
    fn test_summary_requires_inserts() {
        let stats = ImportStats::new();
        stats.record_command();
        let report = stats.report(ScanSummary::default(), Duration::ZERO);
        assert!(report.summary_lines().is_none());

        stats.record_batch_written(10);
        let report = stats.report(ScanSummary::default(), Duration::ZERO);
        let lines = report.summary_lines().unwrap();
        assert_eq!(lines[0], "Processed 1 commands");
        assert_eq!(lines[1], "Processed 10 inserts");
        assert_eq!(lines[2], "Failed 0 inserts");
    }

    #[test]
    fn test_failed_only_has_no_summary() {
        let stats = ImportStats::new();
        stats.record_batch_failed(5000);
        let report = stats.report(ScanSummary::default(), Duration::ZERO);
        assert!(report.summary_lines().is_none());
    }
}
