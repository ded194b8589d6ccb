//! Replication bookkeeping for dual writes and shadow reads.
//!
//! Failed secondary writes are not retried. They are kept in a bounded log so
//! an operator can reconcile the secondary store by hand.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use modernizr_core::migration::{StoreKind, ValidationReport};

/// A secondary write that did not land.
#[derive(Debug, Clone, Serialize)]
pub struct FailedWrite {
    pub entity: &'static str,
    pub operation: &'static str,
    /// Identifier or lookup key of the affected record.
    pub key: String,
    pub store: StoreKind,
    pub error: String,
    pub correlation_id: Uuid,
    pub at: DateTime<Utc>,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JournalStats {
    pub secondary_writes: u64,
    pub secondary_failures: u64,
    pub shadow_reads: u64,
    pub shadow_failures: u64,
    pub validation_mismatches: u64,
    /// Failed writes currently retained in the log.
    pub pending_reconciliation: usize,
}

/// Counters plus bounded logs of failed writes and failed validations.
#[derive(Debug)]
pub struct ReplicationJournal {
    secondary_writes: AtomicU64,
    secondary_failures: AtomicU64,
    shadow_reads: AtomicU64,
    shadow_failures: AtomicU64,
    validation_mismatches: AtomicU64,
    failed_writes: RwLock<VecDeque<FailedWrite>>,
    mismatch_reports: RwLock<VecDeque<ValidationReport>>,
    max_size: usize,
}

impl Default for ReplicationJournal {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl ReplicationJournal {
    /// Creates a journal retaining at most `max_size` entries per log.
    pub fn new(max_size: usize) -> Self {
        Self {
            secondary_writes: AtomicU64::new(0),
            secondary_failures: AtomicU64::new(0),
            shadow_reads: AtomicU64::new(0),
            shadow_failures: AtomicU64::new(0),
            validation_mismatches: AtomicU64::new(0),
            failed_writes: RwLock::new(VecDeque::new()),
            mismatch_reports: RwLock::new(VecDeque::new()),
            max_size,
        }
    }

    pub fn record_secondary_write(&self) {
        self.secondary_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_secondary_failure(&self, failure: FailedWrite) {
        self.secondary_failures.fetch_add(1, Ordering::Relaxed);
        push_bounded(&self.failed_writes, failure, self.max_size);
    }

    pub fn record_shadow_read(&self) {
        self.shadow_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shadow_failure(&self) {
        self.shadow_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts and retains a report if it found mismatches; passing reports are dropped.
    pub fn record_validation(&self, report: ValidationReport) {
        if report.passed() {
            return;
        }
        self.validation_mismatches.fetch_add(1, Ordering::Relaxed);
        push_bounded(&self.mismatch_reports, report, self.max_size);
    }

    pub fn stats(&self) -> JournalStats {
        JournalStats {
            secondary_writes: self.secondary_writes.load(Ordering::Relaxed),
            secondary_failures: self.secondary_failures.load(Ordering::Relaxed),
            shadow_reads: self.shadow_reads.load(Ordering::Relaxed),
            shadow_failures: self.shadow_failures.load(Ordering::Relaxed),
            validation_mismatches: self.validation_mismatches.load(Ordering::Relaxed),
            pending_reconciliation: self.failed_writes.read().map(|log| log.len()).unwrap_or(0),
        }
    }

    /// Returns the retained failed writes, oldest first.
    pub fn failed_writes(&self) -> Vec<FailedWrite> {
        self.failed_writes
            .read()
            .ok()
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes and returns the retained failed writes, oldest first.
    pub fn drain_failed_writes(&self) -> Vec<FailedWrite> {
        self.failed_writes
            .write()
            .ok()
            .map(|mut log| log.drain(..).collect())
            .unwrap_or_default()
    }

    /// Returns the retained failed validation reports, oldest first.
    pub fn mismatch_reports(&self) -> Vec<ValidationReport> {
        self.mismatch_reports
            .read()
            .ok()
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn push_bounded<T>(log: &RwLock<VecDeque<T>>, entry: T, max_size: usize) {
    if let Ok(mut log) = log.write() {
        log.push_back(entry);
        while log.len() > max_size {
            log.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modernizr_core::migration::{Divergence, FieldMismatch};
    use modernizr_core::models::{CreateUserRequest, User};

    fn failure(key: &str) -> FailedWrite {
        FailedWrite {
            entity: "User",
            operation: "create_user",
            key: key.to_string(),
            store: StoreKind::Distributed,
            error: "Connection failed: down".to_string(),
            correlation_id: Uuid::new_v4(),
            at: Utc::now(),
        }
    }

    fn report(mismatches: Vec<FieldMismatch>) -> ValidationReport {
        ValidationReport {
            entity: "User",
            operation: "find_by_id",
            key: "1".to_string(),
            correlation_id: Uuid::new_v4().to_string(),
            primary_store: StoreKind::Relational,
            shadow_store: StoreKind::Distributed,
            mismatches,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_counters_start_at_zero() {
        assert_eq!(ReplicationJournal::default().stats(), JournalStats::default());
    }

    #[test]
    fn test_failed_writes_are_bounded() {
        let journal = ReplicationJournal::new(2);
        journal.record_secondary_failure(failure("1"));
        journal.record_secondary_failure(failure("2"));
        journal.record_secondary_failure(failure("3"));

        let keys: Vec<_> = journal.failed_writes().into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["2", "3"]);

        let stats = journal.stats();
        assert_eq!(stats.secondary_failures, 3);
        assert_eq!(stats.pending_reconciliation, 2);
    }

    #[test]
    fn test_drain_empties_the_log_but_keeps_counters() {
        let journal = ReplicationJournal::default();
        journal.record_secondary_failure(failure("7"));

        assert_eq!(journal.drain_failed_writes().len(), 1);
        assert!(journal.failed_writes().is_empty());
        assert_eq!(journal.stats().secondary_failures, 1);
    }

    #[test]
    fn test_only_failed_validations_are_retained() {
        let journal = ReplicationJournal::default();
        journal.record_validation(report(Vec::new()));
        assert_eq!(journal.stats().validation_mismatches, 0);

        let u = User::from_request(1, &CreateUserRequest::new("a", "a@example.com", "h"), Utc::now());
        let mut other = u.clone();
        other.username = "b".to_string();
        journal.record_validation(report(u.divergences(&other)));

        assert_eq!(journal.stats().validation_mismatches, 1);
        assert_eq!(journal.mismatch_reports().len(), 1);
    }
}
