use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::config::LockoutConfig;

/// Per-principal failed-attempt state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutRecord {
    pub principal_id: Uuid,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Tracks failed password attempts and applies a time-boxed lock once the
/// threshold is reached.
///
/// The facade consults [`LockoutTracker::is_locked`] BEFORE attempting
/// password verification, so a locked account never reaches the hash check.
/// The lock itself does not reset the counter; only a successful login does,
/// which means a single failure after an expired lock re-locks immediately.
pub struct LockoutTracker {
    records: DashMap<Uuid, LockoutRecord>,
    max_failed_attempts: u32,
    lockout_duration: Duration,
}

impl LockoutTracker {
    pub fn new(config: &LockoutConfig) -> Self {
        Self {
            records: DashMap::new(),
            max_failed_attempts: config.max_failed_attempts,
            lockout_duration: Duration::minutes(config.lockout_duration_minutes),
        }
    }

    /// Record a failed attempt, locking the account once the counter reaches
    /// the threshold. Runs even when the surrounding call fails.
    pub fn record_failure(&self, principal_id: Uuid) -> LockoutRecord {
        let mut entry = self
            .records
            .entry(principal_id)
            .or_insert_with(|| LockoutRecord {
                principal_id,
                failed_attempts: 0,
                locked_until: None,
            });

        entry.failed_attempts += 1;
        if entry.failed_attempts >= self.max_failed_attempts {
            entry.locked_until = Some(Utc::now() + self.lockout_duration);
            tracing::warn!(
                principal_id = %principal_id,
                failed_attempts = entry.failed_attempts,
                "Account locked after repeated failed attempts"
            );
        }

        entry.clone()
    }

    /// Reset the counter and clear any lock after a successful login.
    pub fn record_success(&self, principal_id: Uuid) {
        self.records.remove(&principal_id);
    }

    pub fn is_locked(&self, principal_id: Uuid, now: DateTime<Utc>) -> bool {
        self.records
            .get(&principal_id)
            .and_then(|r| r.locked_until)
            .is_some_and(|until| until > now)
    }

    pub fn record(&self, principal_id: Uuid) -> Option<LockoutRecord> {
        self.records.get(&principal_id).map(|r| r.clone())
    }

    /// Drop records whose lock has been fully served. Counters without a
    /// lock are kept; they only ever clear on success.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, r| r.locked_until.map_or(true, |until| until > now));
        before - self.records.len()
    }
}
