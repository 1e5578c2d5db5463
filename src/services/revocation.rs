use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Denylist of not-yet-expired but invalidated credential ids.
///
/// Call sites depend on this trait, not on a concrete store, so a
/// multi-instance deployment can back it with a shared cache without
/// touching the facade. Consulted on every verify-success path before a
/// credential is trusted.
#[async_trait]
pub trait RevocationRegistry: Send + Sync {
    /// Idempotent insert. The entry outlives the credential: it is kept at
    /// least until `expires_at`.
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), anyhow::Error>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, anyhow::Error>;

    /// Remove entries whose expiry has passed. Safe to call repeatedly and
    /// concurrently; never removes an entry before its expiry. Returns the
    /// number of purged entries.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, anyhow::Error>;
}

/// Process-local registry backed by a concurrent map. Suitable for a single
/// logical revocation store; production multi-instance deployments swap in
/// a shared implementation behind the same trait.
#[derive(Default)]
pub struct MemoryRevocationRegistry {
    entries: DashMap<String, DateTime<Utc>>,
}

impl MemoryRevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationRegistry for MemoryRevocationRegistry {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), anyhow::Error> {
        // Re-revoking must never shorten an entry's lifetime.
        self.entries
            .entry(jti.to_string())
            .and_modify(|e| {
                if expires_at > *e {
                    *e = expires_at;
                }
            })
            .or_insert(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, anyhow::Error> {
        Ok(self.entries.contains_key(jti))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, anyhow::Error> {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        Ok(before - self.entries.len())
    }
}

/// Spawn a background task that purges expired entries on a fixed interval.
/// Optional: callers may instead invoke `purge_expired` opportunistically.
pub fn spawn_purge_task(
    registry: Arc<dyn RevocationRegistry>,
    interval: StdDuration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick is immediate, skip it
        loop {
            ticker.tick().await;
            match registry.purge_expired(Utc::now()).await {
                Ok(purged) if purged > 0 => {
                    tracing::debug!(purged, "Purged expired revocation entries");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Revocation purge failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn revoke_is_visible_immediately() {
        let registry = MemoryRevocationRegistry::new();
        let exp = Utc::now() + Duration::hours(1);

        assert!(!registry.is_revoked("jti-1").await.unwrap());
        registry.revoke("jti-1", exp).await.unwrap();
        assert!(registry.is_revoked("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn purge_never_removes_unexpired_entries() {
        let registry = MemoryRevocationRegistry::new();
        let now = Utc::now();
        registry
            .revoke("keep", now + Duration::minutes(5))
            .await
            .unwrap();
        registry
            .revoke("drop", now - Duration::minutes(5))
            .await
            .unwrap();

        // Repeated purges before expiry keep the live entry revoked.
        for _ in 0..3 {
            registry.purge_expired(now).await.unwrap();
            assert!(registry.is_revoked("keep").await.unwrap());
        }
        assert!(!registry.is_revoked("drop").await.unwrap());
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_never_shortens() {
        let registry = MemoryRevocationRegistry::new();
        let now = Utc::now();
        let late = now + Duration::hours(2);
        let early = now + Duration::minutes(1);

        registry.revoke("jti-1", late).await.unwrap();
        registry.revoke("jti-1", early).await.unwrap();

        // Entry still carries the later expiry: a purge between the two
        // deadlines must keep it.
        registry
            .purge_expired(now + Duration::minutes(30))
            .await
            .unwrap();
        assert!(registry.is_revoked("jti-1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_task_drops_stale_entries_on_its_interval() {
        let registry: Arc<dyn RevocationRegistry> = Arc::new(MemoryRevocationRegistry::new());
        registry
            .revoke("stale", Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        let handle = spawn_purge_task(registry.clone(), StdDuration::from_secs(60));

        // Still present before the first scheduled run.
        assert!(registry.is_revoked("stale").await.unwrap());

        tokio::time::sleep(StdDuration::from_secs(61)).await;
        assert!(!registry.is_revoked("stale").await.unwrap());

        handle.abort();
    }

    #[tokio::test]
    async fn purge_reports_count() {
        let registry = MemoryRevocationRegistry::new();
        let now = Utc::now();
        registry
            .revoke("a", now - Duration::seconds(1))
            .await
            .unwrap();
        registry
            .revoke("b", now - Duration::seconds(2))
            .await
            .unwrap();

        assert_eq!(registry.purge_expired(now).await.unwrap(), 2);
        assert_eq!(registry.purge_expired(now).await.unwrap(), 0);
    }
}
