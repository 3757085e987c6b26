//! Session middleware configuration.
//!
//! Sessions hold the backend token, the store state and flash messages. They
//! live in a bounded moka cache: each record is evicted at its own expiry
//! date, and the least recently used records go first once
//! `STOREFRONT_SESSION_CAPACITY` is reached. Sessions are lost on restart.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{Expiry as CacheExpiry, future::Cache};
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::time::OffsetDateTime,
    session::{Id, Record},
    session_store,
};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "origen_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

// =============================================================================
// Store
// =============================================================================

/// Per-entry TTL taken from the record's own expiry date.
struct RecordExpiry;

impl RecordExpiry {
    fn remaining(record: &Record) -> Duration {
        Duration::try_from(record.expiry_date - OffsetDateTime::now_utc()).unwrap_or(Duration::ZERO)
    }
}

impl CacheExpiry<Id, Record> for RecordExpiry {
    fn expire_after_create(&self, _id: &Id, record: &Record, _at: Instant) -> Option<Duration> {
        Some(Self::remaining(record))
    }

    fn expire_after_update(
        &self,
        _id: &Id,
        record: &Record,
        _at: Instant,
        _current: Option<Duration>,
    ) -> Option<Duration> {
        Some(Self::remaining(record))
    }
}

/// Bounded, expiring in-memory session store.
#[derive(Clone, Debug)]
pub struct MokaSessionStore {
    records: Cache<Id, Record>,
}

impl MokaSessionStore {
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        let records = Cache::builder()
            .max_capacity(capacity)
            .expire_after(RecordExpiry)
            .build();
        Self { records }
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.save(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .records
            .get(id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.records.invalidate(id).await;
        Ok(())
    }
}

// =============================================================================
// Layer
// =============================================================================

/// Create the session layer over a [`MokaSessionStore`].
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MokaSessionStore> {
    let store = MokaSessionStore::new(config.session_capacity);

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tower_sessions::cookie::time::Duration as TimeDuration;

    fn record(expires_in: TimeDuration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::default(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        let store = MokaSessionStore::new(10);
        let mut live = record(TimeDuration::hours(1));
        live.data
            .insert("token".to_string(), serde_json::json!("abc"));

        store.save(&live).await.unwrap();
        let loaded = store.load(&live.id).await.unwrap().unwrap();
        assert_eq!(loaded.data["token"], "abc");

        store.delete(&live.id).await.unwrap();
        assert!(store.load(&live.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_record_is_evicted() {
        let store = MokaSessionStore::new(10);
        let stale = record(TimeDuration::seconds(-5));

        store.save(&stale).await.unwrap();
        assert!(store.load(&stale.id).await.unwrap().is_none());

        store.records.run_pending_tasks().await;
        assert_eq!(store.records.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let store = MokaSessionStore::new(3);
        for _ in 0..50 {
            store.save(&record(TimeDuration::hours(1))).await.unwrap();
        }

        store.records.run_pending_tasks().await;
        assert!(store.records.entry_count() <= 3);
    }

    #[tokio::test]
    async fn test_create_avoids_id_collision() {
        let store = MokaSessionStore::new(10);
        let existing = record(TimeDuration::hours(1));
        store.save(&existing).await.unwrap();

        let mut fresh = record(TimeDuration::hours(1));
        fresh.id = existing.id;
        store.create(&mut fresh).await.unwrap();

        assert_ne!(fresh.id, existing.id);
        assert!(store.load(&existing.id).await.unwrap().is_some());
    }
}
