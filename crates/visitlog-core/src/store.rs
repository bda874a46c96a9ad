//! The visit store: the only code that reads or rewrites the visit slot.
//!
//! The whole collection lives in one slot as a JSON array, newest first.
//! Every mutation reads the array, edits it in memory and writes the full
//! array back. Nothing here coordinates with other processes sharing the slot,
//! so concurrent writers race and the last write wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use visitlog_storage::SlotStorage;

use crate::config::DEFAULT_STORAGE_KEY;
use crate::error::CoreError;
use crate::visit::VisitRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub storage_key: String,
    /// Retention cap. The oldest visits are dropped past this length.
    pub max_retained: usize,
    /// Per-IP duplicate suppression window. `None` records every visit.
    pub dedup_window_secs: Option<u64>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_retained: 1000,
            dedup_window_secs: Some(3600),
        }
    }
}

#[derive(Clone)]
pub struct VisitStore {
    slot: Arc<dyn SlotStorage>,
    settings: StoreSettings,
}

impl VisitStore {
    pub fn new(slot: Arc<dyn SlotStorage>, settings: StoreSettings) -> Self {
        Self { slot, settings }
    }

    /// Read the stored collection.
    ///
    /// An absent slot, a read failure and unparsable contents all yield an
    /// empty collection; the failure is only logged.
    pub fn list_all(&self) -> Vec<VisitRecord> {
        let raw = match self.slot.get(&self.settings.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.settings.storage_key, error = %e, "Visit slot unreadable, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<VisitRecord>>(&raw) {
            Ok(visits) => visits.into_iter().map(VisitRecord::normalized).collect(),
            Err(e) => {
                warn!(key = %self.settings.storage_key, error = %e, "Visit slot unparsable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Record a visit stamped with the current time. See [`VisitStore::add_at`].
    pub fn add(
        &self,
        ip: &str,
        browser: &str,
        platform: &str,
    ) -> Result<Vec<VisitRecord>, CoreError> {
        self.add_at(ip, browser, platform, Utc::now())
    }

    /// Record a visit stamped `now`.
    ///
    /// If dedup is enabled and any stored visit from the same IP is newer than
    /// `now - dedup_window`, nothing is written and the stored collection is
    /// returned as-is. Otherwise the visit is prepended, the collection is cut
    /// to `max_retained` and written back.
    pub fn add_at(
        &self,
        ip: &str,
        browser: &str,
        platform: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<VisitRecord>, CoreError> {
        let mut visits = self.list_all();

        if self.is_duplicate(&visits, ip, now) {
            debug!(ip, "Visit suppressed as duplicate within dedup window");
            return Ok(visits);
        }

        let visit = VisitRecord::new(ip, browser, platform, now);
        info!(id = %visit.id, ip, browser, platform, "Visit recorded");
        visits.insert(0, visit);
        visits.truncate(self.settings.max_retained);

        self.persist(&visits)?;
        Ok(visits)
    }

    /// Remove the visit with `id`. Persists and returns the result even when
    /// nothing matched.
    pub fn delete_by_id(&self, id: &str) -> Result<Vec<VisitRecord>, CoreError> {
        let mut visits = self.list_all();
        let before = visits.len();
        visits.retain(|visit| visit.id != id);
        debug!(id, removed = before - visits.len(), "Visit delete applied");

        self.persist(&visits)?;
        Ok(visits)
    }

    /// Drop every stored visit.
    pub fn clear(&self) -> Result<Vec<VisitRecord>, CoreError> {
        self.slot.remove(&self.settings.storage_key)?;
        info!(key = %self.settings.storage_key, "Visit slot cleared");
        Ok(Vec::new())
    }

    fn is_duplicate(&self, visits: &[VisitRecord], ip: &str, now: DateTime<Utc>) -> bool {
        let Some(window_secs) = self.settings.dedup_window_secs else {
            return false;
        };
        let window_ms = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let cutoff = now.timestamp_millis().saturating_sub(window_ms);
        visits
            .iter()
            .any(|visit| visit.ip == ip && visit.timestamp > cutoff)
    }

    fn persist(&self, visits: &[VisitRecord]) -> Result<(), CoreError> {
        let encoded = serde_json::to_string(visits)?;
        self.slot.set(&self.settings.storage_key, &encoded)?;
        Ok(())
    }
}
