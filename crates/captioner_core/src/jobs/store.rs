//! Job status storage.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::types::{JobPhase, JobStatusRecord};

/// Keyed storage for job status records.
///
/// Each job reads and writes only its own key. Implementations expire
/// records that have not been updated within their time-to-live.
pub trait JobStore: Send + Sync {
    fn get(&self, job_id: &str) -> Option<JobStatusRecord>;

    fn set(&self, record: JobStatusRecord);

    /// Remove a record, returning whether it existed.
    fn delete(&self, job_id: &str) -> bool;

    /// Drop expired records, returning how many were removed.
    fn purge_expired(&self) -> usize;

    /// Record a phase transition, creating the record if needed.
    fn transition(&self, job_id: &str, phase: JobPhase) {
        let record = self
            .get(job_id)
            .unwrap_or_else(|| JobStatusRecord::queued(job_id));
        self.set(record.advance(phase));
    }
}

/// [`JobStore`] kept in process memory.
pub struct InMemoryJobStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, JobStatusRecord)>>,
}

impl InMemoryJobStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of records held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn expired(&self, touched: Instant) -> bool {
        touched.elapsed() >= self.ttl
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl JobStore for InMemoryJobStore {
    fn get(&self, job_id: &str) -> Option<JobStatusRecord> {
        let mut entries = self.entries.lock();
        let (touched, record) = entries.get(job_id)?;
        if !self.expired(*touched) {
            return Some(record.clone());
        }
        entries.remove(job_id);
        None
    }

    fn set(&self, record: JobStatusRecord) {
        self.entries
            .lock()
            .insert(record.job_id.clone(), (Instant::now(), record));
    }

    fn delete(&self, job_id: &str) -> bool {
        self.entries.lock().remove(job_id).is_some()
    }

    fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, (touched, _)| !self.expired(*touched));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Purged {} expired job records", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Downloads, JobResponse, RenderStats};

    #[test]
    fn set_get_delete() {
        let store = InMemoryJobStore::default();
        store.set(JobStatusRecord::queued("job-1"));

        assert_eq!(store.get("job-1").unwrap().phase, JobPhase::Queued);
        assert!(store.get("job-2").is_none());
        assert!(store.delete("job-1"));
        assert!(!store.delete("job-1"));
        assert!(store.is_empty());
    }

    #[test]
    fn transition_creates_and_advances() {
        let store = InMemoryJobStore::default();
        store.transition("job-1", JobPhase::Downloading);
        store.transition("job-1", JobPhase::Probing);
        assert_eq!(store.get("job-1").unwrap().phase, JobPhase::Probing);
    }

    #[test]
    fn final_response_is_kept() {
        let store = InMemoryJobStore::default();
        let response = JobResponse::success("job-1", Downloads::default(), RenderStats::default());
        store.set(JobStatusRecord::finished(response.clone()));

        let record = store.get("job-1").unwrap();
        assert_eq!(record.phase, JobPhase::Complete);
        assert_eq!(record.response, Some(response));
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let store = InMemoryJobStore::new(Duration::ZERO);
        store.set(JobStatusRecord::queued("job-1"));
        store.set(JobStatusRecord::queued("job-2"));
        assert_eq!(store.len(), 2);

        assert!(store.get("job-1").is_none());
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn live_records_survive_purge() {
        let store = InMemoryJobStore::new(Duration::from_secs(3600));
        store.set(JobStatusRecord::queued("job-1"));
        assert_eq!(store.purge_expired(), 0);
        assert!(store.get("job-1").is_some());
    }
}
