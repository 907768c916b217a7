use std::collections::HashMap;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;

use super::{
    SubscriberKey,
    job::{JobId, JobKind, ScheduledJob},
};

pub struct JobStore<K: SubscriberKey> {
    jobs: Mutex<HashMap<K, ScheduledJob<K>>>,
}

impl<K: SubscriberKey> Default for JobStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SubscriberKey> JobStore<K> {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    // Overwrites unconditionally, cancelling the returned job is up to the caller.
    pub async fn put(&self, key: K, job: ScheduledJob<K>) -> Option<ScheduledJob<K>> {
        self.jobs.lock().await.insert(key, job)
    }

    pub async fn get(&self, key: &K) -> Option<ScheduledJob<K>> {
        self.jobs.lock().await.get(key).cloned()
    }

    pub async fn remove_if_exists(&self, key: &K) -> Option<ScheduledJob<K>> {
        self.jobs.lock().await.remove(key)
    }

    // `false` once the entry no longer belongs to job `id`.
    pub async fn advance(
        &self,
        key: &K,
        id: JobId,
        kind: JobKind,
        next_fire_at: NaiveDateTime,
    ) -> bool {
        match self.jobs.lock().await.get_mut(key) {
            Some(job) if job.id == id => {
                job.kind = kind;
                job.next_fire_at = next_fire_at;
                true
            }
            _ => false,
        }
    }

    pub async fn drain(&self) -> Vec<ScheduledJob<K>> {
        self.jobs.lock().await.drain().map(|(_, job)| job).collect()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
