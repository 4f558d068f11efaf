//! Canonical job registry over the coordination store.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{MasterError, Result};
use crate::job::Job;
use crate::keys;
use crate::store::CoordStore;

/// Kill signals self-expire after this long.
const KILL_SIGNAL_TTL: Duration = Duration::from_secs(1);

/// Owns the set of job records, keyed by name under [`keys::JOB_SAVE_PREFIX`].
///
/// Every operation is one store round trip; store errors propagate unchanged
/// and nothing is retried here — retry policy belongs to the caller.
pub struct JobRegistry<S: CoordStore> {
    store: Arc<S>,
}

impl<S: CoordStore> Clone for JobRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CoordStore> JobRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Upsert a job by name. Returns the prior record when this overwrote an
    /// existing job, `None` when it was a creation.
    pub async fn save(&self, job: &Job) -> Result<Option<Job>> {
        let key = keys::job_key(&job.name);
        let value = serde_json::to_vec(job)?;
        let prev = self.store.put(&key, value).await?;
        tracing::debug!(name = %job.name, id = %job.id, status = %job.status, "job saved");
        match prev {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove the job, returning the removed record. A missing name is a
    /// successful no-op returning `None`.
    pub async fn delete(&self, name: &str) -> Result<Option<Job>> {
        let prev = self.store.delete(&keys::job_key(name)).await?;
        tracing::debug!(name, removed = prev.is_some(), "job deleted");
        match prev {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All jobs under the registry prefix. Records that fail to deserialize
    /// are skipped so one corrupt value never aborts the whole listing.
    pub async fn list(&self) -> Result<Vec<Job>> {
        let pairs = self.store.get_prefix(keys::JOB_SAVE_PREFIX).await?;
        let mut jobs = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            match serde_json::from_slice::<Job>(&value) {
                Ok(job) => jobs.push(job),
                Err(err) => {
                    tracing::warn!(%key, %err, "skipping unparseable job record");
                }
            }
        }
        Ok(jobs)
    }

    /// Point lookup by id. The store only indexes by name, so this is a
    /// linear scan over the listing.
    pub async fn get_by_id(&self, id: &str) -> Result<Job> {
        self.list()
            .await?
            .into_iter()
            .find(|job| job.id == id)
            .ok_or_else(|| MasterError::NotFound(id.to_string()))
    }

    /// Signal out-of-band termination of the named job by writing its kill
    /// key bound to a short lease, so the signal self-expires after one TTL.
    pub async fn kill(&self, name: &str) -> Result<()> {
        let lease = self.store.lease_grant(KILL_SIGNAL_TTL).await?;
        self.store
            .put_with_lease(&keys::kill_key(name), Vec::new(), lease)
            .await?;
        tracing::info!(name, "kill signal written");
        Ok(())
    }
}
