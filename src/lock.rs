//! Lease-based distributed mutual exclusion for jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{MasterError, Result};
use crate::keys;
use crate::store::{CoordStore, LeaseId};

/// Exclusive, time-bounded ownership of a named job.
///
/// One instance per acquisition attempt. The lock key exists only while the
/// backing lease is renewed; if the holder's process dies the key
/// self-expires within one TTL window instead of deadlocking the job.
///
/// Lease loss while held is not surfaced synchronously. A background
/// watcher marks the lock lost when renewal stops; holders should check
/// [`JobLock::is_lost`] (or await [`JobLock::lost_token`]) before committing
/// side effects that depend on still holding exclusivity.
pub struct JobLock<S: CoordStore> {
    store: Arc<S>,
    job_name: String,
    lease_ttl: Duration,
    lease_id: Option<LeaseId>,
    renew_cancel: Option<CancellationToken>,
    lost: CancellationToken,
    locked: bool,
}

impl<S: CoordStore> JobLock<S> {
    pub fn new(store: Arc<S>, job_name: impl Into<String>, lease_ttl: Duration) -> Self {
        Self {
            store,
            job_name: job_name.into(),
            lease_ttl,
            lease_id: None,
            renew_cancel: None,
            lost: CancellationToken::new(),
            locked: false,
        }
    }

    /// Attempt to acquire the lock. Fails fast; never waits for a holder.
    ///
    /// Grants a short lease, starts renewing it, then runs the
    /// create-revision transaction that decides the race. On
    /// [`MasterError::LockAlreadyHeld`] or [`MasterError::LockCommitFailed`]
    /// renewal is cancelled and the fresh lease is abandoned to TTL expiry.
    pub async fn try_lock(&mut self) -> Result<()> {
        let lease = self.store.lease_grant(self.lease_ttl).await?;
        let mut keepalive = self.store.lease_keepalive(lease).await?;

        let cancel = CancellationToken::new();
        let watcher_cancel = cancel.clone();
        let lost = self.lost.clone();
        let job_name = self.job_name.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = watcher_cancel.cancelled() => break,
                    ack = keepalive.ack() => match ack {
                        Some(()) => {}
                        None => {
                            // Renewal stopped: the lease (and the lock key)
                            // is gone or about to be.
                            tracing::warn!(job = %job_name, "job lock lease lost");
                            lost.cancel();
                            break;
                        }
                    },
                }
            }
        });

        let lock_key = keys::lock_key(&self.job_name);
        match self.store.acquire_key(&lock_key, lease).await {
            Ok(true) => {
                self.lease_id = Some(lease);
                self.renew_cancel = Some(cancel);
                self.locked = true;
                tracing::debug!(job = %self.job_name, lease, "job lock acquired");
                Ok(())
            }
            Ok(false) => {
                cancel.cancel();
                Err(MasterError::LockAlreadyHeld(self.job_name.clone()))
            }
            Err(err) => {
                cancel.cancel();
                Err(MasterError::LockCommitFailed(err.to_string()))
            }
        }
    }

    /// Release the lock. No-op unless currently held.
    ///
    /// Revoking the lease deletes the lock key immediately so the next
    /// contender need not wait out the TTL. Revocation failures are logged,
    /// not propagated: the lease expires on its own and unlock must never
    /// block the caller's cleanup path.
    pub async fn unlock(&mut self) {
        if !self.locked {
            return;
        }
        self.locked = false;
        if let Some(cancel) = self.renew_cancel.take() {
            cancel.cancel();
        }
        if let Some(lease) = self.lease_id.take() {
            if let Err(err) = self.store.lease_revoke(lease).await {
                tracing::warn!(job = %self.job_name, %err, "lease revoke failed during unlock");
            }
        }
        tracing::debug!(job = %self.job_name, "job lock released");
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lease_id(&self) -> Option<LeaseId> {
        self.lease_id
    }

    /// Whether the lease stopped renewing while the lock was held.
    pub fn is_lost(&self) -> bool {
        self.lost.is_cancelled()
    }

    /// Token cancelled when the lease stops renewing, for holders that want
    /// to abort in-flight work instead of polling.
    pub fn lost_token(&self) -> CancellationToken {
        self.lost.clone()
    }
}

impl<S: CoordStore> Drop for JobLock<S> {
    /// An abandoned instance must not leak its renewal watcher. The lease
    /// itself cannot be revoked here (no async in drop); it expires within
    /// one TTL once renewal stops.
    fn drop(&mut self) {
        if let Some(cancel) = self.renew_cancel.take() {
            cancel.cancel();
        }
    }
}
