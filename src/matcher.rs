//! Randomized job selection for work dispatch.

use rand::seq::SliceRandom;

use crate::error::{MasterError, Result};
use crate::job::{ExecutionMode, Job};
use crate::registry::JobRegistry;
use crate::store::CoordStore;

/// Picks one eligible job for a given execution mode.
///
/// Matching is advisory only: it takes no locks, and a matched job may be
/// claimed by another worker before the caller acquires the job lock. The
/// lock, never the match, is the correctness guarantee; callers must always
/// gate state-mutating work behind a successful lock acquisition.
pub struct JobMatcher<S: CoordStore> {
    registry: JobRegistry<S>,
}

impl<S: CoordStore> JobMatcher<S> {
    pub fn new(registry: JobRegistry<S>) -> Self {
        Self { registry }
    }

    /// Return one job eligible for `mode`.
    ///
    /// The full listing is shuffled before the scan so equally eligible jobs
    /// are offered in random order, spreading lock contention across them
    /// instead of piling every worker onto the same first candidate.
    pub async fn match_job(&self, mode: ExecutionMode) -> Result<Job> {
        let mut jobs = match self.registry.list().await {
            Ok(jobs) if !jobs.is_empty() => jobs,
            Ok(_) => return Err(MasterError::NoJobsAvailable),
            Err(err) => {
                tracing::error!(%err, "job listing failed during match");
                return Err(MasterError::NoJobsAvailable);
            }
        };
        jobs.shuffle(&mut rand::thread_rng());
        jobs.into_iter()
            .find(|job| job.matchable(mode))
            .ok_or(MasterError::NoJobMatched)
    }
}
