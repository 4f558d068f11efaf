//! Facade tying registry, matcher, and lock together for the serving layer.

use std::sync::Arc;

use crate::config::LockConfig;
use crate::error::Result;
use crate::job::{ExecutionMode, Job};
use crate::lock::JobLock;
use crate::matcher::JobMatcher;
use crate::registry::JobRegistry;
use crate::store::CoordStore;

/// The surface the request-handling layer talks to.
///
/// Holds one injected store handle and hands out registry, matcher, and lock
/// operations over it. Cheap to clone; safe for concurrent use.
pub struct JobCoordinator<S: CoordStore> {
    store: Arc<S>,
    registry: JobRegistry<S>,
    matcher: JobMatcher<S>,
    lock: LockConfig,
}

impl<S: CoordStore> Clone for JobCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: self.registry.clone(),
            matcher: JobMatcher::new(self.registry.clone()),
            lock: self.lock.clone(),
        }
    }
}

impl<S: CoordStore> JobCoordinator<S> {
    pub fn new(store: Arc<S>, lock: LockConfig) -> Self {
        let registry = JobRegistry::new(Arc::clone(&store));
        let matcher = JobMatcher::new(registry.clone());
        Self {
            store,
            registry,
            matcher,
            lock,
        }
    }

    pub fn registry(&self) -> &JobRegistry<S> {
        &self.registry
    }

    pub async fn save_job(&self, job: &Job) -> Result<Option<Job>> {
        self.registry.save(job).await
    }

    pub async fn delete_job(&self, name: &str) -> Result<Option<Job>> {
        self.registry.delete(name).await
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.registry.list().await
    }

    pub async fn get_job_by_id(&self, id: &str) -> Result<Job> {
        self.registry.get_by_id(id).await
    }

    pub async fn kill_job(&self, name: &str) -> Result<()> {
        self.registry.kill(name).await
    }

    pub async fn match_job(&self, mode: ExecutionMode) -> Result<Job> {
        self.matcher.match_job(mode).await
    }

    /// Acquire the distributed lock for the named job, returning the held
    /// lock handle. The caller must release it on every exit path.
    pub async fn acquire_lock(&self, job_name: &str) -> Result<JobLock<S>> {
        let mut lock = JobLock::new(Arc::clone(&self.store), job_name, self.lock.lease_ttl);
        lock.try_lock().await?;
        Ok(lock)
    }
}
