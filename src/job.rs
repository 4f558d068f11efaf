use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a job is executed by the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Simulator,
    CloudPhone,
    Agent,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Simulator => write!(f, "simulator"),
            ExecutionMode::CloudPhone => write!(f, "cloud_phone"),
            ExecutionMode::Agent => write!(f, "agent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Done => write!(f, "done"),
        }
    }
}

/// Outcome of an execution. Only meaningful once the job is `Done`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobResult {
    #[default]
    Unset,
    Successful,
    Failed,
}

/// Reference to the bulk input data a job crawls over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Batch identifier in the upstream source store.
    pub batch: String,
    /// Requested number of items from the batch.
    pub count: u32,
}

/// The unit of coordinated work.
///
/// `name` doubles as the store key suffix and the lock name; `id` is an
/// opaque label used only for point lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub source: DataSource,
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub description: String,
    pub status: JobStatus,
    #[serde(default)]
    pub result: JobResult,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(name: impl Into<String>, execution_mode: ExecutionMode, source: DataSource) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            source,
            execution_mode,
            description: String::new(),
            status: JobStatus::Pending,
            result: JobResult::Unset,
            created_at: Utc::now(),
            started_at: None,
            stopped_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether this job may be offered to a worker running in `mode`.
    ///
    /// Running jobs are excluded as a cheap pre-filter (the lock is the
    /// authoritative guard). Done jobs that succeeded are permanently out;
    /// Done jobs that failed stay eligible for retry.
    pub fn matchable(&self, mode: ExecutionMode) -> bool {
        self.execution_mode == mode
            && self.status != JobStatus::Running
            && !(self.status == JobStatus::Done && self.result == JobResult::Successful)
    }

    /// Mark the job as picked up by a worker.
    pub fn start(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Record the reported outcome of an execution.
    pub fn finish(&mut self, result: JobResult) {
        self.status = JobStatus::Done;
        self.result = result;
        self.stopped_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(mode: ExecutionMode, status: JobStatus, result: JobResult) -> Job {
        let mut job = Job::new("j", mode, DataSource::default());
        job.status = status;
        job.result = result;
        job
    }

    #[test]
    fn new_job_is_pending_with_unset_result() {
        let job = Job::new("batch-0001", ExecutionMode::CloudPhone, DataSource::default());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.result, JobResult::Unset);
        assert!(job.started_at.is_none());
        assert!(job.stopped_at.is_none());
    }

    #[test]
    fn matchable_filters_mode_and_lifecycle() {
        use ExecutionMode::*;
        use JobResult::*;
        use JobStatus::*;

        assert!(job(CloudPhone, Pending, Unset).matchable(CloudPhone));
        assert!(!job(Simulator, Pending, Unset).matchable(CloudPhone));
        assert!(!job(CloudPhone, Running, Unset).matchable(CloudPhone));
        assert!(!job(CloudPhone, Done, Successful).matchable(CloudPhone));
        // Failed executions stay eligible for retry.
        assert!(job(CloudPhone, Done, Failed).matchable(CloudPhone));
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let mut job = Job::new("batch-0001", ExecutionMode::Agent, DataSource {
            batch: "b-7".to_string(),
            count: 500,
        })
        .with_description("retry of batch 7");
        job.start();
        job.finish(JobResult::Failed);

        let bytes = serde_json::to_vec(&job).unwrap();
        let back: Job = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn unset_result_survives_round_trip() {
        let job = Job::new("batch-0002", ExecutionMode::Simulator, DataSource::default());
        let bytes = serde_json::to_vec(&job).unwrap();
        let back: Job = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.result, JobResult::Unset);
        assert_eq!(back, job);
    }
}
