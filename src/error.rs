use thiserror::Error;

#[derive(Error, Debug)]
pub enum MasterError {
    #[error("Coordination store unavailable: {0}")]
    StoreUnavailable(#[from] etcd_client::Error),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("No jobs available")]
    NoJobsAvailable,

    #[error("No job matched")]
    NoJobMatched,

    #[error("Lock on {0} already held")]
    LockAlreadyHeld(String),

    #[error("Lock transaction commit failed: {0}")]
    LockCommitFailed(String),

    #[error("Stored record could not be parsed: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MasterError>;
