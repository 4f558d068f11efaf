//! Etcd key layout.
//!
//! Three disjoint prefixes share the store: job records, lock keys, and
//! out-of-band kill signals. The prefixes are part of the on-store contract
//! and are inspected by external tooling, so they must not change.

/// Job records live at this prefix followed by the job name.
pub const JOB_SAVE_PREFIX: &str = "/greedy/jobs/save";

/// Kill signals live at this prefix followed by the job name.
pub const JOB_KILL_PREFIX: &str = "/greedy/jobs/kill";

/// Lock keys live at this prefix followed by the job name.
pub const JOB_LOCK_PREFIX: &str = "/greedy/jobs/lock";

/// Key holding the record for the named job.
pub fn job_key(name: &str) -> String {
    format!("{JOB_SAVE_PREFIX}{name}")
}

/// Key holding the kill signal for the named job.
pub fn kill_key(name: &str) -> String {
    format!("{JOB_KILL_PREFIX}{name}")
}

/// Key holding the lock for the named job.
pub fn lock_key(name: &str) -> String {
    format!("{JOB_LOCK_PREFIX}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_disjoint() {
        // No prefix may be a prefix of another, otherwise lock churn could
        // show up in job listings.
        let prefixes = [JOB_SAVE_PREFIX, JOB_KILL_PREFIX, JOB_LOCK_PREFIX];
        for a in &prefixes {
            for b in &prefixes {
                if a != b {
                    assert!(!a.starts_with(b), "{a} collides with {b}");
                }
            }
        }
    }

    #[test]
    fn keys_embed_job_name() {
        assert_eq!(job_key("batch-0001"), "/greedy/jobs/savebatch-0001");
        assert_eq!(kill_key("batch-0001"), "/greedy/jobs/killbatch-0001");
        assert_eq!(lock_key("batch-0001"), "/greedy/jobs/lockbatch-0001");
    }
}
