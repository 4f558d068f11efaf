use std::sync::Arc;

use greedy_master::job::{DataSource, ExecutionMode, Job, JobResult, JobStatus};
use greedy_master::keys;
use greedy_master::registry::JobRegistry;
use greedy_master::store::{CoordStore, MemoryStore};
use greedy_master::MasterError;

fn registry() -> (Arc<MemoryStore>, JobRegistry<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let registry = JobRegistry::new(Arc::clone(&store));
    (store, registry)
}

fn cloud_phone_job(name: &str) -> Job {
    Job::new(
        name,
        ExecutionMode::CloudPhone,
        DataSource {
            batch: "b-1".to_string(),
            count: 100,
        },
    )
}

#[tokio::test]
async fn save_returns_none_on_creation() {
    let (_, registry) = registry();
    let prev = registry.save(&cloud_phone_job("batch-0001")).await.unwrap();
    assert!(prev.is_none());
}

#[tokio::test]
async fn save_is_last_write_wins_and_returns_prior_record() {
    let (_, registry) = registry();
    let first = cloud_phone_job("batch-0001");
    registry.save(&first).await.unwrap();

    let mut second = cloud_phone_job("batch-0001");
    second.start();
    let prev = registry.save(&second).await.unwrap().unwrap();
    assert_eq!(prev, first);

    // Exactly one record per name.
    let jobs = registry.list().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Running);
    assert_eq!(jobs[0].id, second.id);
}

#[tokio::test]
async fn delete_missing_name_is_successful_noop() {
    let (_, registry) = registry();
    assert!(registry.delete("never-existed").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_removes_record_and_returns_it() {
    let (_, registry) = registry();
    let job = cloud_phone_job("batch-0001");
    registry.save(&job).await.unwrap();

    let removed = registry.delete("batch-0001").await.unwrap().unwrap();
    assert_eq!(removed, job);
    assert!(registry.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_skips_unparseable_records() {
    let (store, registry) = registry();
    registry.save(&cloud_phone_job("good")).await.unwrap();
    store
        .put(&keys::job_key("bad"), b"{not json".to_vec())
        .await
        .unwrap();

    let jobs = registry.list().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, "good");
}

#[tokio::test]
async fn get_by_id_finds_job_or_fails_not_found() {
    let (_, registry) = registry();
    let job = cloud_phone_job("batch-0001");
    registry.save(&job).await.unwrap();

    let found = registry.get_by_id(&job.id).await.unwrap();
    assert_eq!(found.name, "batch-0001");

    let missing = registry.get_by_id("no-such-id").await;
    assert!(matches!(missing, Err(MasterError::NotFound(_))));
}

#[tokio::test]
async fn stored_payload_round_trips_every_field() {
    let (_, registry) = registry();
    let mut job = cloud_phone_job("batch-0001").with_description("second attempt");
    job.start();
    job.finish(JobResult::Failed);

    registry.save(&job).await.unwrap();
    let back = registry.get_by_id(&job.id).await.unwrap();
    assert_eq!(back, job);
}

#[tokio::test(start_paused = true)]
async fn kill_signal_self_expires() {
    let (store, registry) = registry();
    registry.kill("batch-0001").await.unwrap();

    let signals = store.get_prefix(keys::JOB_KILL_PREFIX).await.unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].0, keys::kill_key("batch-0001"));

    tokio::time::advance(std::time::Duration::from_secs(2)).await;
    assert!(store.get_prefix(keys::JOB_KILL_PREFIX).await.unwrap().is_empty());
}

#[tokio::test]
async fn job_keys_never_collide_with_lock_namespace() {
    let (store, registry) = registry();
    registry.save(&cloud_phone_job("batch-0001")).await.unwrap();
    store
        .put(&keys::lock_key("batch-0001"), Vec::new())
        .await
        .unwrap();

    // Lock churn must never show up in job listings.
    let jobs = registry.list().await.unwrap();
    assert_eq!(jobs.len(), 1);
}
