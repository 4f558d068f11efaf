//! In-memory coordination store with etcd-equivalent semantics.
//!
//! Single-process stand-in for [`EtcdStore`]: linearizable through one
//! mutex, leases expire on `tokio::time` so tests under a paused clock are
//! deterministic. Expired leases are purged lazily at the start of every
//! operation rather than by a background sweeper.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{MasterError, Result};
use crate::store::{CoordStore, KeepAlive, LeaseId};

#[derive(Debug, Clone)]
struct Record {
    value: Vec<u8>,
    lease: Option<LeaseId>,
}

#[derive(Debug, Clone)]
struct Lease {
    ttl: Duration,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<String, Record>,
    leases: HashMap<LeaseId, Lease>,
    next_lease: LeaseId,
}

impl Inner {
    /// Drop every expired lease and the keys bound to it.
    fn purge_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<LeaseId> = self
            .leases
            .iter()
            .filter(|(_, lease)| lease.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.leases.remove(&id);
            self.records.retain(|_, record| record.lease != Some(id));
        }
    }

    fn lease_alive(&self, lease: LeaseId) -> bool {
        self.leases.contains_key(&lease)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CoordStore for MemoryStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let mut inner = self.lock_inner();
        inner.purge_expired();
        let prev = inner
            .records
            .insert(key.to_string(), Record { value, lease: None });
        Ok(prev.map(|record| record.value))
    }

    async fn put_with_lease(&self, key: &str, value: Vec<u8>, lease: LeaseId) -> Result<()> {
        let mut inner = self.lock_inner();
        inner.purge_expired();
        if !inner.lease_alive(lease) {
            return Err(MasterError::Internal(format!("lease {lease} not found")));
        }
        inner.records.insert(
            key.to_string(),
            Record {
                value,
                lease: Some(lease),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut inner = self.lock_inner();
        inner.purge_expired();
        Ok(inner.records.remove(key).map(|record| record.value))
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut inner = self.lock_inner();
        inner.purge_expired();
        Ok(inner
            .records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, record)| (key.clone(), record.value.clone()))
            .collect())
    }

    async fn lease_grant(&self, ttl: Duration) -> Result<LeaseId> {
        let mut inner = self.lock_inner();
        inner.purge_expired();
        inner.next_lease += 1;
        let id = inner.next_lease;
        inner.leases.insert(
            id,
            Lease {
                ttl,
                deadline: Instant::now() + ttl,
            },
        );
        Ok(id)
    }

    async fn lease_keepalive(&self, lease: LeaseId) -> Result<KeepAlive> {
        let cadence = {
            let mut inner = self.lock_inner();
            inner.purge_expired();
            match inner.leases.get(&lease) {
                Some(state) => state.ttl / 3,
                None => {
                    return Err(MasterError::Internal(format!("lease {lease} not found")))
                }
            }
        };
        let (tx, rx) = mpsc::channel(1);
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                {
                    let mut inner = store.lock_inner();
                    inner.purge_expired();
                    if !inner.lease_alive(lease) {
                        break;
                    }
                }
                if tx.send(()).await.is_err() {
                    // Holder dropped the KeepAlive; stop renewing.
                    break;
                }
                let mut inner = store.lock_inner();
                if let Some(state) = inner.leases.get_mut(&lease) {
                    state.deadline = Instant::now() + state.ttl;
                } else {
                    break;
                }
            }
        });
        Ok(KeepAlive::new(rx))
    }

    async fn lease_revoke(&self, lease: LeaseId) -> Result<()> {
        let mut inner = self.lock_inner();
        inner.purge_expired();
        // Revoking an unknown lease is a no-op, matching delete-of-nothing.
        inner.leases.remove(&lease);
        inner.records.retain(|_, record| record.lease != Some(lease));
        Ok(())
    }

    async fn acquire_key(&self, key: &str, lease: LeaseId) -> Result<bool> {
        let mut inner = self.lock_inner();
        inner.purge_expired();
        if inner.records.contains_key(key) {
            return Ok(false);
        }
        if !inner.lease_alive(lease) {
            return Err(MasterError::Internal(format!("lease {lease} not found")));
        }
        inner.records.insert(
            key.to_string(),
            Record {
                value: Vec::new(),
                lease: Some(lease),
            },
        );
        Ok(true)
    }
}
