//! Coordination-store abstraction.
//!
//! The registry and the job lock talk to the store only through the
//! [`CoordStore`] trait, injected at construction. [`EtcdStore`] is the
//! production implementation; [`MemoryStore`] mirrors its semantics in
//! process for deterministic tests and local development.

pub mod etcd;
pub mod memory;

pub use etcd::EtcdStore;
pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Store-issued lease identifier.
pub type LeaseId = i64;

/// Handle to a running lease keepalive.
///
/// The store implementation spawns a driver that renews the lease on a
/// sub-TTL cadence and sends one ack per successful renewal. The channel
/// closing means the lease is no longer being renewed (expired, revoked, or
/// the store is unreachable) and the lease must be considered gone.
pub struct KeepAlive {
    acks: mpsc::Receiver<()>,
}

impl KeepAlive {
    pub fn new(acks: mpsc::Receiver<()>) -> Self {
        Self { acks }
    }

    /// Wait for the next renewal ack. `None` means the lease is gone.
    pub async fn ack(&mut self) -> Option<()> {
        self.acks.recv().await
    }
}

/// Minimal contract this crate needs from a strongly-consistent KV store.
///
/// All operations are linearizable; `acquire_key` is the single
/// compare-and-swap on which lock correctness rests.
#[async_trait]
pub trait CoordStore: Send + Sync + 'static {
    /// Atomic put, returning the previous value if the key existed.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>>;

    /// Put a key bound to a lease; the key is deleted when the lease ends.
    async fn put_with_lease(&self, key: &str, value: Vec<u8>, lease: LeaseId) -> Result<()>;

    /// Atomic delete, returning the previous value if the key existed.
    /// Deleting a missing key is a successful no-op.
    async fn delete(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// All key/value pairs whose key starts with `prefix`.
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Grant a lease with the given time-to-live.
    async fn lease_grant(&self, ttl: Duration) -> Result<LeaseId>;

    /// Start renewing the lease in the background.
    async fn lease_keepalive(&self, lease: LeaseId) -> Result<KeepAlive>;

    /// Revoke the lease immediately, deleting all keys bound to it.
    async fn lease_revoke(&self, lease: LeaseId) -> Result<()>;

    /// Transactionally create `key` bound to `lease` iff it does not exist.
    /// Returns true when this call created the key (won the race).
    async fn acquire_key(&self, key: &str, lease: LeaseId) -> Result<bool>;
}
