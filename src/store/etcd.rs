//! etcd-backed coordination store.

use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{
    Client, Compare, CompareOp, ConnectOptions, DeleteOptions, GetOptions, LeaseKeepAliveStream,
    LeaseKeeper, PutOptions, Txn, TxnOp,
};
use tokio::sync::mpsc;

use crate::config::EtcdConfig;
use crate::error::Result;
use crate::store::{CoordStore, KeepAlive, LeaseId};

/// How often the keepalive driver renews a lease. Lease TTLs must
/// comfortably exceed this cadence.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// [`CoordStore`] over a real etcd cluster.
///
/// The client is channel-based and cheap to clone; each operation works on
/// its own clone because the etcd API takes `&mut self`.
#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    /// Connect to the cluster described by `config`.
    pub async fn connect(config: &EtcdConfig) -> Result<Self> {
        let options = ConnectOptions::new().with_connect_timeout(config.dial_timeout);
        let client = Client::connect(&config.endpoints, Some(options)).await?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CoordStore for EtcdStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let mut client = self.client.clone();
        let resp = client
            .put(key, value, Some(PutOptions::new().with_prev_key()))
            .await?;
        Ok(resp.prev_key().map(|kv| kv.value().to_vec()))
    }

    async fn put_with_lease(&self, key: &str, value: Vec<u8>, lease: LeaseId) -> Result<()> {
        let mut client = self.client.clone();
        client
            .put(key, value, Some(PutOptions::new().with_lease(lease)))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut client = self.client.clone();
        let resp = client
            .delete(key, Some(DeleteOptions::new().with_prev_key()))
            .await?;
        Ok(resp.prev_kvs().first().map(|kv| kv.value().to_vec()))
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut client = self.client.clone();
        let resp = client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await?;
        let mut pairs = Vec::with_capacity(resp.kvs().len());
        for kv in resp.kvs() {
            pairs.push((
                String::from_utf8_lossy(kv.key()).into_owned(),
                kv.value().to_vec(),
            ));
        }
        Ok(pairs)
    }

    async fn lease_grant(&self, ttl: Duration) -> Result<LeaseId> {
        let mut client = self.client.clone();
        let resp = client.lease_grant(ttl.as_secs() as i64, None).await?;
        Ok(resp.id())
    }

    async fn lease_keepalive(&self, lease: LeaseId) -> Result<KeepAlive> {
        let mut client = self.client.clone();
        let (keeper, stream) = client.lease_keep_alive(lease).await?;
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(drive_keepalive(keeper, stream, tx));
        Ok(KeepAlive::new(rx))
    }

    async fn lease_revoke(&self, lease: LeaseId) -> Result<()> {
        let mut client = self.client.clone();
        client.lease_revoke(lease).await?;
        Ok(())
    }

    async fn acquire_key(&self, key: &str, lease: LeaseId) -> Result<bool> {
        let mut client = self.client.clone();
        // IF create_revision == 0 (key absent) THEN put-with-lease ELSE get.
        // Exactly one concurrent transaction can observe "absent" and win.
        let txn = Txn::new()
            .when(vec![Compare::create_revision(key, CompareOp::Equal, 0)])
            .and_then(vec![TxnOp::put(
                key,
                Vec::new(),
                Some(PutOptions::new().with_lease(lease)),
            )])
            .or_else(vec![TxnOp::get(key, None)]);
        let resp = client.txn(txn).await?;
        Ok(resp.succeeded())
    }
}

/// Renew the lease on a fixed cadence, acking each successful renewal.
///
/// Exits (dropping the ack sender) when the lease stops renewing or the
/// holder drops its [`KeepAlive`].
async fn drive_keepalive(
    mut keeper: LeaseKeeper,
    mut stream: LeaseKeepAliveStream,
    tx: mpsc::Sender<()>,
) {
    let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
    loop {
        ticker.tick().await;
        if keeper.keep_alive().await.is_err() {
            break;
        }
        match stream.message().await {
            Ok(Some(resp)) if resp.ttl() > 0 => {
                if tx.send(()).await.is_err() {
                    // Holder is gone; stop renewing and let the lease expire.
                    break;
                }
            }
            // TTL of zero means the lease already expired server-side.
            _ => break,
        }
    }
}
