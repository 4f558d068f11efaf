use std::time::Duration;

/// Connection settings for the etcd coordination store.
#[derive(Debug, Clone)]
pub struct EtcdConfig {
    /// Cluster endpoints in `host:port` format.
    pub endpoints: Vec<String>,
    /// Timeout for establishing the initial connection.
    pub dial_timeout: Duration,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["127.0.0.1:2379".to_string()],
            dial_timeout: Duration::from_secs(10),
        }
    }
}

/// Settings for the distributed job lock.
///
/// The lease TTL bounds how long a crashed holder can keep a job locked.
/// It must be long enough to survive one keepalive round trip's worth of
/// jitter; the lease is renewed well before expiry, so the TTL is not sized
/// to span a whole job execution.
#[derive(Debug, Clone)]
pub struct LockConfig {
    pub lease_ttl: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_ttl: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MasterConfig {
    pub etcd: EtcdConfig,
    pub lock: LockConfig,
}

impl MasterConfig {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            etcd: EtcdConfig {
                endpoints,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.etcd.endpoints.push(endpoint.into());
        self
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lock.lease_ttl = ttl;
        self
    }
}
