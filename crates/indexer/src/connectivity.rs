use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;

const PROBE_TTL: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Reports online when a TCP connection to the provider host succeeds
/// within the timeout. A failed probe is reused for `PROBE_TTL`; a
/// successful one is never reused, so a dropped network is seen on the
/// next lookup.
pub struct HostProbe {
    host: String,
    port: u16,
    timeout: Duration,
    offline_since: Mutex<Option<Instant>>,
}

impl HostProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            offline_since: Mutex::new(None),
        }
    }

    pub fn for_url(url: &Url, timeout: Duration) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(host, port, timeout))
    }
}

#[async_trait]
impl Connectivity for HostProbe {
    async fn is_online(&self) -> bool {
        let offline_since = *self.offline_since.lock();
        if let Some(at) = offline_since {
            if at.elapsed() < PROBE_TTL {
                return false;
            }
        }
        let online = self.probe().await;
        *self.offline_since.lock() = if online { None } else { Some(Instant::now()) };
        online
    }
}

impl HostProbe {
    async fn probe(&self) -> bool {
        let target = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                debug!("Probe to {}:{} failed: {}", self.host, self.port, err);
                false
            }
            Err(_) => {
                debug!("Probe to {}:{} timed out", self.host, self.port);
                false
            }
        }
    }
}

/// Never online. Used when enrichment is disabled.
pub struct Offline;

#[async_trait]
impl Connectivity for Offline {
    async fn is_online(&self) -> bool {
        false
    }
}
