//! Forwards a localtunnel lease to the local listener.

use std::time::Duration;

use serde::Deserialize;
use tokio::net::TcpStream;

use crate::error::{HarpoonError, Result};

pub const DEFAULT_TUNNEL_HOST: &str = "https://localtunnel.me";

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TunnelLease {
    pub id: String,
    pub port: u16,
    #[serde(default = "default_max_conn_count")]
    pub max_conn_count: usize,
    pub url: String,
}

fn default_max_conn_count() -> usize {
    1
}

#[derive(Debug, Clone)]
pub struct LocalTunnel {
    host: String,
    client: reqwest::Client,
}

impl Default for LocalTunnel {
    fn default() -> Self {
        Self::new(DEFAULT_TUNNEL_HOST)
    }
}

impl LocalTunnel {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// `GET {host}/{name}`, or `{host}/?new` for a random subdomain.
    pub fn lease_url(&self, name: &str) -> String {
        if name.is_empty() {
            format!("{}/?new", self.host)
        } else {
            format!("{}/{}", self.host, name)
        }
    }

    /// Host the leased port lives on.
    pub fn remote_host(&self) -> &str {
        let without_scheme = self
            .host
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.host);
        without_scheme
            .split(['/', ':'])
            .next()
            .unwrap_or(without_scheme)
    }

    pub async fn request_lease(&self, name: &str) -> Result<TunnelLease> {
        let url = self.lease_url(name);
        tracing::debug!("Requesting tunnel lease from {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| HarpoonError::TunnelLease(self.host.clone(), e.to_string()))?;

        let lease = response.json::<TunnelLease>().await.map_err(|e| {
            HarpoonError::TunnelLease(self.host.clone(), e.to_string())
        })?;
        tracing::debug!("Tunnel {} leased remote port {}", lease.id, lease.port);

        Ok(lease)
    }

    /// Keeps forwarding remote connections to `local_addr` for as long as the
    /// process lives.
    pub async fn forward(&self, lease: TunnelLease, local_addr: String) {
        let remote = format!("{}:{}", self.remote_host(), lease.port);

        let workers = (0..lease.max_conn_count.max(1))
            .map(|slot| {
                let remote = remote.clone();
                let local_addr = local_addr.clone();
                tokio::spawn(async move {
                    loop {
                        if let Err(e) = splice_once(&remote, &local_addr).await {
                            tracing::debug!(slot, "Tunnel connection closed: {e}");
                        }
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                })
            })
            .collect::<Vec<_>>();

        futures::future::join_all(workers).await;
    }
}

async fn splice_once(remote: &str, local_addr: &str) -> Result<()> {
    let mut remote = TcpStream::connect(remote).await?;
    let mut local = TcpStream::connect(local_addr).await?;

    let (up, down) = tokio::io::copy_bidirectional(&mut remote, &mut local).await?;
    tracing::debug!("Tunnel connection finished, {up} bytes in, {down} bytes out");

    Ok(())
}

/// Address the tunnel should dial to reach our own listener.
pub fn local_dial_address(addr: &str, port: u16) -> String {
    match addr {
        "" | "0.0.0.0" | "::" | "[::]" => format!("127.0.0.1:{port}"),
        addr => format!("{addr}:{port}"),
    }
}
