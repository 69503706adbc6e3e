use thiserror::Error;

pub type Result<T> = anyhow::Result<T>;

#[derive(Error, Debug)]
pub enum HarpoonError {
    #[error("Could not load any configuration, tried {0}")]
    ConfigUnavailable(String),
    #[error("Invalid event key {0:?}, expected <event>:<owner/repo>:<ref|all>")]
    InvalidEventKey(String),
    #[error("Tunnel server {0} did not hand out a lease: {1}")]
    TunnelLease(String, String),
}
