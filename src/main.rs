mod app_state;
mod command;
mod config;
mod error;
mod handlers;
mod rules;
mod signature;
mod tunnel;
mod webhook_payloads;

use std::path::PathBuf;
use std::sync::Arc;

use app_state::AppState;
use clap::Parser;
use config::Config;
use error::Result;
use signature::WebhookSecret;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tunnel::LocalTunnel;

/// Runs local commands when GitHub webhooks arrive.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log command output and explain discarded deliveries
    #[arg(short, long)]
    verbose: bool,

    /// Log tunnel traffic
    #[arg(long)]
    verbose_tunnel: bool,

    /// Configuration file to load instead of ./config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn default_log_filter(verbose: bool, verbose_tunnel: bool) -> String {
    let mut filter = if verbose {
        "harpoon=debug".to_string()
    } else {
        "harpoon=info".to_string()
    };
    if verbose_tunnel {
        filter.push_str(",harpoon::tunnel=debug");
    }
    filter
}

fn init_tracing(args: &Args) {
    let default_filter = default_log_filter(args.verbose, args.verbose_tunnel);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let (config, config_path) = Config::load(args.config.as_deref())?;
    tracing::info!("Loaded configuration from {}", config_path.display());

    let addr = config.bind_address();
    let Config {
        addr: bind_host,
        port,
        events: rules,
        tunnel: use_tunnel,
        tunnel_name,
    } = config;

    if rules.is_empty() {
        tracing::warn!("No events configured, every delivery will be discarded");
    } else {
        tracing::info!("{} event rules loaded", rules.len());
    }

    let secret = WebhookSecret::from_env();
    if secret.is_disabled() {
        tracing::warn!(
            "{} is not set, webhook signatures will NOT be verified",
            signature::SECRET_ENV_VAR
        );
    }

    let app_state = Arc::new(AppState::new(rules, secret, args.verbose));
    let app = handlers::router(app_state);

    let listener = TcpListener::bind(&addr).await?;

    if use_tunnel {
        let tunnel = LocalTunnel::default();
        let lease = tunnel.request_lease(&tunnel_name).await?;
        tracing::info!("Tunnel URL: {}", lease.url);

        let local_addr = tunnel::local_dial_address(&bind_host, port);
        tokio::spawn(async move {
            tunnel.forward(lease, local_addr).await;
        });
    }

    tracing::info!("Listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_follows_flags() {
        assert_eq!(default_log_filter(false, false), "harpoon=info");
        assert_eq!(default_log_filter(true, false), "harpoon=debug");
        assert_eq!(
            default_log_filter(false, true),
            "harpoon=info,harpoon::tunnel=debug"
        );
    }
}
