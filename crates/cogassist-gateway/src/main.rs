use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use cogassist_core::config::{AccountsConfig, Config};

mod app;
mod collaborators;
mod http;
mod pipeline;
mod provider;
mod state;
mod ws;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cogassist_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("COGASSIST_CONFIG").ok();
    let config = Config::load(config_path.as_deref()).unwrap_or_else(|err| {
        warn!("config load failed ({err}), falling back to a single migrated account");
        let mut config = Config::default();
        config.accounts = AccountsConfig::migrate_legacy_single("Personal", "mail");
        config
    });

    let ws_token = std::env::var("COGASSIST_WS_TOKEN").unwrap_or_else(|_| {
        warn!("COGASSIST_WS_TOKEN not set, WS clients will be unable to authenticate");
        String::new()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(AppState::new(config, ws_token)?);
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("cogassist gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
