use std::{net::SocketAddr, sync::Arc, time::Duration};

mod app;
mod auth;
mod config;
mod db;
mod error;
mod messages;
mod session;
mod state;
#[cfg(test)]
mod testing;

use crate::{config::AppConfig, session::spawn_pruner, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "clubhouse=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let db = db::connect(&config).await?;
    let state = AppState::from_pool(db.clone(), config.clone())?;

    let pruner = spawn_pruner(
        state.sessions.clone(),
        Duration::from_secs(config.session.prune_interval_secs.max(1)),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let served = app::serve(app::build_app(state), addr).await;

    pruner.abort();
    db.close().await;
    tracing::info!("database pool closed");

    served
}
