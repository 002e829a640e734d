mod app;
mod auth;
mod config;
mod error;
mod extractors;
mod state;
mod users;

use crate::{state::AppState, users::presence::spawn_sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "rideshare=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;
    let config = app_state.config.clone();

    let sweeper = spawn_sweeper(app_state.store.clone(), config.presence.clone());

    let app = app::build_app(app_state);
    let result = app::serve(app, &config.host, config.port).await;

    sweeper.abort();
    result
}
