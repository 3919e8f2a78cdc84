use std::net::SocketAddr;
use std::sync::Arc;

use oracle_deck::config::AppConfig;
use oracle_deck::provider::{Provider, ProviderClient};
use oracle_deck::{rate_limit, routes, state};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");

    // Non-fatal: without a key every generation call answers "service unavailable".
    let provider: Option<Arc<dyn Provider>> = match ProviderClient::from_config(config.provider.clone()) {
        Ok(client) => {
            tracing::info!(provider = ?client.kind(), model = client.text_model(), "provider client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, code = e.error_code(), "provider not configured, generation disabled");
            None
        }
    };

    let state = state::AppState::new(&config, provider);
    let _sweeper = rate_limit::spawn_sweeper(state.rate_store.clone(), config.rate_limits.sweep_interval);

    let app = routes::app(state, config.provider.origin());
    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, environment = ?config.environment, "oracle-server listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server failed");
}
