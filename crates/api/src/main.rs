//! Herald webhook server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use herald_common::config::AppConfig;
use herald_engine::dispatcher::NotificationDispatcher;
use herald_engine::store;
use herald_notifier::build_http_client;
use herald_notifier::credential::{
    CachedTokenExchanger, OAuthTokenExchanger, ServiceCredential, TokenExchanger,
};
use herald_notifier::fcm::{DeliveryHints, FcmSender};

use herald_api::routes::create_router;
use herald_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Herald notification dispatcher...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Shared outbound HTTP client (token endpoint, FCM, PostgREST)
    let http = build_http_client(&config)?;

    // Connect the preference / destination store
    let store = store::connect(&config, http.clone()).await?;

    // Load the push gateway service credential
    let credential = ServiceCredential::from_config(&config)?;
    tracing::info!(
        client_email = %credential.client_email,
        project_id = %credential.project_id,
        "Service credential loaded"
    );

    let exchanger: Arc<dyn TokenExchanger> = if config.fcm_cache_access_token {
        tracing::info!("Access token caching enabled");
        Arc::new(CachedTokenExchanger::new(OAuthTokenExchanger::new(
            http.clone(),
        )))
    } else {
        Arc::new(OAuthTokenExchanger::new(http.clone()))
    };

    let sender = Arc::new(FcmSender::new(
        http,
        config.fcm_base_url.clone(),
        DeliveryHints::from_config(&config),
    ));

    let dispatcher = NotificationDispatcher::new(store, exchanger, sender, credential);

    // Build application state
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("HERALD_BIND_ADDR is not a socket address: {}", e))?;
    let state = AppState::new(dispatcher, config);

    // Build router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!("Webhook server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Herald stopped.");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("herald_api=debug,herald_engine=debug,herald_notifier=debug,tower_http=debug")
    });

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Received shutdown signal, stopping gracefully...");
}
