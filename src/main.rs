use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderName, HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use condo_credits::adapters::http::credits::{api_router, webhook_routes, CreditsAppState};
use condo_credits::adapters::http::credits::handlers::health;
use condo_credits::adapters::postgres::{
    PostgresCatalogReader, PostgresCreditLedger, PostgresManualRequestRepository,
};
use condo_credits::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use condo_credits::application::handlers::credits::{CatalogRefresher, CheckoutUrls};
use condo_credits::config::{AppConfig, ServerConfig};
use condo_credits::domain::credits::WebhookVerification;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.server);

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if config.database.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let ledger = Arc::new(PostgresCreditLedger::new(pool.clone()));
    let manual_requests = Arc::new(PostgresManualRequestRepository::new(pool.clone()));
    let catalog_reader = Arc::new(PostgresCatalogReader::new(pool.clone()));

    let stripe = StripePaymentAdapter::new(StripeConfig::from_payment_config(&config.payment))
        .context("Failed to build Stripe client")?;

    let (refresher, catalog) =
        CatalogRefresher::new(catalog_reader, config.catalog.refresh_interval());
    match refresher.refresh().await {
        Ok(snapshot) => info!(
            packages = snapshot.active_packages().len(),
            costs = snapshot.costs().len(),
            "Catalog loaded"
        ),
        Err(e) => tracing::warn!(error = %e, "Initial catalog load failed, starting empty"),
    }
    let _refresher = refresher.spawn();

    // validate() already rejected strict mode without a secret
    let webhook_verification = WebhookVerification::from_settings(
        config.payment.webhook_secret(),
        config.payment.allow_unsigned_webhooks,
    )
    .context("Webhook secret is required unless unsigned webhooks are allowed")?;
    if webhook_verification.is_relaxed() {
        tracing::warn!("Unsigned Stripe webhooks are accepted; do not use outside development");
    }

    let state = CreditsAppState {
        ledger,
        manual_requests,
        payment_provider: Arc::new(stripe),
        catalog,
        webhook_verification,
        checkout_urls: CheckoutUrls {
            success_url: config.payment.checkout_success_url.clone(),
            cancel_url: config.payment.checkout_cancel_url.clone(),
        },
    };

    let app = axum::Router::new()
        .merge(api_router().layer(cors_layer(&config.server)?))
        .nest("/api/webhooks", webhook_routes())
        .route("/health", axum::routing::get(health))
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr().context("Invalid bind address")?;
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, environment = ?config.server.environment, "Condo credits listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&server.log_level));

    if server.json_logs() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Browser CORS for the API routes. An empty origin list allows any origin.
fn cors_layer(server: &ServerConfig) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-user-id")]);

    let origins = server.cors_origins_list();
    if origins.is_empty() {
        return Ok(cors.allow_origin(tower_http::cors::Any));
    }

    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid CORS origin")?;
    Ok(cors.allow_origin(origins))
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
