//! Subscription payments server.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_payments::adapters::http::{app_router, SubscriptionAppState};
use subscription_payments::adapters::memory::{InMemoryAccountRepository, InMemoryManualReviewQueue};
use subscription_payments::adapters::payments::PaymentGateways;
use subscription_payments::adapters::postgres::{PostgresAccountRepository, PostgresManualReviewQueue};
use subscription_payments::application::handlers::subscription::{PlanPricing, WebhookVerifiers};
use subscription_payments::config::{AppConfig, WEBHOOK_PATH};
use subscription_payments::ports::{AccountRepository, ManualReviewQueue};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let (accounts, reviews): (Arc<dyn AccountRepository>, Arc<dyn ManualReviewQueue>) =
        match &config.database {
            Some(database) => {
                let pool = PgPoolOptions::new()
                    .min_connections(database.min_connections)
                    .max_connections(database.max_connections)
                    .acquire_timeout(database.acquire_timeout())
                    .connect(&database.url)
                    .await?;
                if database.run_migrations {
                    sqlx::migrate!().run(&pool).await?;
                    tracing::info!("Database migrations applied");
                }
                (
                    Arc::new(PostgresAccountRepository::new(pool.clone())),
                    Arc::new(PostgresManualReviewQueue::new(pool)),
                )
            }
            None => {
                tracing::warn!("No database configured, using in-memory storage");
                (
                    Arc::new(InMemoryAccountRepository::new()),
                    Arc::new(InMemoryManualReviewQueue::new()),
                )
            }
        };

    let gateways = PaymentGateways::from_config(&config.payment)?;
    let pricing = PlanPricing {
        amount_minor_units: config.payment.amount_minor_units,
        currency: config.payment.currency.clone(),
        order_expiry_minutes: config.payment.order_expiry_minutes,
    };

    let mut state = SubscriptionAppState::new(
        accounts,
        reviews,
        gateways.clone(),
        WebhookVerifiers::from_config(&config.payment),
        pricing,
    )
    .with_error_details(!config.is_production());
    match config.admin.api_key() {
        Some(key) => state = state.with_admin_api_key(key.clone()),
        None => tracing::warn!("No admin API key configured, admin endpoints disabled"),
    }

    let app = app_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        providers = ?gateways.available(),
        webhook_path = WEBHOOK_PATH,
        "Subscription payments server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// JSON logs in production, human-readable otherwise.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
