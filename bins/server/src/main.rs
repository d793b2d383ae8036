//! Makhzan API Server
//!
//! Main entry point for the inventory and ledger service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use makhzan_api::{AppState, create_router};
use makhzan_core::ConsistencyService;
use makhzan_core::document::{PostingAccounts, PostingOptions};
use makhzan_db::{SeaOrmStore, connect};
use makhzan_shared::AppConfig;
use makhzan_shared::types::AccountId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let json = config.logging.json;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "makhzan=debug,tower_http=debug".into()),
        )
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();

    // Connect to database
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    // Wire the consistency service
    let accounts = PostingAccounts {
        inventory: AccountId::from_uuid(config.ledger.inventory_account_id),
        sales_revenue: AccountId::from_uuid(config.ledger.sales_revenue_account_id),
        cost_of_goods_sold: AccountId::from_uuid(config.ledger.cogs_account_id),
    };
    let defaults = PostingOptions {
        allow_negative_stock: config.ledger.allow_negative_stock,
    };
    let service = ConsistencyService::new(Arc::new(SeaOrmStore::new(db)), accounts, defaults);
    info!(
        inventory = %accounts.inventory,
        sales_revenue = %accounts.sales_revenue,
        cost_of_goods_sold = %accounts.cost_of_goods_sold,
        allow_negative_stock = defaults.allow_negative_stock,
        "Consistency service ready"
    );

    // Create router
    let app = create_router(AppState::new(service));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
