//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod accounts;
pub mod documents;
pub mod health;
pub mod products;
pub mod stock;
pub mod warehouses;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(products::routes())
        .merge(warehouses::routes())
        .merge(accounts::routes())
        .merge(stock::routes())
        .merge(documents::routes())
}
