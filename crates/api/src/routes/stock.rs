//! Stock level, movement, adjustment and transfer routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Serialize;

use makhzan_core::consistency::{StockAdjustment, StockTransfer, TransferOutcome};
use makhzan_core::stock::{MovementFilter, StockMovement};
use makhzan_shared::types::{ProductId, WarehouseId};

use crate::{AppState, error::ApiError};

/// Creates the stock routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stock/levels/{product_id}/{warehouse_id}", get(get_level))
        .route("/stock/movements", get(list_movements))
        .route("/stock/adjustments", post(adjust))
        .route("/stock/transfers", post(transfer))
}

/// Response for a stock level.
#[derive(Debug, Serialize)]
pub struct StockLevelResponse {
    /// The product.
    pub product_id: ProductId,
    /// The warehouse.
    pub warehouse_id: WarehouseId,
    /// Quantity on hand; zero when the cell never moved.
    pub quantity: Decimal,
}

/// GET `/stock/levels/{product_id}/{warehouse_id}` - Quantity on hand.
async fn get_level(
    State(state): State<AppState>,
    Path((product_id, warehouse_id)): Path<(ProductId, WarehouseId)>,
) -> Result<Json<StockLevelResponse>, ApiError> {
    let quantity = state
        .service
        .get_stock_level(product_id, warehouse_id)
        .await?;
    Ok(Json(StockLevelResponse {
        product_id,
        warehouse_id,
        quantity,
    }))
}

/// GET `/stock/movements` - Movements matching the query, newest first.
async fn list_movements(
    State(state): State<AppState>,
    Query(filter): Query<MovementFilter>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    Ok(Json(state.service.list_stock_movements(&filter).await?))
}

/// POST `/stock/adjustments` - Record a physical count.
async fn adjust(
    State(state): State<AppState>,
    Json(payload): Json<StockAdjustment>,
) -> Result<(StatusCode, Json<StockMovement>), ApiError> {
    let movement = state.service.adjust_stock(payload).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// POST `/stock/transfers` - Move stock between two warehouses.
async fn transfer(
    State(state): State<AppState>,
    Json(payload): Json<StockTransfer>,
) -> Result<(StatusCode, Json<TransferOutcome>), ApiError> {
    let outcome = state.service.transfer_stock(payload).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::test_support::TestApp;

    async fn create(app: &TestApp, uri: &str, body: Value) -> String {
        let (status, body) = app.send("POST", uri, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn setup(app: &TestApp) -> (String, String, String) {
        let product = create(
            app,
            "/api/v1/products",
            json!({ "code": "W-1", "name": "Widget", "unit": "pcs", "cost_price": "5", "sell_price": "8" }),
        )
        .await;
        let main = create(app, "/api/v1/warehouses", json!({ "name": "Main" })).await;
        let annex = create(app, "/api/v1/warehouses", json!({ "name": "Annex" })).await;
        (product, main, annex)
    }

    #[tokio::test]
    async fn test_adjustment_sets_level() {
        let app = TestApp::new().await;
        let (product, main, _) = setup(&app).await;

        let (status, movement) = app
            .send(
                "POST",
                "/api/v1/stock/adjustments",
                Some(json!({
                    "product_id": product,
                    "warehouse_id": main,
                    "counted_quantity": "12",
                    "note": "opening count"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(movement["delta"], "12");
        assert_eq!(movement["kind"], "adjustment");

        let (status, level) = app
            .send("GET", &format!("/api/v1/stock/levels/{product}/{main}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(level["quantity"], "12");
    }

    #[tokio::test]
    async fn test_transfer_moves_between_warehouses() {
        let app = TestApp::new().await;
        let (product, main, annex) = setup(&app).await;
        app.send(
            "POST",
            "/api/v1/stock/adjustments",
            Some(json!({ "product_id": product, "warehouse_id": main, "counted_quantity": "10" })),
        )
        .await;

        let (status, outcome) = app
            .send(
                "POST",
                "/api/v1/stock/transfers",
                Some(json!({
                    "product_id": product,
                    "from_warehouse_id": main,
                    "to_warehouse_id": annex,
                    "quantity": "4"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(outcome["outgoing"]["quantity_after"], "6");
        assert_eq!(outcome["incoming"]["quantity_after"], "4");

        let (_, movements) = app
            .send("GET", &format!("/api/v1/stock/movements?product_id={product}"), None)
            .await;
        assert_eq!(movements.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_transfer_beyond_stock_is_rejected() {
        let app = TestApp::new().await;
        let (product, main, annex) = setup(&app).await;

        let (status, body) = app
            .send(
                "POST",
                "/api/v1/stock/transfers",
                Some(json!({
                    "product_id": product,
                    "from_warehouse_id": main,
                    "to_warehouse_id": annex,
                    "quantity": "1"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "INSUFFICIENT_STOCK");
    }
}
