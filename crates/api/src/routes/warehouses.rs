//! Warehouse routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use tracing::info;

use makhzan_core::catalog::{NewWarehouse, Warehouse, WarehouseUpdate};
use makhzan_shared::types::WarehouseId;

use crate::{AppState, error::ApiError};

/// Creates the warehouse routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route(
            "/warehouses/{warehouse_id}",
            get(get_warehouse).patch(update_warehouse),
        )
        .route("/warehouses/{warehouse_id}/default", post(set_default))
}

/// GET `/warehouses` - List warehouses.
async fn list_warehouses(
    State(state): State<AppState>,
) -> Result<Json<Vec<Warehouse>>, ApiError> {
    Ok(Json(state.service.list_warehouses().await?))
}

/// POST `/warehouses` - Create a warehouse. The first one becomes the default.
async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<NewWarehouse>,
) -> Result<(StatusCode, Json<Warehouse>), ApiError> {
    let warehouse = state.service.create_warehouse(payload).await?;
    info!(
        warehouse_id = %warehouse.id,
        is_default = warehouse.is_default,
        "Warehouse created"
    );
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// GET `/warehouses/{warehouse_id}` - Get a warehouse.
async fn get_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<WarehouseId>,
) -> Result<Json<Warehouse>, ApiError> {
    Ok(Json(state.service.get_warehouse(warehouse_id).await?))
}

/// PATCH `/warehouses/{warehouse_id}` - Rename or (de)activate a warehouse.
async fn update_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<WarehouseId>,
    Json(payload): Json<WarehouseUpdate>,
) -> Result<Json<Warehouse>, ApiError> {
    Ok(Json(
        state.service.update_warehouse(warehouse_id, payload).await?,
    ))
}

/// POST `/warehouses/{warehouse_id}/default` - Make a warehouse the default.
async fn set_default(
    State(state): State<AppState>,
    Path(warehouse_id): Path<WarehouseId>,
) -> Result<Json<Warehouse>, ApiError> {
    Ok(Json(state.service.set_default_warehouse(warehouse_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn test_default_moves_between_warehouses() {
        let app = TestApp::new().await;
        let (status, main) = app
            .send("POST", "/api/v1/warehouses", Some(json!({ "name": "Main" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(main["is_default"], true);

        let (_, annex) = app
            .send("POST", "/api/v1/warehouses", Some(json!({ "name": "Annex" })))
            .await;
        assert_eq!(annex["is_default"], false);

        let annex_id = annex["id"].as_str().unwrap();
        let (status, annex) = app
            .send("POST", &format!("/api/v1/warehouses/{annex_id}/default"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(annex["is_default"], true);

        let main_id = main["id"].as_str().unwrap();
        let (_, main) = app
            .send("GET", &format!("/api/v1/warehouses/{main_id}"), None)
            .await;
        assert_eq!(main["is_default"], false);
    }

    #[tokio::test]
    async fn test_default_warehouse_cannot_be_deactivated() {
        let app = TestApp::new().await;
        let (_, main) = app
            .send("POST", "/api/v1/warehouses", Some(json!({ "name": "Main" })))
            .await;
        let uri = format!("/api/v1/warehouses/{}", main["id"].as_str().unwrap());

        let (status, body) = app
            .send("PATCH", &uri, Some(json!({ "is_active": false })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}
