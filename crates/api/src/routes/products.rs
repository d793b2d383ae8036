//! Product catalog routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::info;

use makhzan_core::catalog::{NewProduct, Product, ProductUpdate};
use makhzan_shared::types::ProductId;

use crate::{AppState, error::ApiError};

/// Creates the product routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{product_id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

/// GET `/products` - List products ordered by code.
async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.service.list_products().await?))
}

/// POST `/products` - Create a product.
async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.service.create_product(payload).await?;
    info!(product_id = %product.id, code = %product.code, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET `/products/{product_id}` - Get a product.
async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.service.get_product(product_id).await?))
}

/// PATCH `/products/{product_id}` - Update name, unit, prices or active flag.
async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(payload): Json<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.service.update_product(product_id, payload).await?))
}

/// DELETE `/products/{product_id}` - Delete a product nothing references.
async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_product(product_id).await?;
    info!(product_id = %product_id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::TestApp;

    fn widget() -> serde_json::Value {
        json!({
            "code": "W-1",
            "name": "Widget",
            "unit": "pcs",
            "cost_price": "5",
            "sell_price": "8"
        })
    }

    #[tokio::test]
    async fn test_create_and_fetch_product() {
        let app = TestApp::new().await;

        let (status, created) = app.send("POST", "/api/v1/products", Some(widget())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["code"], "W-1");
        assert_eq!(created["is_active"], true);

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = app.send("GET", &format!("/api/v1/products/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Widget");
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() {
        let app = TestApp::new().await;
        app.send("POST", "/api/v1/products", Some(widget())).await;

        let (status, body) = app.send("POST", "/api/v1/products", Some(widget())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "DUPLICATE");
    }

    #[tokio::test]
    async fn test_update_and_delete_product() {
        let app = TestApp::new().await;
        let (_, created) = app.send("POST", "/api/v1/products", Some(widget())).await;
        let uri = format!("/api/v1/products/{}", created["id"].as_str().unwrap());

        let (status, updated) = app
            .send("PATCH", &uri, Some(json!({ "sell_price": "9.5" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["sell_price"], "9.5");

        let (status, _) = app.send("DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app.send("GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }
}
