//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use makhzan_core::LedgerError;

/// A ledger error on its way out as an HTTP response.
///
/// The body is always `{"error": <code>, "message": <text>}`. Server errors hide their
/// message from the client and are logged instead.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            error!(error = %self.0, code = self.0.error_code(), "Request failed");
            "An error occurred".to_string()
        } else {
            warn!(error = %self.0, code = self.0.error_code(), "Request rejected");
            self.0.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use makhzan_core::store::StoreError;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError(LedgerError::not_found("product", "p-1")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_conflict_maps_to_503() {
        let err = LedgerError::Storage(StoreError::conflict("deadlock detected"));
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_storage_failure_maps_to_500() {
        let err = LedgerError::Storage(StoreError::database("connection reset"));
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
