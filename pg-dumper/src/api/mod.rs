//! REST API endpoints
//!
//! Handlers are generic over [`DatabaseProvider`] and share one error type,
//! [`ApiError`], which maps crate errors onto HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::database::traits::DatabaseProvider;
use crate::Error;

pub mod export;
pub mod params;
pub mod rows;
pub mod stats;
pub mod tables;

// Re-export handlers for convenience
pub use export::export_handler;
pub use rows::{count_rows_handler, get_rows_handler};
pub use stats::table_stats_handler;
pub use tables::{
    database_overview_handler, get_table_schema_handler, health_handler, list_tables_handler,
    relationships_handler,
};

/// Error returned by every handler
///
/// Serialized as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Database(_) => StatusCode::BAD_GATEWAY,
            Error::Connection(_) | Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }

        (
            status,
            Json(serde_json::json!({
                "error": self.0.to_string()
            })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Create the API router with all endpoints
///
/// # Arguments
///
/// * `database` - Arc-wrapped database provider implementation
pub fn create_api_router<DB: DatabaseProvider>(database: Arc<DB>) -> Router {
    Router::new()
        .route("/health", get(health_handler::<DB>))
        .route("/overview", get(database_overview_handler::<DB>))
        .route("/relationships", get(relationships_handler::<DB>))
        .route("/tables", get(list_tables_handler::<DB>))
        .route("/tables/{name}", get(get_table_schema_handler::<DB>))
        .route("/tables/{name}/rows", get(get_rows_handler::<DB>))
        .route("/tables/{name}/count", get(count_rows_handler::<DB>))
        .route("/tables/{name}/stats", get(table_stats_handler::<DB>))
        .route("/tables/{name}/export/{format}", get(export_handler::<DB>))
        .with_state(database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::NotFound("t".into()), StatusCode::NOT_FOUND),
            (Error::Validation("v".into()), StatusCode::BAD_REQUEST),
            (Error::Encoding("e".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::Database("d".into()), StatusCode::BAD_GATEWAY),
            (Error::Connection("c".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError(error).status(), expected);
        }
    }
}
