//! Schema inspection endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;

use super::ApiResult;
use crate::database::traits::DatabaseProvider;
use crate::schema::{DatabaseOverview, RelationshipsResponse, TableDescriptor, TablesResponse};

/// Handler for GET /api/tables
///
/// Returns every base table with its size, row count and primary key.
pub async fn list_tables_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
) -> ApiResult<Json<TablesResponse>> {
    let tables = database.table_summaries().await?;
    Ok(Json(TablesResponse { tables }))
}

/// Handler for GET /api/tables/{name}
///
/// Returns the descriptor of one table: columns, primary key and foreign keys.
pub async fn get_table_schema_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
    Path(table_name): Path<String>,
) -> ApiResult<Json<TableDescriptor>> {
    Ok(Json(database.describe_table(&table_name).await?))
}

/// Handler for GET /api/overview
pub async fn database_overview_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
) -> ApiResult<Json<DatabaseOverview>> {
    Ok(Json(database.database_overview().await?))
}

/// Handler for GET /api/relationships
pub async fn relationships_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
) -> ApiResult<Json<RelationshipsResponse>> {
    let relationships = database.relationships().await?;
    Ok(Json(RelationshipsResponse { relationships }))
}

/// Handler for GET /api/health
///
/// Round-trips `SELECT 1` on the shared pool.
pub async fn health_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
) -> ApiResult<Json<serde_json::Value>> {
    database.health_check().await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
