//! Row fetching endpoints with pagination

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use std::sync::Arc;

use super::params::parse_request;
use super::ApiResult;
use crate::database::traits::DatabaseProvider;
use crate::schema::{CountResponse, RowsResponse};

/// Handler for GET /api/tables/{name}/rows
///
/// Fetches one page of rows with search, filters, projection and sorting
/// applied. See [`parse_request`] for the accepted query parameters.
pub async fn get_rows_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
    Path(table_name): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<RowsResponse>> {
    let params = parse_request(&table_name, &pairs)?;
    let result = database.query_page(&params.spec).await?;
    Ok(Json(RowsResponse::from(result)))
}

/// Handler for GET /api/tables/{name}/count
///
/// Returns the number of rows matching the search and filters, ignoring
/// pagination.
pub async fn count_rows_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
    Path(table_name): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<CountResponse>> {
    let params = parse_request(&table_name, &pairs)?;
    let count = database.count_matching(&params.spec).await?;
    Ok(Json(CountResponse { count }))
}
