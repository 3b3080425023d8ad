//! Column statistics endpoint

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use std::sync::Arc;
use tracing::debug;

use super::params::parse_request;
use super::ApiResult;
use crate::database::traits::DatabaseProvider;
use crate::schema::StatsResponse;
use crate::stats::{compute_stats, summarize, StatsScope};

/// Handler for GET /api/tables/{name}/stats
///
/// `scope=page` (default) describes the requested page and includes a
/// [`DataSummary`](crate::schema::DataSummary); `scope=table` describes every
/// matching row using database aggregates.
pub async fn table_stats_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
    Path(table_name): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<StatsResponse>> {
    let params = parse_request(&table_name, &pairs)?;
    debug!(table = %table_name, scope = ?params.scope, "Computing statistics");

    let response = match params.scope {
        StatsScope::Page => {
            let result = database.query_page(&params.spec).await?;
            StatsResponse {
                scope: StatsScope::Page,
                stats: compute_stats(&result),
                summary: Some(summarize(&result)),
            }
        }
        StatsScope::Table => StatsResponse {
            scope: StatsScope::Table,
            stats: database.table_stats(&params.spec).await?,
            summary: None,
        },
    };

    Ok(Json(response))
}
