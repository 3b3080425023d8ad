//! Download endpoint

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use super::params::parse_request;
use super::ApiResult;
use crate::database::traits::DatabaseProvider;
use crate::export::{encode, export_file_name, ExportFormat};
use crate::stats::StatsScope;

/// Handler for GET /api/tables/{name}/export/{format}
///
/// `format` is `csv`, `json` or `xlsx`. With `scope=page` (default) the
/// requested page is exported; with `scope=table` every matching row up to
/// the export cap.
pub async fn export_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
    Path((table_name, format)): Path<(String, String)>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let format: ExportFormat = format.parse()?;
    let params = parse_request(&table_name, &pairs)?;

    let full_table = params.scope == StatsScope::Table;
    let result = if full_table {
        database.query_all(&params.spec).await?
    } else {
        database.query_page(&params.spec).await?
    };

    let body = encode(&result, format)?;
    let file_name = export_file_name(
        &table_name,
        format,
        full_table,
        chrono::Local::now().naive_local(),
    );
    info!(
        table = %table_name,
        format = format.extension(),
        rows = result.rows.len(),
        bytes = body.len(),
        "Exported rows"
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}
