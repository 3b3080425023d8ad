//! Query-string parsing shared by the row, stats and export endpoints
//!
//! Recognized parameters:
//! - `page`: zero-based page index (default 0)
//! - `pageSize`: rows per page (default 50, clamped by the query builder)
//! - `search`: substring matched against text columns
//! - `sortBy` / `sortOrder`: `asc`/`ascending` or `desc`/`descending`
//! - `columns`: comma-separated projection
//! - `filter`: repeated, `column:op:value` with op `eq`, `gte` or `lte`
//! - `scope`: `page` or `table`
//!
//! Unknown parameters are ignored.

use crate::schema::{ColumnFilter, FilterPredicate, QuerySpec, SortOrder};
use crate::stats::StatsScope;
use crate::{Error, Result};

/// A parsed request: the query spec plus the requested scope
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParams {
    pub spec: QuerySpec,
    pub scope: StatsScope,
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        Error::Validation(format!(
            "{name} must be a non-negative integer, got '{value}'"
        ))
    })
}

fn parse_sort_order(value: &str) -> Result<SortOrder> {
    match value.to_ascii_lowercase().as_str() {
        "asc" | "ascending" => Ok(SortOrder::Ascending),
        "desc" | "descending" => Ok(SortOrder::Descending),
        other => Err(Error::Validation(format!(
            "sortOrder must be asc or desc, got '{other}'"
        ))),
    }
}

fn parse_scope(value: &str) -> Result<StatsScope> {
    match value.to_ascii_lowercase().as_str() {
        "page" => Ok(StatsScope::Page),
        "table" | "full" => Ok(StatsScope::Table),
        other => Err(Error::Validation(format!(
            "scope must be page or table, got '{other}'"
        ))),
    }
}

/// Apply one `column:op:value` filter, merging range bounds on the same column
fn apply_filter(spec: &mut QuerySpec, raw: &str) -> Result<()> {
    let mut parts = raw.splitn(3, ':');
    let (column, op, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(column), Some(op), Some(value)) if !column.is_empty() => (column, op, value),
        _ => {
            return Err(Error::Validation(format!(
                "filter '{raw}' must look like column:op:value"
            )))
        }
    };

    let value = value.to_string();
    match op {
        "eq" => {
            spec.filters.push(ColumnFilter {
                column: column.to_string(),
                predicate: FilterPredicate::Equals { value },
            });
        }
        "gte" | "lte" => {
            let existing = spec.filters.iter().position(|filter| {
                filter.column == column && matches!(filter.predicate, FilterPredicate::Range { .. })
            });

            let index = match existing {
                Some(index) => index,
                None => {
                    spec.filters.push(ColumnFilter {
                        column: column.to_string(),
                        predicate: FilterPredicate::Range { min: None, max: None },
                    });
                    spec.filters.len() - 1
                }
            };

            if let FilterPredicate::Range { min, max } = &mut spec.filters[index].predicate {
                if op == "gte" {
                    *min = Some(value);
                } else {
                    *max = Some(value);
                }
            }
        }
        other => {
            return Err(Error::Validation(format!(
                "unsupported filter operator '{other}' (expected eq, gte or lte)"
            )))
        }
    }

    Ok(())
}

/// Build request parameters for `table` from raw query pairs
pub fn parse_request(table: &str, pairs: &[(String, String)]) -> Result<RequestParams> {
    let mut spec = QuerySpec::new(table);
    let mut scope = StatsScope::default();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => spec.page = parse_number("page", value)?,
            "pageSize" | "page_size" => spec.page_size = parse_number("pageSize", value)?,
            "search" => {
                if !value.trim().is_empty() {
                    spec.search = Some(value.clone());
                }
            }
            "sortBy" | "sort_by" => {
                if !value.is_empty() {
                    spec.sort_by = Some(value.clone());
                }
            }
            "sortOrder" | "sort_order" => spec.sort_order = Some(parse_sort_order(value)?),
            "columns" => {
                let columns: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|column| !column.is_empty())
                    .map(String::from)
                    .collect();
                if !columns.is_empty() {
                    spec.columns = Some(columns);
                }
            }
            "filter" => apply_filter(&mut spec, value)?,
            "scope" => scope = parse_scope(value)?,
            _ => {}
        }
    }

    Ok(RequestParams { spec, scope })
}
