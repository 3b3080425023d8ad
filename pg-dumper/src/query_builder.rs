//! Parameterized query construction
//!
//! Every statement produced here keeps user-supplied values out of the SQL
//! text: search terms, filter values, limits and offsets travel as bound
//! parameters. Table and column identifiers cannot be parameterized, so they
//! are embedded only after an exact match against a [`TableDescriptor`]
//! obtained from the catalog, and are always quoted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::schema::{
    ColumnDescriptor, ColumnFilter, FilterPredicate, QuerySpec, ResultColumn, SortOrder,
    TableDescriptor, TypeCategory,
};
use crate::{Error, Result};

/// Maximum allowed page size to prevent excessive memory usage
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 500;

/// Maximum rows materialized by a full-table export
pub const DEFAULT_MAX_EXPORT_ROWS: u64 = 100_000;

/// Number of most frequent values reported per non-numeric column
pub const TOP_VALUES_LIMIT: usize = 5;

/// Upper bounds on how many rows a single request may materialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserLimits {
    pub max_page_size: u64,
    pub max_export_rows: u64,
}

impl Default for BrowserLimits {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_export_rows: DEFAULT_MAX_EXPORT_ROWS,
        }
    }
}

/// A value passed to the driver out-of-band from the SQL text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    Integer(i64),
}

/// SQL text plus its positional parameters (`$1`, `$2`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<BindValue>,
}

/// Statements for one page of rows and its total count
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    /// Row query with LIMIT/OFFSET
    pub select: Statement,

    /// `COUNT(*)` with the same filters and no pagination
    pub count: Statement,

    /// Columns the row query returns, in order
    pub columns: Vec<ResultColumn>,

    /// The request after page-size clamping
    pub spec: QuerySpec,
}

/// Statements computing full-table statistics for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnAggregate {
    pub column: ResultColumn,

    /// One row: total_count, null_count, distinct_count, min_value,
    /// max_value, mean_value, median_value, std_dev_value, min_length,
    /// max_length, mean_length
    pub summary: Statement,

    /// Rows of (value, occurrences); absent for numeric columns
    pub top_values: Option<Statement>,
}

/// Build the page and count statements for a request
///
/// Shorthand for [`QueryBuilder::build`].
pub fn build_query(
    schema: &str,
    table: &TableDescriptor,
    limits: BrowserLimits,
    spec: &QuerySpec,
) -> Result<BuiltQuery> {
    QueryBuilder::new(schema, table, limits).build(spec)
}

/// Quote an identifier to prevent SQL injection
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Escape LIKE wildcards so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for character in term.chars() {
        if matches!(character, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

/// Whether the driver decodes this native type directly
///
/// Everything else is projected as text.
pub fn is_natively_decoded(udt_name: &str) -> bool {
    matches!(
        udt_name,
        "bool"
            | "int2"
            | "int4"
            | "int8"
            | "float4"
            | "float8"
            | "text"
            | "varchar"
            | "bpchar"
            | "name"
            | "bytea"
            | "json"
            | "jsonb"
            | "uuid"
            | "date"
            | "time"
            | "timestamp"
            | "timestamptz"
    )
}

/// SQL type a filter value is cast to before comparison
///
/// Returns `None` when the column is compared on its text rendering.
fn comparison_type(column: &ColumnDescriptor) -> Option<&'static str> {
    match column.category {
        TypeCategory::Numeric => Some("NUMERIC"),
        TypeCategory::Boolean => Some("BOOLEAN"),
        TypeCategory::Temporal => match column.udt_name.as_str() {
            "date" => Some("DATE"),
            "time" => Some("TIME"),
            "timetz" => Some("TIMETZ"),
            "timestamp" => Some("TIMESTAMP"),
            "timestamptz" => Some("TIMESTAMPTZ"),
            "interval" => Some("INTERVAL"),
            _ => None,
        },
        TypeCategory::Text | TypeCategory::Other => None,
    }
}

/// Check that a filter value is well-formed for the column
fn validate_filter_value(column: &ColumnDescriptor, value: &str) -> Result<()> {
    let trimmed = value.trim();
    let malformed = |expected: &str| {
        Error::Validation(format!(
            "filter value '{}' for column '{}' is not {}",
            value, column.name, expected
        ))
    };

    match column.category {
        TypeCategory::Numeric => match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(()),
            _ => Err(malformed("a number")),
        },
        TypeCategory::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "false" | "t" | "f" | "yes" | "no" | "1" | "0" => Ok(()),
            _ => Err(malformed("a boolean")),
        },
        TypeCategory::Temporal => {
            let (valid, expected) = match column.udt_name.as_str() {
                "date" => (parse_date(trimmed).is_some(), "an ISO-8601 date"),
                "time" => (parse_time(trimmed).is_some(), "a time of day"),
                "timetz" => (is_time_with_offset(trimmed), "a time of day with optional offset"),
                "timestamp" | "timestamptz" => (
                    parse_timestamp(trimmed).is_some() || parse_date(trimmed).is_some(),
                    "an ISO-8601 date/time",
                ),
                "interval" => (is_interval(trimmed), "an interval such as '2 days 03:00:00'"),
                _ => (!trimmed.is_empty(), "a date/time"),
            };
            if valid {
                Ok(())
            } else {
                Err(malformed(expected))
            }
        }
        TypeCategory::Text | TypeCategory::Other => Ok(()),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// `10:00:00`, `10:00:00+02`, `10:00:00.5-05:30` or `10:00Z`
fn is_time_with_offset(value: &str) -> bool {
    if let Some(time) = value.strip_suffix(|character: char| matches!(character, 'Z' | 'z')) {
        return parse_time(time).is_some();
    }

    let Some(position) = value.rfind(|character: char| matches!(character, '+' | '-')) else {
        return parse_time(value).is_some();
    };
    let (time, offset) = value.split_at(position);
    parse_time(time).is_some() && is_utc_offset(&offset[1..])
}

/// Offset digits after the sign: `HH`, `HHMM` or `HH:MM[:SS]`
fn is_utc_offset(digits: &str) -> bool {
    if !digits.is_ascii() {
        return false;
    }

    let parts: Vec<&str> = if digits.contains(':') {
        digits.split(':').collect()
    } else if digits.len() == 4 {
        vec![&digits[..2], &digits[2..]]
    } else {
        vec![digits]
    };

    if parts.is_empty() || parts.len() > 3 {
        return false;
    }
    let in_range = |part: &str, max: u32| {
        (1..=2).contains(&part.len())
            && part.chars().all(|character| character.is_ascii_digit())
            && part.parse::<u32>().map(|value| value <= max).unwrap_or(false)
    };
    parts
        .iter()
        .enumerate()
        .all(|(index, part)| in_range(*part, if index == 0 { 15 } else { 59 }))
}

const INTERVAL_UNITS: &[&str] = &[
    "microsecond", "us", "usec", "millisecond", "ms", "msec", "second", "sec", "s", "minute",
    "min", "m", "hour", "hr", "h", "day", "d", "week", "w", "month", "mon", "year", "yr", "y",
    "decade", "dec", "century", "cent", "centuries", "millennium", "millennia", "mil",
];

fn is_interval_unit(word: &str) -> bool {
    let word = word.to_ascii_lowercase();
    INTERVAL_UNITS.contains(&word.as_str())
        || word
            .strip_suffix('s')
            .is_some_and(|singular| INTERVAL_UNITS.contains(&singular))
}

fn is_sign(character: char) -> bool {
    matches!(character, '+' | '-')
}

fn is_decimal(word: &str) -> bool {
    let unsigned = word.strip_prefix(is_sign).unwrap_or(word);
    !unsigned.is_empty()
        && unsigned.chars().any(|character| character.is_ascii_digit())
        && unsigned.chars().all(|character| character.is_ascii_digit() || character == '.')
        && unsigned.matches('.').count() <= 1
}

/// `[-]H:MM[:SS[.f]]` as used inside interval literals
fn is_clock(word: &str) -> bool {
    let unsigned = word.strip_prefix(is_sign).unwrap_or(word);
    let parts: Vec<&str> = unsigned.split(':').collect();
    (2..=3).contains(&parts.len())
        && parts.iter().enumerate().all(|(index, part)| {
            if index == parts.len() - 1 {
                is_decimal(part) && !part.starts_with(is_sign)
            } else {
                !part.is_empty() && part.chars().all(|character| character.is_ascii_digit())
            }
        })
}

/// ISO-8601 durations such as `P1Y2M3DT4H5M6S` or `PT90M`
fn is_iso_duration(value: &str) -> bool {
    let Some(body) = value.strip_prefix(|character: char| matches!(character, 'P' | 'p')) else {
        return false;
    };

    let mut saw_component = false;
    let mut in_time = false;
    let mut number = String::new();
    for character in body.chars() {
        match character.to_ascii_uppercase() {
            digit if digit.is_ascii_digit() || digit == '.' => number.push(digit),
            'T' if !in_time && number.is_empty() => in_time = true,
            'Y' | 'W' | 'D' if !in_time && is_decimal(&number) => {
                saw_component = true;
                number.clear();
            }
            'M' if is_decimal(&number) => {
                saw_component = true;
                number.clear();
            }
            'H' | 'S' if in_time && is_decimal(&number) => {
                saw_component = true;
                number.clear();
            }
            _ => return false,
        }
    }
    saw_component && number.is_empty()
}

/// Interval input in PostgreSQL's verbose, clock or ISO-8601 forms
///
/// Accepts `1 day`, `2 hours 30 minutes`, `3 days 04:05:06`, `-01:30`,
/// `@ 1 year ago`, `90min` and `P1DT2H`.
fn is_interval(value: &str) -> bool {
    if is_iso_duration(value) {
        return true;
    }

    let mut saw_quantity = false;
    let mut pending_number = false;
    let mut finished = false;

    for (index, word) in value.split_whitespace().enumerate() {
        if finished {
            return false;
        }
        if index == 0 && word == "@" {
            continue;
        }
        if word.eq_ignore_ascii_case("ago") {
            finished = true;
            continue;
        }

        if is_clock(word) {
            pending_number = false;
            saw_quantity = true;
        } else if is_decimal(word) {
            if pending_number {
                return false;
            }
            pending_number = true;
            saw_quantity = true;
        } else if is_interval_unit(word) {
            if !pending_number {
                return false;
            }
            pending_number = false;
        } else {
            // Number and unit written together, e.g. "90min"
            let split = word
                .find(|character: char| character.is_ascii_alphabetic())
                .unwrap_or(word.len());
            let (number, unit) = word.split_at(split);
            if pending_number || !is_decimal(number) || !is_interval_unit(unit) {
                return false;
            }
            saw_quantity = true;
        }
    }

    saw_quantity
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Some(with_offset.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Positional parameter collector
#[derive(Default)]
struct Params {
    values: Vec<BindValue>,
}

impl Params {
    fn push(&mut self, value: BindValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    fn push_integer(&mut self, value: u64, what: &str) -> Result<String> {
        let value = i64::try_from(value)
            .map_err(|_| Error::Validation(format!("{what} {value} is out of range")))?;
        Ok(self.push(BindValue::Integer(value)))
    }
}

/// Builds statements against one validated table
pub struct QueryBuilder<'a> {
    schema: &'a str,
    table: &'a TableDescriptor,
    limits: BrowserLimits,
}

impl<'a> QueryBuilder<'a> {
    /// Create a builder for `table` living in `schema`
    ///
    /// `table` must come from the schema inspector; its column names are the
    /// only identifiers the builder will embed.
    pub fn new(schema: &'a str, table: &'a TableDescriptor, limits: BrowserLimits) -> Self {
        Self {
            schema,
            table,
            limits,
        }
    }

    /// Build the page query and its matching count query
    pub fn build(&self, spec: &QuerySpec) -> Result<BuiltQuery> {
        let spec = self.normalize(spec)?;
        let limit = spec.page_size;
        let offset = spec.offset();
        self.build_paged(spec, limit, offset)
    }

    /// Build an unpaginated query for exporting every matching row
    ///
    /// The result is still capped at `max_export_rows`.
    pub fn build_export(&self, spec: &QuerySpec) -> Result<BuiltQuery> {
        self.check_table(spec)?;
        let mut spec = spec.clone();
        spec.page = 0;
        spec.page_size = self.limits.max_export_rows;
        let limit = spec.page_size;
        self.build_paged(spec, limit, 0)
    }

    /// Build only the count query (pagination fields are ignored)
    pub fn build_count(&self, spec: &QuerySpec) -> Result<Statement> {
        self.check_table(spec)?;
        let mut params = Params::default();
        let where_clause = self.where_clause(spec, &mut params, None)?;

        let sql = format!(
            "SELECT COUNT(*) AS count FROM {}{}",
            self.qualified_table(),
            where_clause
        );
        debug!(sql = %sql, "Built count query");

        Ok(Statement {
            sql,
            params: params.values,
        })
    }

    /// Build full-table aggregate statements for every projected column
    pub fn build_aggregates(&self, spec: &QuerySpec) -> Result<Vec<ColumnAggregate>> {
        self.check_table(spec)?;
        self.projected_columns(spec)?
            .into_iter()
            .map(|column| self.column_aggregate(spec, column))
            .collect()
    }

    fn build_paged(&self, spec: QuerySpec, limit: u64, offset: u64) -> Result<BuiltQuery> {
        let projected = self.projected_columns(&spec)?;
        let projection = projected
            .iter()
            .map(|column| Self::project(column))
            .collect::<Vec<_>>()
            .join(", ");

        let mut params = Params::default();
        let where_clause = self.where_clause(&spec, &mut params, None)?;
        let order_clause = self.order_clause(&spec)?;
        let limit_placeholder = params.push_integer(limit, "page size")?;
        let offset_placeholder = params.push_integer(offset, "offset")?;

        let sql = format!(
            "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
            projection,
            self.qualified_table(),
            where_clause,
            order_clause,
            limit_placeholder,
            offset_placeholder
        );
        debug!(sql = %sql, "Built row query");

        let select = Statement {
            sql,
            params: params.values,
        };
        let count = self.build_count(&spec)?;
        let columns = projected
            .iter()
            .map(|column| ResultColumn {
                name: column.name.clone(),
                category: column.category,
            })
            .collect();

        Ok(BuiltQuery {
            select,
            count,
            columns,
            spec,
        })
    }

    fn check_table(&self, spec: &QuerySpec) -> Result<()> {
        if spec.table != self.table.name {
            return Err(Error::Validation(format!(
                "table '{}' is not a known table",
                spec.table
            )));
        }
        Ok(())
    }

    /// Validate the table and clamp the page size
    fn normalize(&self, spec: &QuerySpec) -> Result<QuerySpec> {
        self.check_table(spec)?;
        if spec.page_size == 0 {
            return Err(Error::Validation(
                "page size must be a positive integer".to_string(),
            ));
        }

        let mut spec = spec.clone();
        spec.page_size = spec.page_size.min(self.limits.max_page_size.max(1));
        Ok(spec)
    }

    fn qualified_table(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(self.schema),
            quote_identifier(&self.table.name)
        )
    }

    fn projected_columns(&self, spec: &QuerySpec) -> Result<Vec<&'a ColumnDescriptor>> {
        match &spec.columns {
            Some(names) if !names.is_empty() => names
                .iter()
                .map(|name| self.table.require_column(name))
                .collect(),
            _ => Ok(self.table.columns.iter().collect()),
        }
    }

    fn project(column: &ColumnDescriptor) -> String {
        let quoted = quote_identifier(&column.name);
        if is_natively_decoded(&column.udt_name) {
            quoted
        } else {
            format!("CAST({quoted} AS TEXT) AS {quoted}")
        }
    }

    /// WHERE clause combining filters and search, or an empty string
    fn where_clause(
        &self,
        spec: &QuerySpec,
        params: &mut Params,
        extra: Option<String>,
    ) -> Result<String> {
        let mut conditions = Vec::new();

        for filter in &spec.filters {
            conditions.push(self.filter_condition(filter, params)?);
        }

        if let Some(term) = spec.search_term() {
            let text_columns: Vec<&ColumnDescriptor> = self.table.text_columns().collect();
            // No text columns: search is a no-op
            if !text_columns.is_empty() {
                let placeholder = params.push(BindValue::Text(format!("%{}%", escape_like(term))));
                let alternatives = text_columns
                    .iter()
                    .map(|column| format!("{} ILIKE {}", quote_identifier(&column.name), placeholder))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                conditions.push(format!("({alternatives})"));
            }
        }

        conditions.extend(extra);

        if conditions.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", conditions.join(" AND ")))
        }
    }

    fn filter_condition(&self, filter: &ColumnFilter, params: &mut Params) -> Result<String> {
        let column = self.table.require_column(&filter.column)?;
        let quoted = quote_identifier(&column.name);
        let cast_type = comparison_type(column);

        let mut compare = |operator: &str, value: &str| -> Result<String> {
            validate_filter_value(column, value)?;
            let placeholder = params.push(BindValue::Text(value.trim().to_string()));
            Ok(match (column.category, cast_type) {
                (_, Some(sql_type)) => {
                    format!("{quoted} {operator} CAST({placeholder} AS {sql_type})")
                }
                (TypeCategory::Text, None) => format!("{quoted} {operator} {placeholder}"),
                (_, None) => format!("CAST({quoted} AS TEXT) {operator} {placeholder}"),
            })
        };

        match &filter.predicate {
            FilterPredicate::Equals { value } => compare("=", value),
            FilterPredicate::Range { min, max } => {
                if column.category == TypeCategory::Other {
                    return Err(Error::Validation(format!(
                        "range filters are not supported on column '{}' of type {}",
                        column.name, column.data_type
                    )));
                }

                let mut bounds = Vec::new();
                if let Some(min) = min {
                    bounds.push(compare(">=", min)?);
                }
                if let Some(max) = max {
                    bounds.push(compare("<=", max)?);
                }

                if bounds.is_empty() {
                    return Err(Error::Validation(format!(
                        "range filter on column '{}' needs a lower or upper bound",
                        column.name
                    )));
                }
                Ok(bounds.join(" AND "))
            }
        }
    }

    fn order_expression(column: &ColumnDescriptor) -> String {
        let quoted = quote_identifier(&column.name);
        if column.category == TypeCategory::Other {
            format!("CAST({quoted} AS TEXT)")
        } else {
            quoted
        }
    }

    /// ORDER BY the requested column, then the primary key (or every column) for stable pages
    fn order_clause(&self, spec: &QuerySpec) -> Result<String> {
        let mut terms = Vec::new();

        if let Some(sort_by) = &spec.sort_by {
            let column = self.table.require_column(sort_by)?;
            let direction = match spec.sort_order {
                Some(SortOrder::Descending) => "DESC",
                _ => "ASC",
            };
            terms.push(format!("{} {}", Self::order_expression(column), direction));
        }

        // Without a primary key every column breaks ties
        let tiebreak: Vec<&ColumnDescriptor> = match &self.table.primary_key {
            Some(keys) if !keys.is_empty() => keys
                .iter()
                .filter_map(|key| self.table.column(key))
                .collect(),
            _ => self.table.columns.iter().collect(),
        };

        for column in tiebreak {
            if spec.sort_by.as_deref() == Some(column.name.as_str()) {
                continue;
            }
            terms.push(format!("{} ASC", Self::order_expression(column)));
        }

        if terms.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" ORDER BY {}", terms.join(", ")))
        }
    }

    fn column_aggregate(
        &self,
        spec: &QuerySpec,
        column: &ColumnDescriptor,
    ) -> Result<ColumnAggregate> {
        let quoted = quote_identifier(&column.name);

        let numeric_fields = if column.category.is_numeric() {
            let as_double = format!("CAST({quoted} AS DOUBLE PRECISION)");
            format!(
                "COUNT(DISTINCT {quoted}) AS distinct_count, \
                 CAST(MIN({quoted}) AS DOUBLE PRECISION) AS min_value, \
                 CAST(MAX({quoted}) AS DOUBLE PRECISION) AS max_value, \
                 CAST(AVG({quoted}) AS DOUBLE PRECISION) AS mean_value, \
                 CAST(PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {as_double}) AS DOUBLE PRECISION) AS median_value, \
                 CAST(STDDEV_SAMP({as_double}) AS DOUBLE PRECISION) AS std_dev_value"
            )
        } else {
            format!(
                "COUNT(DISTINCT CAST({quoted} AS TEXT)) AS distinct_count, \
                 CAST(NULL AS DOUBLE PRECISION) AS min_value, \
                 CAST(NULL AS DOUBLE PRECISION) AS max_value, \
                 CAST(NULL AS DOUBLE PRECISION) AS mean_value, \
                 CAST(NULL AS DOUBLE PRECISION) AS median_value, \
                 CAST(NULL AS DOUBLE PRECISION) AS std_dev_value"
            )
        };

        let length_fields = if column.category.is_text() {
            format!(
                "CAST(MIN(LENGTH({quoted})) AS BIGINT) AS min_length, \
                 CAST(MAX(LENGTH({quoted})) AS BIGINT) AS max_length, \
                 CAST(AVG(LENGTH({quoted})) AS DOUBLE PRECISION) AS mean_length"
            )
        } else {
            "CAST(NULL AS BIGINT) AS min_length, \
             CAST(NULL AS BIGINT) AS max_length, \
             CAST(NULL AS DOUBLE PRECISION) AS mean_length"
                .to_string()
        };

        let mut params = Params::default();
        let where_clause = self.where_clause(spec, &mut params, None)?;
        let summary = Statement {
            sql: format!(
                "SELECT COUNT(*) AS total_count, COUNT(*) - COUNT({quoted}) AS null_count, \
                 {numeric_fields}, {length_fields} FROM {}{}",
                self.qualified_table(),
                where_clause
            ),
            params: params.values,
        };

        let top_values = if column.category.is_numeric() {
            None
        } else {
            let mut params = Params::default();
            let where_clause =
                self.where_clause(spec, &mut params, Some(format!("{quoted} IS NOT NULL")))?;
            let limit = params.push_integer(TOP_VALUES_LIMIT as u64, "top values limit")?;
            Some(Statement {
                sql: format!(
                    "SELECT CAST({quoted} AS TEXT) AS value, COUNT(*) AS occurrences FROM {}{} \
                     GROUP BY CAST({quoted} AS TEXT) ORDER BY occurrences DESC, value ASC LIMIT {}",
                    self.qualified_table(),
                    where_clause,
                    limit
                ),
                params: params.values,
            })
        };

        Ok(ColumnAggregate {
            column: ResultColumn {
                name: column.name.clone(),
                category: column.category,
            },
            summary,
            top_values,
        })
    }
}
