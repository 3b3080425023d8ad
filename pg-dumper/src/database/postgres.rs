//! PostgreSQL database provider implementation

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::database::traits::DatabaseProvider;
use crate::query_builder::{quote_identifier, BindValue, BrowserLimits, QueryBuilder, Statement};
use crate::schema::{
    ColumnDescriptor, ColumnStats, ForeignKey, QuerySpec, Relationship, ResultColumn, ResultSet,
    Row as ResultRow, TableDescriptor, TableSummary, TypeCategory, ValueFrequency,
};
use crate::{Error, Result};

/// Schema browsed when none is configured
pub const DEFAULT_SCHEMA: &str = "public";

const TABLE_NAMES_QUERY: &str = r#"
    SELECT table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_schema = $1
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.udt_name::text AS udt_name,
        c.is_nullable::text AS is_nullable,
        c.column_default::text AS column_default,
        c.character_maximum_length::int4 AS character_maximum_length,
        c.numeric_precision::int4 AS numeric_precision,
        c.numeric_scale::int4 AS numeric_scale
    FROM information_schema.columns c
    JOIN information_schema.tables t
      ON t.table_schema = c.table_schema
      AND t.table_name = c.table_name
    WHERE c.table_schema = $1
      AND c.table_name = $2
      AND t.table_type = 'BASE TABLE'
    ORDER BY c.ordinal_position
"#;

const PRIMARY_KEYS_QUERY: &str = r#"
    SELECT tc.table_name::text AS table_name, kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
      AND tc.table_schema = kcu.table_schema
      AND tc.table_name = kcu.table_name
    WHERE tc.table_schema = $1
      AND ($2::text IS NULL OR tc.table_name = $2)
      AND tc.constraint_type = 'PRIMARY KEY'
    ORDER BY tc.table_name, kcu.ordinal_position
"#;

const TABLE_EXISTS_QUERY: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM information_schema.tables
        WHERE table_schema = $1
          AND table_name = $2
          AND table_type = 'BASE TABLE'
    ) AS present
"#;

// One row per column pair; conkey and confkey are positionally aligned
const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        source.relname::text AS source_table,
        source_column.attname::text AS source_column,
        target.relname::text AS target_table,
        target_column.attname::text AS target_column,
        con.conname::text AS constraint_name
    FROM pg_constraint con
    JOIN pg_class source ON source.oid = con.conrelid
    JOIN pg_namespace ns ON ns.oid = source.relnamespace
    JOIN pg_class target ON target.oid = con.confrelid
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
        WITH ORDINALITY AS pair(source_attnum, target_attnum, position)
    JOIN pg_attribute source_column
      ON source_column.attrelid = con.conrelid
      AND source_column.attnum = pair.source_attnum
    JOIN pg_attribute target_column
      ON target_column.attrelid = con.confrelid
      AND target_column.attnum = pair.target_attnum
    WHERE con.contype = 'f'
      AND ns.nspname = $1
      AND ($2::text IS NULL OR source.relname = $2)
    ORDER BY source.relname, con.conname, pair.position
"#;

const TABLE_SIZES_QUERY: &str = r#"
    SELECT
        t.table_name::text AS table_name,
        (
            SELECT COUNT(*)
            FROM information_schema.columns c
            WHERE c.table_schema = t.table_schema
              AND c.table_name = t.table_name
        ) AS column_count,
        COALESCE(pg_total_relation_size(format('%I.%I', t.table_schema, t.table_name)::regclass), 0)::int8 AS size_bytes
    FROM information_schema.tables t
    WHERE t.table_schema = $1
      AND t.table_type = 'BASE TABLE'
    ORDER BY t.table_name
"#;

/// PostgreSQL database provider
pub struct PostgresProvider {
    pool: PgPool,
    schema: String,
    limits: BrowserLimits,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - The memoized connection pool
    /// * `schema` - Schema whose tables are browsed (usually `public`)
    /// * `limits` - Page and export size bounds
    pub fn new(pool: PgPool, schema: impl Into<String>, limits: BrowserLimits) -> Self {
        Self {
            pool,
            schema: schema.into(),
            limits,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn limits(&self) -> BrowserLimits {
        self.limits
    }

    fn bind(statement: &Statement) -> Query<'_, Postgres, PgArguments> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = match param {
                BindValue::Text(value) => query.bind(value.as_str()),
                BindValue::Integer(value) => query.bind(*value),
            };
        }
        query
    }

    /// Primary key columns keyed by table, for one table or the whole schema
    async fn primary_keys(&self, table: Option<&str>) -> Result<HashMap<String, Vec<String>>> {
        let rows = sqlx::query(PRIMARY_KEYS_QUERY)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        let mut keys: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let table_name: String = row.try_get("table_name")?;
            let column_name: String = row.try_get("column_name")?;
            keys.entry(table_name).or_default().push(column_name);
        }
        Ok(keys)
    }

    /// Foreign keys for one table or the whole schema
    ///
    /// Catalog failures yield an empty list.
    async fn foreign_keys(&self, table: Option<&str>) -> Vec<Relationship> {
        let rows = match sqlx::query(FOREIGN_KEYS_QUERY)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(error) => {
                warn!(schema = %self.schema, error = %error, "Foreign key lookup failed, reporting none");
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| {
                let relationship = (|| -> std::result::Result<Relationship, sqlx::Error> {
                    Ok(Relationship {
                        source_table: row.try_get("source_table")?,
                        source_column: row.try_get("source_column")?,
                        target_table: row.try_get("target_table")?,
                        target_column: row.try_get("target_column")?,
                        constraint_name: row.try_get("constraint_name")?,
                    })
                })();

                match relationship {
                    Ok(relationship) => Some(relationship),
                    Err(error) => {
                        warn!(error = %error, "Skipping unreadable foreign key row");
                        None
                    }
                }
            })
            .collect()
    }

    /// Execute a built row statement and decode every row
    async fn fetch_rows(&self, statement: &Statement, columns: &[ResultColumn]) -> Result<Vec<ResultRow>> {
        let rows = Self::bind(statement).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Self::row_to_json(row, columns))
            .collect()
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<u64> {
        let row = Self::bind(statement).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    /// Convert a PostgreSQL row to a JSON object
    ///
    /// `columns` carries the category of each position; exact numerics and
    /// other types without a native decoder arrive as text and numeric text
    /// becomes a JSON number again.
    fn row_to_json(row: &PgRow, columns: &[ResultColumn]) -> Result<ResultRow> {
        let mut map = ResultRow::new();

        for (index, column) in row.columns().iter().enumerate() {
            let type_name = column.type_info().name();
            let category = columns
                .get(index)
                .map(|result_column| result_column.category)
                .unwrap_or(TypeCategory::Other);

            let value: Value = match type_name {
                "BOOL" => {
                    let value: Option<bool> = row.try_get(index)?;
                    value.map(Value::Bool).unwrap_or(Value::Null)
                }
                "INT2" => {
                    let value: Option<i16> = row.try_get(index)?;
                    value.map(|number| Value::Number(number.into())).unwrap_or(Value::Null)
                }
                "INT4" => {
                    let value: Option<i32> = row.try_get(index)?;
                    value.map(|number| Value::Number(number.into())).unwrap_or(Value::Null)
                }
                "INT8" => {
                    let value: Option<i64> = row.try_get(index)?;
                    value.map(|number| Value::Number(number.into())).unwrap_or(Value::Null)
                }
                "FLOAT4" => {
                    let value: Option<f32> = row.try_get(index)?;
                    value.map(|number| float_to_json(number as f64)).unwrap_or(Value::Null)
                }
                "FLOAT8" => {
                    let value: Option<f64> = row.try_get(index)?;
                    value.map(float_to_json).unwrap_or(Value::Null)
                }
                "TEXT" | "VARCHAR" | "CHAR" | "NAME" => {
                    let value: Option<String> = row.try_get(index)?;
                    match value {
                        Some(text) if category.is_numeric() => numeric_text_to_json(text),
                        Some(text) => Value::String(text),
                        None => Value::Null,
                    }
                }
                "BYTEA" => {
                    let value: Option<Vec<u8>> = row.try_get(index)?;
                    value
                        .map(|bytes| Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)))
                        .unwrap_or(Value::Null)
                }
                "TIMESTAMP" => {
                    let value: Option<NaiveDateTime> = row.try_get(index)?;
                    value
                        .map(|timestamp| Value::String(timestamp.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
                        .unwrap_or(Value::Null)
                }
                "TIMESTAMPTZ" => {
                    let value: Option<DateTime<Utc>> = row.try_get(index)?;
                    value
                        .map(|timestamp| Value::String(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
                        .unwrap_or(Value::Null)
                }
                "DATE" => {
                    let value: Option<NaiveDate> = row.try_get(index)?;
                    value
                        .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                        .unwrap_or(Value::Null)
                }
                "TIME" => {
                    let value: Option<NaiveTime> = row.try_get(index)?;
                    value
                        .map(|time| Value::String(time.format("%H:%M:%S%.f").to_string()))
                        .unwrap_or(Value::Null)
                }
                "JSON" | "JSONB" => {
                    let value: Option<Value> = row.try_get(index)?;
                    value.unwrap_or(Value::Null)
                }
                "UUID" => {
                    let value: Option<sqlx::types::Uuid> = row.try_get(index)?;
                    value
                        .map(|uuid| Value::String(uuid.to_string()))
                        .unwrap_or(Value::Null)
                }
                // Everything else was projected as text
                _ => {
                    let value: Option<String> = row.try_get(index)?;
                    value.map(Value::String).unwrap_or(Value::Null)
                }
            };

            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }

    fn top_value_to_json(text: String, category: TypeCategory) -> Value {
        match (category, text.as_str()) {
            (TypeCategory::Boolean, "true") => Value::Bool(true),
            (TypeCategory::Boolean, "false") => Value::Bool(false),
            _ => Value::String(text),
        }
    }
}

/// Finite floats become numbers; NaN and infinities keep their text form
fn float_to_json(number: f64) -> Value {
    serde_json::Number::from_f64(number)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(number.to_string()))
}

/// Exact numeric text becomes a JSON number only when no digits are lost
///
/// Integers must fit 64 bits and decimals must print back unchanged from a
/// double; anything else stays text.
fn numeric_text_to_json(text: String) -> Value {
    let trimmed = text.trim().trim_start_matches('+');

    if !trimmed.contains(|character: char| matches!(character, '.' | 'e' | 'E')) {
        if let Ok(integer) = trimmed.parse::<i64>() {
            return Value::Number(integer.into());
        }
        if let Ok(unsigned) = trimmed.parse::<u64>() {
            return Value::Number(unsigned.into());
        }
        return Value::String(text);
    }

    if trimmed.contains(|character: char| matches!(character, 'e' | 'E')) {
        return Value::String(text);
    }

    // "12.50" and 12.5 are the same value
    let significant = trimmed.trim_end_matches('0').trim_end_matches('.');
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() && number.to_string() == significant => float_to_json(number),
        _ => Value::String(text),
    }
}

#[async_trait]
impl DatabaseProvider for PostgresProvider {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        let rows = sqlx::query(TABLE_NAMES_QUERY)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("table_name")?;
            tables.push(self.describe_table(&name).await?);
        }

        Ok(tables)
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescriptor> {
        let column_rows = sqlx::query(COLUMNS_QUERY)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        // A table may legitimately have no columns
        if column_rows.is_empty() {
            let present: bool = sqlx::query_scalar(TABLE_EXISTS_QUERY)
                .bind(&self.schema)
                .bind(table)
                .fetch_one(&self.pool)
                .await?;

            if !present {
                return Err(Error::NotFound(format!(
                    "table '{}' does not exist in schema '{}'",
                    table, self.schema
                )));
            }
        }

        let primary_key_columns = self
            .primary_keys(Some(table))
            .await?
            .remove(table)
            .unwrap_or_default();

        let foreign_keys = self
            .foreign_keys(Some(table))
            .await
            .into_iter()
            .map(|relationship| ForeignKey {
                column: relationship.source_column,
                references_table: relationship.target_table,
                references_column: relationship.target_column,
            })
            .collect();

        let columns: Vec<ColumnDescriptor> = column_rows
            .iter()
            .map(|row| -> std::result::Result<ColumnDescriptor, sqlx::Error> {
                let column_name: String = row.try_get("column_name")?;
                let data_type: String = row.try_get("data_type")?;
                let udt_name: String = row.try_get("udt_name")?;
                let is_nullable: String = row.try_get("is_nullable")?;

                // Arrays and user-defined types report through udt_name
                let category = match TypeCategory::from_native(&udt_name) {
                    TypeCategory::Other => TypeCategory::from_native(&data_type),
                    category => category,
                };
                let category = if data_type == "ARRAY" {
                    TypeCategory::Other
                } else {
                    category
                };

                Ok(ColumnDescriptor {
                    is_primary_key: primary_key_columns.contains(&column_name),
                    name: column_name,
                    data_type,
                    udt_name,
                    category,
                    nullable: is_nullable == "YES",
                    default_value: row.try_get("column_default")?,
                    character_maximum_length: row.try_get("character_maximum_length")?,
                    numeric_precision: row.try_get("numeric_precision")?,
                    numeric_scale: row.try_get("numeric_scale")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        Ok(TableDescriptor {
            name: table.to_string(),
            columns,
            primary_key: if primary_key_columns.is_empty() {
                None
            } else {
                Some(primary_key_columns)
            },
            foreign_keys,
        })
    }

    async fn table_summaries(&self) -> Result<Vec<TableSummary>> {
        let rows = sqlx::query(TABLE_SIZES_QUERY)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;
        let mut primary_keys = self.primary_keys(None).await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("table_name")?;
            let column_count: i64 = row.try_get("column_count")?;
            let size_bytes: i64 = row.try_get("size_bytes")?;

            let count_query = format!(
                "SELECT COUNT(*) AS count FROM {}.{}",
                quote_identifier(&self.schema),
                quote_identifier(&name)
            );
            let row_count: i64 = sqlx::query_scalar(&count_query)
                .fetch_one(&self.pool)
                .await?;

            let size_bytes = size_bytes.max(0) as u64;
            summaries.push(TableSummary {
                primary_key: primary_keys.remove(&name).unwrap_or_default(),
                name,
                column_count: column_count.max(0) as u64,
                row_count: row_count.max(0) as u64,
                size_bytes,
                size: humansize::format_size(size_bytes, humansize::BINARY),
            });
        }

        Ok(summaries)
    }

    async fn relationships(&self) -> Result<Vec<Relationship>> {
        Ok(self.foreign_keys(None).await)
    }

    async fn query_page(&self, spec: &QuerySpec) -> Result<ResultSet> {
        let table = self.describe_table(&spec.table).await?;
        let built = QueryBuilder::new(&self.schema, &table, self.limits).build(spec)?;

        let rows = self.fetch_rows(&built.select, &built.columns).await?;
        let total = self.fetch_count(&built.count).await?;
        debug!(table = %spec.table, rows = rows.len(), total, "Fetched page");

        Ok(ResultSet {
            columns: built.columns,
            rows,
            total,
            spec: built.spec,
        })
    }

    async fn count_matching(&self, spec: &QuerySpec) -> Result<u64> {
        let table = self.describe_table(&spec.table).await?;
        let statement = QueryBuilder::new(&self.schema, &table, self.limits).build_count(spec)?;
        self.fetch_count(&statement).await
    }

    async fn query_all(&self, spec: &QuerySpec) -> Result<ResultSet> {
        let table = self.describe_table(&spec.table).await?;
        let built = QueryBuilder::new(&self.schema, &table, self.limits).build_export(spec)?;

        let rows = self.fetch_rows(&built.select, &built.columns).await?;
        let total = self.fetch_count(&built.count).await?;
        if total > rows.len() as u64 {
            warn!(
                table = %spec.table,
                total,
                exported = rows.len(),
                "Export truncated at the configured row cap"
            );
        }

        Ok(ResultSet {
            columns: built.columns,
            rows,
            total,
            spec: built.spec,
        })
    }

    async fn table_stats(&self, spec: &QuerySpec) -> Result<Vec<ColumnStats>> {
        let table = self.describe_table(&spec.table).await?;
        let aggregates = QueryBuilder::new(&self.schema, &table, self.limits).build_aggregates(spec)?;

        let mut all_stats = Vec::with_capacity(aggregates.len());
        for aggregate in aggregates {
            let row = Self::bind(&aggregate.summary).fetch_one(&self.pool).await?;

            let mut stats = ColumnStats::empty(&aggregate.column.name, aggregate.column.category);
            stats.count = row.try_get::<i64, _>("total_count")?.max(0) as u64;
            stats.null_count = row.try_get::<i64, _>("null_count")?.max(0) as u64;
            stats.distinct_count = row.try_get::<i64, _>("distinct_count")?.max(0) as u64;
            stats.min = row.try_get("min_value")?;
            stats.max = row.try_get("max_value")?;
            stats.mean = row.try_get("mean_value")?;
            stats.median = row.try_get("median_value")?;
            stats.std_dev = row.try_get("std_dev_value")?;
            stats.min_length = row
                .try_get::<Option<i64>, _>("min_length")?
                .map(|length| length.max(0) as u64);
            stats.max_length = row
                .try_get::<Option<i64>, _>("max_length")?
                .map(|length| length.max(0) as u64);
            stats.mean_length = row.try_get("mean_length")?;

            if let Some(top_values) = &aggregate.top_values {
                let rows = Self::bind(top_values).fetch_all(&self.pool).await?;
                stats.top_values = rows
                    .iter()
                    .map(|row| -> std::result::Result<ValueFrequency, sqlx::Error> {
                        let value: String = row.try_get("value")?;
                        let count: i64 = row.try_get("occurrences")?;
                        Ok(ValueFrequency {
                            value: Self::top_value_to_json(value, aggregate.column.category),
                            count: count.max(0) as u64,
                        })
                    })
                    .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;
            }

            all_stats.push(stats);
        }

        Ok(all_stats)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
