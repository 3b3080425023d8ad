//! Schema and result types
//!
//! These types describe database metadata discovered at runtime, the
//! normalized description of a browsing request, and the data produced for it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Coarse category of a column's native type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeCategory {
    Numeric,
    Text,
    Temporal,
    Boolean,
    Other,
}

impl TypeCategory {
    /// Map a PostgreSQL type name to its category
    ///
    /// Accepts both `udt_name` spellings (`int4`, `timestamptz`) and
    /// `information_schema.columns.data_type` spellings (`integer`,
    /// `timestamp with time zone`). A trailing modifier such as `(255)` is
    /// ignored. Anything unrecognized, including arrays, is [`Other`](Self::Other).
    pub fn from_native(type_name: &str) -> Self {
        let normalized = type_name.trim().to_ascii_lowercase();
        let base = match normalized.find('(') {
            Some(position) => normalized[..position].trim_end(),
            None => normalized.as_str(),
        };

        match base {
            "int2" | "int4" | "int8" | "smallint" | "integer" | "int" | "bigint"
            | "smallserial" | "serial" | "bigserial" | "serial2" | "serial4" | "serial8"
            | "float4" | "float8" | "real" | "double precision" | "numeric" | "decimal" => {
                TypeCategory::Numeric
            }
            "text" | "varchar" | "character varying" | "bpchar" | "character" | "char"
            | "name" | "citext" => TypeCategory::Text,
            "date" | "time" | "timetz" | "timestamp" | "timestamptz"
            | "time without time zone" | "time with time zone"
            | "timestamp without time zone" | "timestamp with time zone" | "interval" => {
                TypeCategory::Temporal
            }
            "bool" | "boolean" => TypeCategory::Boolean,
            _ => TypeCategory::Other,
        }
    }

    pub fn is_numeric(self) -> bool {
        self == TypeCategory::Numeric
    }

    pub fn is_text(self) -> bool {
        self == TypeCategory::Text
    }
}

/// Complete schema information for a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    /// Name of the table
    pub name: String,

    /// Columns in ordinal order
    pub columns: Vec<ColumnDescriptor>,

    /// Primary key column names (if any)
    pub primary_key: Option<Vec<String>>,

    /// Foreign key references from this table
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDescriptor {
    /// Look up a column by exact name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Look up a column, failing with a validation error when it is unknown
    pub fn require_column(&self, name: &str) -> Result<&ColumnDescriptor> {
        self.column(name).ok_or_else(|| {
            Error::Validation(format!(
                "column '{}' does not exist in table '{}'",
                name, self.name
            ))
        })
    }

    /// Columns whose category is text
    pub fn text_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|column| column.category.is_text())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }
}

/// Information about a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Declared type as reported by `information_schema` (e.g. "integer", "character varying")
    pub data_type: String,

    /// Underlying type name (e.g. "int4", "varchar", "_text")
    pub udt_name: String,

    /// Category derived from the native type
    pub category: TypeCategory,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Default value expression (if any)
    pub default_value: Option<String>,

    /// Whether this column is part of the primary key
    pub is_primary_key: bool,

    pub character_maximum_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
}

impl ColumnDescriptor {
    /// Upper-cased type with its length or precision, e.g. `CHARACTER VARYING(255)` or `NUMERIC(10,2)`
    pub fn formatted_type(&self) -> String {
        let formatted = self.data_type.to_uppercase();
        let lower = self.data_type.to_ascii_lowercase();

        match lower.as_str() {
            "character varying" | "varchar" | "character" | "char" => {
                match self.character_maximum_length {
                    Some(length) => format!("{formatted}({length})"),
                    None => formatted,
                }
            }
            "numeric" | "decimal" => match (self.numeric_precision, self.numeric_scale) {
                (Some(precision), Some(scale)) if scale > 0 => {
                    format!("{formatted}({precision},{scale})")
                }
                (Some(precision), _) => format!("{formatted}({precision})"),
                _ => formatted,
            },
            _ => formatted,
        }
    }
}

/// Foreign key constraint information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Column name in this table
    pub column: String,

    /// Referenced table name
    pub references_table: String,

    /// Referenced column name
    pub references_column: String,
}

/// A foreign key seen from the whole schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub constraint_name: String,
}

/// Per-table overview used for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    /// Table name
    pub name: String,

    pub column_count: u64,

    /// Exact row count
    pub row_count: u64,

    pub primary_key: Vec<String>,

    /// Total on-disk size including indexes and TOAST
    pub size_bytes: u64,

    /// `size_bytes` rendered for humans, e.g. "1.50 MiB"
    pub size: String,
}

/// Whole-database totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseOverview {
    pub total_tables: u64,
    pub total_rows: u64,
    pub total_columns: u64,
    pub average_rows_per_table: u64,
}

impl DatabaseOverview {
    pub fn from_summaries(summaries: &[TableSummary]) -> Self {
        let total_tables = summaries.len() as u64;
        let total_rows = summaries.iter().map(|summary| summary.row_count).sum();
        let total_columns = summaries.iter().map(|summary| summary.column_count).sum();

        Self {
            total_tables,
            total_rows,
            total_columns,
            average_rows_per_table: if total_tables == 0 {
                0
            } else {
                total_rows / total_tables
            },
        }
    }
}

/// Sort order for row queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Predicate applied to a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum FilterPredicate {
    /// Column equals the value
    Equals { value: String },

    /// Column lies within the inclusive bounds; at least one bound is set
    Range {
        min: Option<String>,
        max: Option<String>,
    },
}

/// A predicate bound to a column name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFilter {
    pub column: String,
    #[serde(flatten)]
    pub predicate: FilterPredicate,
}

/// Normalized description of one paginated/filtered/searched request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// Table to read from
    pub table: String,

    /// Zero-based page index
    pub page: u64,

    /// Rows per page
    pub page_size: u64,

    /// Case-insensitive substring matched against text columns
    pub search: Option<String>,

    /// Column predicates, combined with AND
    pub filters: Vec<ColumnFilter>,

    /// Columns to return (all columns when absent)
    pub columns: Option<Vec<String>>,

    /// Column to sort by
    pub sort_by: Option<String>,

    pub sort_order: Option<SortOrder>,
}

pub const DEFAULT_PAGE_SIZE: u64 = 50;

impl QuerySpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            filters: Vec::new(),
            columns: None,
            sort_by: None,
            sort_order: None,
        }
    }

    pub fn with_page(mut self, page: u64, page_size: u64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, predicate: FilterPredicate) -> Self {
        self.filters.push(ColumnFilter {
            column: column.into(),
            predicate,
        });
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_sort(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(column.into());
        self.sort_order = Some(order);
        self
    }

    /// Row offset of the requested page
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.page_size)
    }

    /// Search term with surrounding whitespace removed, if anything is left
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// Name and category of a column in a result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultColumn {
    pub name: String,
    pub category: TypeCategory,
}

/// One row keyed by column name, in column order
pub type Row = serde_json::Map<String, Value>;

/// A materialized page of rows plus its total count context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    /// Columns in result order
    pub columns: Vec<ResultColumn>,

    /// The rows returned
    pub rows: Vec<Row>,

    /// Rows matching the filters, ignoring pagination
    pub total: u64,

    /// Request that produced this result
    pub spec: QuerySpec,
}

impl ResultSet {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Whether rows exist past this page
    pub fn has_more(&self) -> bool {
        self.spec.offset() + (self.rows.len() as u64) < self.total
    }

    /// Number of pages needed to show `total` rows
    pub fn page_count(&self) -> u64 {
        if self.spec.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.spec.page_size)
    }
}

/// Value and number of occurrences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueFrequency {
    pub value: Value,
    pub count: u64,
}

/// Descriptive statistics for one column
///
/// Type-specific fields are absent (not zero) when they do not apply or when
/// every value is null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub column: String,
    pub category: TypeCategory,

    /// Number of values, nulls included
    pub count: u64,
    pub null_count: u64,

    /// Distinct non-null values
    pub distinct_count: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,

    /// Most frequent non-null values (non-numeric columns)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_values: Vec<ValueFrequency>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_length: Option<f64>,
}

impl ColumnStats {
    /// Stats with only the common counters filled in
    pub fn empty(column: impl Into<String>, category: TypeCategory) -> Self {
        Self {
            column: column.into(),
            category,
            count: 0,
            null_count: 0,
            distinct_count: 0,
            min: None,
            max: None,
            mean: None,
            median: None,
            std_dev: None,
            top_values: Vec::new(),
            min_length: None,
            max_length: None,
            mean_length: None,
        }
    }
}

/// Null count of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NullCount {
    pub column: String,
    pub nulls: u64,
}

/// Shape of a result set, grouped by column category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSummary {
    pub row_count: u64,
    pub column_count: u64,
    pub null_counts: Vec<NullCount>,
    pub numeric_columns: Vec<String>,
    pub text_columns: Vec<String>,
    pub temporal_columns: Vec<String>,
    pub boolean_columns: Vec<String>,
    pub other_columns: Vec<String>,
}

/// Response containing a page of rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsResponse {
    pub rows: Vec<Row>,
    pub columns: Vec<ResultColumn>,

    /// Total number of matching rows (filters applied)
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub page_count: u64,
    pub has_more: bool,
}

impl From<ResultSet> for RowsResponse {
    fn from(result: ResultSet) -> Self {
        let has_more = result.has_more();
        let page_count = result.page_count();

        Self {
            page: result.spec.page,
            page_size: result.spec.page_size,
            rows: result.rows,
            columns: result.columns,
            total: result.total,
            page_count,
            has_more,
        }
    }
}

/// Response from listing tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesResponse {
    pub tables: Vec<TableSummary>,
}

/// Response for row count queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: u64,
}

/// Response for column statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub scope: crate::stats::StatsScope,
    pub stats: Vec<ColumnStats>,

    /// Present for page scope only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<DataSummary>,
}

/// Response from listing relationships
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipsResponse {
    pub relationships: Vec<Relationship>,
}
