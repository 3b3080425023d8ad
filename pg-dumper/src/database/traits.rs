//! Database provider trait
//!
//! This trait defines the read-only interface the HTTP layer consumes.

use crate::schema::{
    ColumnStats, DatabaseOverview, QuerySpec, Relationship, ResultSet, TableDescriptor,
    TableSummary,
};
use crate::Result;
use async_trait::async_trait;

/// Database provider trait for schema discovery and data access
///
/// Implementations only read: catalog metadata for the inspection methods,
/// user data for the query methods.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// Describe every base table in the browsed schema
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>>;

    /// Get schema information for a specific table
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) when the table does not
    /// exist in the browsed schema
    async fn describe_table(&self, table: &str) -> Result<TableDescriptor>;

    /// Name, size and row count of every table
    async fn table_summaries(&self) -> Result<Vec<TableSummary>>;

    /// Every foreign key in the browsed schema
    ///
    /// Best-effort: an empty list when the catalog cannot be read.
    async fn relationships(&self) -> Result<Vec<Relationship>>;

    /// Fetch one page of rows together with the total matching count
    async fn query_page(&self, spec: &QuerySpec) -> Result<ResultSet>;

    /// Count rows matching the filters and search of `spec`, ignoring pagination
    async fn count_matching(&self, spec: &QuerySpec) -> Result<u64>;

    /// Fetch every matching row, up to the configured export cap
    async fn query_all(&self, spec: &QuerySpec) -> Result<ResultSet>;

    /// Column statistics over every matching row, computed by the database
    async fn table_stats(&self, spec: &QuerySpec) -> Result<Vec<ColumnStats>>;

    /// Round trip to verify the connection is usable
    async fn health_check(&self) -> Result<()>;

    /// Totals across all tables
    async fn database_overview(&self) -> Result<DatabaseOverview> {
        let summaries = self.table_summaries().await?;
        Ok(DatabaseOverview::from_summaries(&summaries))
    }
}
