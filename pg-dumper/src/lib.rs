//! # pg-dumper
//!
//! Browse a PostgreSQL database from a web browser.
//!
//! ## Features
//!
//! - Connection target resolved from a URL or discrete host/port/credential settings
//! - Schema discovery: tables, typed columns, primary and foreign keys
//! - Paginated row browsing with case-insensitive search and column filters
//! - Column statistics for the current page or the whole filtered table
//! - Export to CSV, JSON, and Excel spreadsheets
//!
//! ## Safety
//!
//! The browser is strictly read-only. Every user-supplied value reaches the
//! database as a bound parameter, and table/column identifiers are embedded
//! in SQL text only after an exact match against the catalog.
//!
//! There is no authentication layer: do not expose the router on a public
//! network.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::Router;
//! use pg_dumper::{BrowserLimits, ConnectionResolver, ConnectionSettings, PgDumperLayer};
//!
//! #[tokio::main]
//! async fn main() -> pg_dumper::Result<()> {
//!     let settings = ConnectionSettings {
//!         url: Some("postgres://postgres@localhost/app".to_string()),
//!         ..Default::default()
//!     };
//!
//!     let resolver = ConnectionResolver::new(settings.resolve()?);
//!     let pool = resolver.connect().await?;
//!
//!     let app = Router::new()
//!         .merge(PgDumperLayer::postgres("/db", pool, "public", BrowserLimits::default()).into_router());
//!
//!     // Serve the application...
//!     Ok(())
//! }
//! ```

// Public modules
pub mod api;
pub mod connection;
pub mod database;
pub mod export;
pub mod frontend;
pub mod layer;
pub mod query_builder;
pub mod schema;
pub mod stats;

// Public exports
pub use connection::{ConnectionResolver, ConnectionSettings, ConnectionTarget};
pub use export::{encode, ExportFormat};
pub use layer::PgDumperLayer;
pub use query_builder::{BrowserLimits, QueryBuilder};
pub use schema::{
    ColumnDescriptor, ColumnStats, FilterPredicate, ForeignKey, QuerySpec, ResultSet,
    TableDescriptor, TypeCategory,
};
pub use stats::{compute_stats, StatsScope};

// Re-export database providers
pub use database::postgres::PostgresProvider;
pub use database::traits::DatabaseProvider;

use thiserror::Error;

/// Error taxonomy shared by every component
///
/// Configuration and connection errors are fatal at startup. The remaining
/// variants are per-request and are turned into user-visible messages at the
/// HTTP boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection settings could not be resolved into a target
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The driver failed to connect or authenticate
    #[error("Connection error: {0}")]
    Connection(String),

    /// Unknown table or column reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identifier outside the known schema, or a malformed value
    #[error("Validation error: {0}")]
    Validation(String),

    /// A value could not be written in the chosen export format
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Any other driver error, surfaced without retry
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Error::NotFound("no rows returned".to_string()),
            other => Error::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Encoding(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
