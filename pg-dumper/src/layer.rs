//! PgDumperLayer - Main Axum integration layer
//!
//! Mounts the JSON API and the browser UI under a base path.

use axum::{response::Redirect, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::database::postgres::PostgresProvider;
use crate::database::traits::DatabaseProvider;
use crate::frontend::create_frontend_router;
use crate::query_builder::BrowserLimits;

/// Main layer for mounting the database browser into an Axum application
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use pg_dumper::{BrowserLimits, PgDumperLayer};
/// use sqlx::PgPool;
///
/// # async fn example() {
/// let pool = PgPool::connect("postgres://postgres@localhost/shop").await.unwrap();
/// let browser = PgDumperLayer::postgres("/db", pool, "public", BrowserLimits::default());
/// let app = Router::new().merge(browser.into_router());
/// # }
/// ```
pub struct PgDumperLayer<DB: DatabaseProvider> {
    base_path: String,
    database: Arc<DB>,
}

/// Strip trailing slashes and ensure a leading one; the root becomes ""
fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

impl<DB: DatabaseProvider> PgDumperLayer<DB> {
    /// Create a new browser at the given base path
    ///
    /// # Arguments
    ///
    /// * `base_path` - URL path the browser is mounted at (e.g. "/db", or "/" for the root)
    /// * `database` - The database provider implementation
    pub fn new(base_path: impl AsRef<str>, database: DB) -> Self {
        Self {
            base_path: normalize_base_path(base_path.as_ref()),
            database: Arc::new(database),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// The returned router includes:
    /// - the browser UI at `{base_path}/`
    /// - API endpoints at `{base_path}/api/*`
    /// - permissive CORS and request tracing
    pub fn into_router(self) -> Router {
        let api_router = create_api_router(self.database);
        let frontend_router = create_frontend_router(self.base_path.clone());

        // Axum cannot nest at "/", so the root mount merges instead
        let router = if self.base_path.is_empty() {
            Router::new()
                .nest("/api", api_router)
                .merge(frontend_router)
        } else {
            let index = self.base_path.clone();
            Router::new()
                .nest(&format!("{}/api", self.base_path), api_router)
                .nest(&self.base_path, frontend_router)
                .route(
                    &format!("{}/", self.base_path),
                    get(move || async move { Redirect::permanent(&index) }),
                )
        };

        router
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }
}

impl PgDumperLayer<PostgresProvider> {
    /// Create a new browser for a PostgreSQL schema
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the browser will be mounted
    /// * `pool` - The PostgreSQL connection pool
    /// * `schema` - Schema whose tables are listed
    /// * `limits` - Page size and export caps
    pub fn postgres(
        base_path: impl AsRef<str>,
        pool: sqlx::PgPool,
        schema: impl Into<String>,
        limits: BrowserLimits,
    ) -> Self {
        Self::new(base_path, PostgresProvider::new(pool, schema, limits))
    }
}
