//! Frontend asset serving
//!
//! Serves the embedded browser UI. The index page gets a `<base href>` so
//! its relative `api/` and `assets/` URLs resolve under any mount point.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use include_dir::{include_dir, Dir};
use std::sync::Arc;

// Embed the frontend dist directory at compile time
static FRONTEND_DISTRIBUTION: Dir = include_dir!("$CARGO_MANIFEST_DIR/frontend/dist");

/// State for frontend serving (stores base path for routing)
#[derive(Clone)]
pub struct FrontendState {
    pub base_path: Arc<String>,
}

impl FrontendState {
    /// `base_path` is normalized: no trailing slash, empty for the root
    pub fn new(base_path: String) -> Self {
        Self {
            base_path: Arc::new(base_path),
        }
    }

    fn base_href(&self) -> String {
        format!("{}/", self.base_path)
    }
}

/// Create a router for serving frontend assets
///
/// - GET / -> index.html with injected `<base href>` tag
/// - GET /assets/* -> static assets
pub fn create_frontend_router(base_path: String) -> Router {
    let state = FrontendState::new(base_path);

    Router::new()
        .route("/", get(serve_index_page))
        .route("/assets/{*path}", get(serve_static_asset))
        .with_state(state)
}

/// Insert `<base href>` right after `<head>`
fn inject_base_tag(html: &str, base_href: &str) -> String {
    let mut contents = html.to_string();
    if let Some(head_position) = contents.find("<head>") {
        let insert_position = head_position + "<head>".len();
        let base_tag = format!("\n    <base href=\"{}\">", base_href);
        contents.insert_str(insert_position, &base_tag);
    }
    contents
}

async fn serve_index_page(State(state): State<FrontendState>) -> Response {
    let Some(file) = FRONTEND_DISTRIBUTION.get_file("index.html") else {
        return serve_fallback_page();
    };

    let contents = inject_base_tag(&String::from_utf8_lossy(file.contents()), &state.base_href());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        contents,
    )
        .into_response()
}

/// Serve static assets with proper MIME types
async fn serve_static_asset(Path(path): Path<String>) -> Response {
    let asset_path = format!("assets/{}", path);

    match FRONTEND_DISTRIBUTION.get_file(&asset_path) {
        Some(file) => {
            let mime_type = mime_guess::from_path(&asset_path)
                .first_or_octet_stream()
                .to_string();

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime_type),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                file.contents(),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Asset not found: {}", asset_path),
        )
            .into_response(),
    }
}

/// Page shown when the embedded index.html is missing
fn serve_fallback_page() -> Response {
    let html = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>pg-dumper</title>
    <style>
        body { font-family: system-ui, sans-serif; max-width: 720px; margin: 80px auto; padding: 0 20px; }
        code { background: #f5f5f5; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>pg-dumper</h1>
    <p>The browser UI is not bundled in this build. The JSON API is still available:</p>
    <ul>
        <li><code>GET api/overview</code></li>
        <li><code>GET api/tables</code></li>
        <li><code>GET api/tables/{name}</code></li>
        <li><code>GET api/tables/{name}/rows</code></li>
        <li><code>GET api/tables/{name}/count</code></li>
        <li><code>GET api/tables/{name}/stats</code></li>
        <li><code>GET api/tables/{name}/export/{format}</code></li>
        <li><code>GET api/relationships</code></li>
        <li><code>GET api/health</code></li>
    </ul>
</body>
</html>
"#;

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        html,
    )
        .into_response()
}
