//! Static file serving handlers
//!
//! `/` answers with the frontend's `index.html`, falling back to a minimal
//! built-in page; everything under `/static` is served by `ServeDir`.

use axum::extract::State;
use axum::response::Html;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::warn;

use crate::state::AppState;

const FALLBACK_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Channel Supervisor</title>
</head>
<body>
    <h1>Channel Supervisor</h1>
    <p>Frontend assets not found. Channel status is available at <a href="/api/channels">/api/channels</a>.</p>
</body>
</html>
"#;

/// Serve index.html for root path
pub async fn serve_index(State(state): State<Arc<AppState>>) -> Html<String> {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Html(content),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "index.html unavailable, serving fallback page");
            Html(FALLBACK_INDEX.to_string())
        }
    }
}

/// Service for the `/static` asset tree
pub fn static_assets(static_dir: &Path) -> ServeDir {
    ServeDir::new(static_dir.join("static"))
}
