//! Serve command implementation.

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use kmsort_canonical::{canonicalize_document, PolicyRegistry};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

const INDEX_PAGE: &str = include_str!("../../static/index.html");

#[derive(Debug, Default, Deserialize)]
pub struct RenderForm {
    #[serde(default)]
    pub manifest: String,
}

pub fn run(registry: PolicyRegistry, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(Arc::new(registry), addr))
}

async fn serve(
    registry: Arc<PolicyRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;

    info!(addr = %addr, "manifest server listening");

    axum::serve(listener, router(registry))
        .await
        .map_err(|e| format!("Server error: {}", e))?;
    Ok(())
}

pub fn router(registry: Arc<PolicyRegistry>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/render", get(render).post(render))
        .with_state(registry)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Accepts the `manifest` field from a query string or a urlencoded body.
pub async fn render(
    State(registry): State<Arc<PolicyRegistry>>,
    Form(form): Form<RenderForm>,
) -> Response {
    if form.manifest.is_empty() {
        return StatusCode::OK.into_response();
    }

    match canonicalize_document(&registry, &form.manifest) {
        Ok(text) => text.into_response(),
        Err(e) => {
            debug!(error = %e, "render failed");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Cannot sort manifest, due to err: {}", e),
            )
                .into_response()
        }
    }
}
