use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

pub mod browser;
pub mod models;
pub mod scrape;

use models::ScrapeRequest;

/// Build the service router: a single scrape endpoint, open to any origin.
pub fn app() -> Router {
    Router::new()
        .route("/scrape", post(scrape_endpoint))
        .layer(CorsLayer::permissive())
}

async fn scrape_endpoint(Json(req): Json<ScrapeRequest>) -> Response {
    tracing::info!(url = %req.url, "scrape requested");
    match scrape::scrape_page(&req.url).await {
        Ok(extract) => (StatusCode::OK, Json(extract)).into_response(),
        Err(e) => {
            tracing::warn!(url = %req.url, error = %e, "scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string(), "kind": e.kind()})),
            )
                .into_response()
        }
    }
}
