//! HTTP API for whyis
//!
//! Thin axum layer over [`whyis_market::StockService`]. All data fetching,
//! caching and summarisation happens in the market crate; handlers only map
//! results to JSON and status codes.

pub mod error;
pub mod request_id;
pub mod routes;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use whyis_market::StockService;

pub use error::{ApiError, ApiResult};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: StockService,
}

impl AppState {
    pub fn new(service: StockService) -> Self {
        Self { service }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/stock/:ticker", get(routes::stock_page))
        .route("/api/search", get(routes::search))
        .route("/api/markets", get(routes::markets))
        .route("/api/contact", post(routes::contact))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
