//! Route handlers
//!
//! - `GET /api/stock/:ticker` - full stock page payload
//! - `GET /api/search?q=` - ticker lookup
//! - `GET /api/markets` - global index board
//! - `POST /api/contact` - contact form relay
//! - `GET /health` - liveness probe

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::CACHE_CONTROL;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};
use whyis_market::{ContactMessage, MarketContext, MarketError, SearchResult};

use crate::AppState;
use crate::error::{ApiError, ApiResult};

const PAGE_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=120";

pub async fn stock_page(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let page = state.service.page(&ticker).await?;
    Ok(([(CACHE_CONTROL, PAGE_CACHE_CONTROL)], Json(page)))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let results = match params.q.as_deref() {
        Some(q) => state.service.search(q).await,
        None => Vec::new(),
    };
    Json(SearchResponse { results })
}

pub async fn markets(State(state): State<AppState>) -> Json<MarketContext> {
    Json(state.service.market_overview().await)
}

pub async fn contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactMessage>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(message) = payload.map_err(|rejection| {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    match state.service.send_contact(&message).await {
        Ok(()) => {
            info!("Contact message accepted");
            Ok(Json(json!({ "ok": true })))
        }
        Err(e @ MarketError::InvalidInput(_)) => Err(e.into()),
        Err(e) => {
            error!("Contact relay failed: {e}");
            Err(ApiError::Internal("Failed to send message.".to_string()))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
