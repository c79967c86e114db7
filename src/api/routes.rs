use axum::{
    extract::{rejection::JsonRejection, Json, Path, Query, State},
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use std::time::Instant;

use crate::api::models::{HistoryQuery, MessageResponse, SummarizeRequest, SummarizeResponse};
use crate::error::{AppError, Result};
use crate::rate_limit;
use crate::source;
use crate::store::SummaryRecord;
use crate::summarizer::summarize_text;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    let limited = Router::new()
        .route("/summarize", post(summarize_handler))
        .route("/history", get(history_handler).delete(clear_history_handler))
        .route("/history/:id", delete(delete_history_handler))
        .route_layer(middleware::from_fn_with_state(app_state.clone(), rate_limit::enforce));

    Router::new()
        .route("/", get(root_handler))
        .merge(limited)
        .layer(cors_layer(&app_state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome to the Text Summarizer API!"))
}

async fn summarize_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>> {
    let start_time = Instant::now();

    let Json(req) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    if req.sentences_count < 1 {
        return Err(AppError::InvalidInput("sentences_count must be at least 1.".to_string()));
    }
    let sentence_count = req.sentences_count as usize;

    let summary = tokio::time::timeout(state.config.summarize_timeout, async {
        let text = source::resolve(&req, state.extractor.as_ref()).await?;
        tracing::debug!(chars = text.len(), "resolved source text");
        summarize_text(state.summarizer.clone(), text, sentence_count).await
    })
    .await
    .map_err(|_| AppError::SourceFetch("request timed out".to_string()))?
    .inspect_err(|e| tracing::warn!("summarize failed: {}", e))?;

    if summary.is_empty() {
        return Err(AppError::InvalidInput("No valid text found to summarize.".to_string()));
    }

    let record = state.store.create(&summary).await?;
    tracing::info!(id = record.id, elapsed = ?start_time.elapsed(), "stored summary");

    Ok(Json(SummarizeResponse { summary: record.summary_text }))
}

async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SummaryRecord>>> {
    let records = state
        .store
        .list(query.clamped_limit(), query.offset, query.search.as_deref())
        .await?;
    Ok(Json(records))
}

async fn delete_history_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if !state.store.delete_one(id).await? {
        return Err(AppError::NotFound(format!("Summary {} not found.", id)));
    }
    tracing::info!(id, "deleted summary");
    Ok(Json(MessageResponse::new(format!("Summary {} deleted.", id))))
}

async fn clear_history_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    let deleted = state.store.delete_all().await?;
    tracing::info!(deleted, "cleared history");
    Ok(Json(MessageResponse::new(format!("Deleted {} summaries.", deleted))))
}
