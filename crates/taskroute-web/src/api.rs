//! REST API endpoint handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use taskroute::Error;
use taskroute::review::{
    Annotation, FeedbackFilter, FeedbackReason, FeedbackRecord, LogFacets, LogFilter,
    ReviewService,
};
use taskroute::sink::InteractionRecord;
use tracing::warn;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReviewService>,
}

/// A library error rendered as `{"error": "..."}` with a matching status.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::FeedbackNotFound(_) => StatusCode::NOT_FOUND,
            Error::SinkUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_configuration() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Review API error: {}", self.0);
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// GET /api/logs: Recent interactions matching the query filters.
pub async fn get_logs(
    State(app): State<AppState>,
    Query(filter): Query<LogFilter>,
) -> ApiResult<Json<Vec<InteractionRecord>>> {
    Ok(Json(app.service.logs(&filter).await?))
}

/// GET /api/logs/facets: Filter choices present in the log window.
pub async fn get_facets(State(app): State<AppState>) -> ApiResult<Json<LogFacets>> {
    Ok(Json(app.service.facets().await?))
}

/// Request body for POST /api/feedback.
#[derive(Deserialize)]
pub struct FlagRequest {
    pub log: InteractionRecord,
    pub reason: FeedbackReason,
    #[serde(default)]
    pub comment: String,
}

/// POST /api/feedback: Flag an interaction.
///
/// Returns 201 with the stored record. An unknown reason is rejected by the
/// JSON extractor with 422.
pub async fn post_feedback(
    State(app): State<AppState>,
    Json(body): Json<FlagRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackRecord>)> {
    let record = app
        .service
        .flag(body.log, body.reason, body.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/feedback: Feedback records matching the query filters.
pub async fn get_feedback(
    State(app): State<AppState>,
    Query(filter): Query<FeedbackFilter>,
) -> ApiResult<Json<Vec<FeedbackRecord>>> {
    Ok(Json(app.service.list(&filter).await?))
}

/// PATCH /api/feedback/{id}: Update a record's comment and/or reviewed flag.
///
/// Returns 404 if no record has this id.
pub async fn patch_feedback(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(annotation): Json<Annotation>,
) -> ApiResult<Json<FeedbackRecord>> {
    Ok(Json(app.service.annotate(&id, annotation).await?))
}

/// GET /api/feedback/export: Filtered feedback as a CSV download.
pub async fn export_feedback(
    State(app): State<AppState>,
    Query(filter): Query<FeedbackFilter>,
) -> ApiResult<Response> {
    let csv = app.service.export_csv(&filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"filtered_feedback.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
