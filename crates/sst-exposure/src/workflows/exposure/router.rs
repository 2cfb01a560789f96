use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::catalog::FunctionId;
use super::domain::SectorRef;
use super::resolver::{FunctionSource, ResolveError, SourceError};
use super::service::ExposureService;
use super::session::SelectionOutcome;
use super::submission::DocumentKind;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AggregateRequest {
    pub(crate) document: DocumentKind,
    #[serde(default)]
    pub(crate) sectors: Vec<SectorRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectionRequest {
    #[serde(default)]
    pub(crate) sectors: Vec<SectorRef>,
}

/// Router builder exposing the aggregation engine over HTTP.
pub fn exposure_router<S>(service: Arc<ExposureService<S>>) -> Router
where
    S: FunctionSource + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/exposure/aggregate", post(aggregate_handler::<S>))
        .route(
            "/api/v1/exposure/functions/:function_id",
            get(function_handler::<S>),
        )
        .route("/api/v1/exposure/session", get(session_handler::<S>))
        .route(
            "/api/v1/exposure/session/selection",
            put(selection_handler::<S>),
        )
        .route(
            "/api/v1/exposure/session/functions/:function_id/refresh",
            post(refresh_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn aggregate_handler<S>(
    State(service): State<Arc<ExposureService<S>>>,
    axum::Json(request): axum::Json<AggregateRequest>,
) -> Response
where
    S: FunctionSource + ?Sized + 'static,
{
    let report = service
        .aggregate_sectors(request.document, &request.sectors)
        .await;
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn function_handler<S>(
    State(service): State<Arc<ExposureService<S>>>,
    Path(function_id): Path<u64>,
) -> Response
where
    S: FunctionSource + ?Sized + 'static,
{
    match service.function(FunctionId(function_id)).await {
        Ok(function) => (StatusCode::OK, axum::Json(function)).into_response(),
        Err(error) => resolve_error_response(error),
    }
}

pub(crate) async fn session_handler<S>(State(service): State<Arc<ExposureService<S>>>) -> Response
where
    S: FunctionSource + ?Sized + 'static,
{
    let snapshot = service.snapshot();
    (StatusCode::OK, axum::Json(snapshot.as_ref().clone())).into_response()
}

pub(crate) async fn selection_handler<S>(
    State(service): State<Arc<ExposureService<S>>>,
    axum::Json(request): axum::Json<SelectionRequest>,
) -> Response
where
    S: FunctionSource + ?Sized + 'static,
{
    selection_response(service.select(request.sectors).await)
}

pub(crate) async fn refresh_handler<S>(
    State(service): State<Arc<ExposureService<S>>>,
    Path(function_id): Path<u64>,
) -> Response
where
    S: FunctionSource + ?Sized + 'static,
{
    match service.refresh_function(FunctionId(function_id)).await {
        Ok(outcome) => selection_response(outcome),
        Err(error) => resolve_error_response(error),
    }
}

fn selection_response(outcome: SelectionOutcome) -> Response {
    match outcome {
        SelectionOutcome::Committed(snapshot) => {
            (StatusCode::OK, axum::Json(snapshot.as_ref().clone())).into_response()
        }
        SelectionOutcome::Superseded { generation, latest } => {
            let payload = json!({
                "error": "selection superseded by a newer request",
                "generation": generation,
                "latest": latest,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
    }
}

fn resolve_error_response(error: ResolveError) -> Response {
    let status = match &error {
        ResolveError::Source {
            source: SourceError::NotFound,
            ..
        } => StatusCode::NOT_FOUND,
        ResolveError::Source {
            source: SourceError::Timeout(_),
            ..
        } => StatusCode::GATEWAY_TIMEOUT,
        ResolveError::Source { .. } | ResolveError::Decode { .. } => StatusCode::BAD_GATEWAY,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
