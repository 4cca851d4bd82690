use axum::{
    extract::{OriginalUri, State},
    http::Method,
    routing::{get, on, post},
    Json, Router,
};
use registry::ingest::{IngestOutcome, TelemetryReport};

use crate::{
    common::{route_not_found, schema, RouteErrorResponse, METHOD_FILTER_ALL},
    RouteResult, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<TelemetryReport>))
        .route("/", post(ingest_telemetry))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Accepts one telemetry report and answers with the resolved vehicle and
/// the stored observation. Reports without coordinates are rejected before
/// anything is persisted.
async fn ingest_telemetry(
    OriginalUri(original_uri): OriginalUri,
    State(WebState {
        ingest_pipeline, ..
    }): State<WebState>,
    Json(report): Json<TelemetryReport>,
) -> RouteResult<Json<IngestOutcome>> {
    ingest_pipeline
        .ingest(report)
        .await
        .map(Json)
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}
