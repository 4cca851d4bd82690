pub use crate::common::RouteResult;

use axum::{extract::FromRef, Router};
use database::PgDatabase;
use registry::{ingest::IngestPipeline, registry::Registry};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;

#[derive(Clone, FromRef)]
pub struct WebState {
    pub vehicle_registry: Registry<PgDatabase>,
    pub ingest_pipeline: IngestPipeline<PgDatabase>,
}

pub async fn start_web_server(state: WebState) -> std::io::Result<()> {
    let routes = Router::new()
        .nest_service("/api", api::routes(state))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind("0.0.0.0:8080").await?;
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}
