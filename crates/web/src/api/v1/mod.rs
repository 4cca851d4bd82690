use axum::{routing::on, Router};

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

mod telemetry;
mod vehicles;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .nest_service("/vehicles", vehicles::routes(state.clone()))
        .nest_service("/telemetry", telemetry::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}
