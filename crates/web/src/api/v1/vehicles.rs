use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{get, on},
    Json, Router,
};
use model::{observation::Observation, vehicle::Vehicle, WithId};
use registry::registry::VehicleFields;
use utility::id::Id;

use crate::{
    common::{
        route_not_found, schema, RouteErrorResponse, VecResponse,
        METHOD_FILTER_ALL,
    },
    RouteResult, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<Vehicle>))
        .route("/:id", get(get_vehicle))
        .route("/:id/observations", get(get_observations))
        .route("/", get(get_vehicles).post(register_vehicle))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_vehicles(
    OriginalUri(original_uri): OriginalUri,
    State(WebState {
        vehicle_registry, ..
    }): State<WebState>,
) -> RouteResult<Json<VecResponse<WithId<Vehicle>>>> {
    vehicle_registry
        .vehicles()
        .await
        .map(|vehicles| VecResponse::new(vehicles).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_vehicle(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<i64>,
    State(WebState {
        vehicle_registry, ..
    }): State<WebState>,
) -> RouteResult<Json<WithId<Vehicle>>> {
    vehicle_registry
        .vehicle(&Id::new(id))
        .await
        .map(Json)
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_observations(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<i64>,
    State(WebState {
        vehicle_registry, ..
    }): State<WebState>,
) -> RouteResult<Json<VecResponse<WithId<Observation>>>> {
    vehicle_registry
        .observations(&Id::new(id))
        .await
        .map(|observations| VecResponse::new(observations).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

/// Create-or-find without an observation: the pre-register path. Posting
/// the same `externalId` twice returns the row created the first time.
async fn register_vehicle(
    OriginalUri(original_uri): OriginalUri,
    State(WebState {
        vehicle_registry, ..
    }): State<WebState>,
    Json(fields): Json<VehicleFields>,
) -> RouteResult<Json<WithId<Vehicle>>> {
    vehicle_registry
        .register(fields)
        .await
        .map(Json)
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}
