use model::{observation::Observation, vehicle::Vehicle, WithId};
use registry::database::Result;
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{observation::ObservationRow, with_id, with_ids};

use super::convert_error;

pub async fn insert<'c, E>(
    executor: E,
    observation: Observation,
) -> Result<WithId<Observation>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO observations(
            vehicle_id,
            latitude,
            longitude,
            altitude_m,
            heading,
            speed_mps,
            observed_at,
            source
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *;
        ",
    )
    .bind(observation.vehicle_id.raw())
    .bind(observation.latitude)
    .bind(observation.longitude)
    .bind(observation.altitude_m)
    .bind(observation.heading)
    .bind(observation.speed_mps)
    .bind(observation.observed_at)
    .bind(observation.source)
    .fetch_one(executor)
    .await
    .map_err(|why| convert_error(why))
    .map(|row: ObservationRow| with_id(row))
}

pub async fn get_for_vehicle<'c, E>(
    executor: E,
    vehicle: &Id<Vehicle>,
) -> Result<Vec<WithId<Observation>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let results: Vec<ObservationRow> = sqlx::query_as(
        "
        SELECT * FROM observations
        WHERE vehicle_id = $1
        ORDER BY observed_at DESC, id DESC;
        ",
    )
    .bind(vehicle.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(with_ids(results))
}
