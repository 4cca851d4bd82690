use chrono::{DateTime, Utc};
use model::{vehicle::Vehicle, WithId};
use registry::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{vehicle::VehicleRow, with_id, with_ids};

use super::convert_error;

pub async fn insert<'c, E>(
    executor: E,
    vehicle: Vehicle,
) -> Result<WithId<Vehicle>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO vehicles(
            external_id,
            description,
            reported_by,
            first_seen,
            last_seen
        )
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *;
        ",
    )
    .bind(vehicle.external_id)
    .bind(vehicle.description)
    .bind(vehicle.reported_by)
    .bind(vehicle.first_seen)
    .bind(vehicle.last_seen)
    .fetch_one(executor)
    .await
    .map_err(|why| convert_error(why))
    .map(|row: VehicleRow| with_id(row))
}

pub async fn by_external_id<'c, E>(
    executor: E,
    external_id: &str,
) -> Result<Option<WithId<Vehicle>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT * FROM vehicles WHERE external_id = $1;
        ",
    )
    .bind(external_id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?
    .map(|row: VehicleRow| with_id(row))
    .let_owned(|result| Ok(result))
}

pub async fn get<'c, E>(executor: E, id: &Id<Vehicle>) -> Result<WithId<Vehicle>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT * FROM vehicles WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(|why| convert_error(why))
    .map(|row: VehicleRow| with_id(row))
}

pub async fn get_all<'c, E>(executor: E) -> Result<Vec<WithId<Vehicle>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let results: Vec<VehicleRow> =
        sqlx::query_as("SELECT * FROM vehicles ORDER BY id ASC;")
            .fetch_all(executor)
            .await
            .map_err(convert_error)?;
    Ok(with_ids(results))
}

pub async fn advance_last_seen<'c, E>(
    executor: E,
    id: &Id<Vehicle>,
    at: DateTime<Utc>,
) -> Result<DateTime<Utc>>
where
    E: Executor<'c, Database = Postgres>,
{
    // single-statement max update; concurrent touches cannot lose the
    // larger timestamp
    sqlx::query_scalar(
        "
        UPDATE vehicles
        SET last_seen = GREATEST(last_seen, $2)
        WHERE id = $1
        RETURNING last_seen;
        ",
    )
    .bind(id.raw())
    .bind(at)
    .fetch_one(executor)
    .await
    .map_err(|why| convert_error(why))
}
