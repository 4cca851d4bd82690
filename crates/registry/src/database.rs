use std::{error, fmt, result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{observation::Observation, vehicle::Vehicle, WithId};
use utility::id::Id;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    /// An insert hit a uniqueness constraint. Transient by nature: the row
    /// that won the race can be re-read by its key.
    UniqueViolation,
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "row not found"),
            Self::UniqueViolation => write!(f, "uniqueness constraint violated"),
            Self::Other(why) => write!(f, "database error: {}", why),
        }
    }
}

impl error::Error for DatabaseError {}

pub type Result<T> = result::Result<T, DatabaseError>;

#[async_trait]
pub trait VehicleRepo {
    /// Inserts a new vehicle row. Fails with `UniqueViolation` if another
    /// row already carries the same non-null `external_id`.
    async fn insert_vehicle(&mut self, vehicle: Vehicle) -> Result<WithId<Vehicle>>;

    async fn vehicle_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<WithId<Vehicle>>>;

    async fn vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>>;

    /// All vehicles in store order. The order is deterministic for an
    /// unmodified dataset (primary key ascending).
    async fn vehicles(&mut self) -> Result<Vec<WithId<Vehicle>>>;

    /// Sets `last_seen = max(last_seen, at)` in a single atomic step and
    /// returns the stored value. Concurrent calls must not lose the larger
    /// timestamp.
    async fn advance_last_seen(
        &mut self,
        id: &Id<Vehicle>,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;
}

#[async_trait]
pub trait ObservationRepo {
    async fn insert_observation(
        &mut self,
        observation: Observation,
    ) -> Result<WithId<Observation>>;

    /// Observation history of one vehicle, most recent first.
    async fn observations_for(
        &mut self,
        vehicle: &Id<Vehicle>,
    ) -> Result<Vec<WithId<Observation>>>;
}

pub trait DatabaseOperations: VehicleRepo + ObservationRepo {}

/// Trait to implement a vehicle registry store.
/// Multiple concurrent accesses should be possible by e.g. cloning the
/// database object. No vehicle state is cached in process; every call
/// consults the store.
pub trait Database: Clone + Send + Sync + Sized {
    type Autocommit: DatabaseOperations + Send;

    fn auto(&self) -> Self::Autocommit;
}
