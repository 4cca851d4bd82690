use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{observation::Observation, vehicle::Vehicle, WithId};
use utility::id::Id;

use crate::database::{
    Database, DatabaseError, DatabaseOperations, ObservationRepo, Result,
    VehicleRepo,
};

/// In-memory implementation of the registry store, used by the test suites
/// instead of a running PostgreSQL instance.
///
/// The single mutex is the serialization point that stands in for the
/// database's unique index: an insert checks and writes under one lock, so
/// two racing creates for the same `external_id` behave exactly like the
/// real store, with the loser receiving `UniqueViolation`.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Mutex<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    next_vehicle_id: i64,
    next_observation_id: i64,
    vehicles: BTreeMap<i64, Vehicle>,
    observations: BTreeMap<i64, Observation>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for MemoryDatabase {
    type Autocommit = MemoryDatabase;

    fn auto(&self) -> Self::Autocommit {
        self.clone()
    }
}

impl DatabaseOperations for MemoryDatabase {}

#[async_trait]
impl VehicleRepo for MemoryDatabase {
    async fn insert_vehicle(&mut self, vehicle: Vehicle) -> Result<WithId<Vehicle>> {
        let mut tables = self.inner.lock().expect("store mutex poisoned");

        if let Some(external_id) = vehicle.external_id.as_deref() {
            let taken = tables
                .vehicles
                .values()
                .any(|row| row.external_id.as_deref() == Some(external_id));
            if taken {
                return Err(DatabaseError::UniqueViolation);
            }
        }

        tables.next_vehicle_id += 1;
        let id = tables.next_vehicle_id;
        tables.vehicles.insert(id, vehicle.clone());
        Ok(WithId::new(Id::new(id), vehicle))
    }

    async fn vehicle_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<WithId<Vehicle>>> {
        let tables = self.inner.lock().expect("store mutex poisoned");
        Ok(tables
            .vehicles
            .iter()
            .find(|(_, row)| row.external_id.as_deref() == Some(external_id))
            .map(|(id, row)| WithId::new(Id::new(*id), row.clone())))
    }

    async fn vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>> {
        let tables = self.inner.lock().expect("store mutex poisoned");
        tables
            .vehicles
            .get(&id.raw())
            .map(|row| WithId::new(id.clone(), row.clone()))
            .ok_or(DatabaseError::NotFound)
    }

    async fn vehicles(&mut self) -> Result<Vec<WithId<Vehicle>>> {
        let tables = self.inner.lock().expect("store mutex poisoned");
        Ok(tables
            .vehicles
            .iter()
            .map(|(id, row)| WithId::new(Id::new(*id), row.clone()))
            .collect())
    }

    async fn advance_last_seen(
        &mut self,
        id: &Id<Vehicle>,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let mut tables = self.inner.lock().expect("store mutex poisoned");
        let row = tables
            .vehicles
            .get_mut(&id.raw())
            .ok_or(DatabaseError::NotFound)?;
        row.last_seen = row.last_seen.max(at);
        Ok(row.last_seen)
    }
}

#[async_trait]
impl ObservationRepo for MemoryDatabase {
    async fn insert_observation(
        &mut self,
        observation: Observation,
    ) -> Result<WithId<Observation>> {
        let mut tables = self.inner.lock().expect("store mutex poisoned");
        tables.next_observation_id += 1;
        let id = tables.next_observation_id;
        tables.observations.insert(id, observation.clone());
        Ok(WithId::new(Id::new(id), observation))
    }

    async fn observations_for(
        &mut self,
        vehicle: &Id<Vehicle>,
    ) -> Result<Vec<WithId<Observation>>> {
        let tables = self.inner.lock().expect("store mutex poisoned");
        let mut history = tables
            .observations
            .iter()
            .filter(|(_, row)| row.vehicle_id == *vehicle)
            .map(|(id, row)| WithId::new(Id::new(*id), row.clone()))
            .collect::<Vec<_>>();
        history.sort_by(|a, b| {
            b.content
                .observed_at
                .cmp(&a.content.observed_at)
                .then(b.id.raw().cmp(&a.id.raw()))
        });
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(external_id: Option<&str>) -> Vehicle {
        let now = Utc::now();
        Vehicle {
            external_id: external_id.map(str::to_owned),
            description: None,
            reported_by: None,
            first_seen: now,
            last_seen: now,
        }
    }

    #[tokio::test]
    async fn duplicate_external_id_is_a_unique_violation() {
        let mut store = MemoryDatabase::new().auto();

        store.insert_vehicle(vehicle(Some("A1"))).await.unwrap();
        let result = store.insert_vehicle(vehicle(Some("A1"))).await;

        assert!(matches!(result, Err(DatabaseError::UniqueViolation)));
    }

    #[tokio::test]
    async fn null_external_ids_do_not_conflict() {
        let mut store = MemoryDatabase::new().auto();

        store.insert_vehicle(vehicle(None)).await.unwrap();
        store.insert_vehicle(vehicle(None)).await.unwrap();

        assert_eq!(store.vehicles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn vehicles_are_listed_in_id_order() {
        let mut store = MemoryDatabase::new().auto();

        store.insert_vehicle(vehicle(Some("A1"))).await.unwrap();
        store.insert_vehicle(vehicle(Some("A2"))).await.unwrap();
        store.insert_vehicle(vehicle(Some("A3"))).await.unwrap();

        let ids = store
            .vehicles()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.id.raw())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let mut store = MemoryDatabase::new().auto();
        let owner = store.insert_vehicle(vehicle(Some("A1"))).await.unwrap();

        let base = Utc::now();
        for minutes in [5i64, 1, 9] {
            store
                .insert_observation(Observation {
                    vehicle_id: owner.id.clone(),
                    latitude: 54.32,
                    longitude: 10.12,
                    altitude_m: None,
                    heading: None,
                    speed_mps: None,
                    observed_at: base + chrono::Duration::minutes(minutes),
                    source: None,
                })
                .await
                .unwrap();
        }

        let history = store.observations_for(&owner.id).await.unwrap();
        let offsets = history
            .iter()
            .map(|row| (row.content.observed_at - base).num_minutes())
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![9, 5, 1]);
    }
}
