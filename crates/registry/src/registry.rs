use chrono::{DateTime, Utc};
use model::{observation::Observation, vehicle::Vehicle, WithId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{
    database::{Database, DatabaseError, ObservationRepo, VehicleRepo},
    RequestError, RequestResult,
};

/// Caller-supplied fields for create-or-find. When the `external_id`
/// already resolves to a stored vehicle, `description` and `reported_by`
/// are defaults only and never overwrite the stored values.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VehicleFields {
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub reported_by: Option<String>,
}

/// Owns vehicle identity: one vehicle per non-empty `external_id`, and
/// lifecycle timestamps that never move backward.
#[derive(Debug, Clone)]
pub struct Registry<D>
where
    D: Database + Send + Sync + Sized + 'static,
{
    database: D,
}

impl<D> Registry<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self { database }
    }

    /// Maps an incoming report to a vehicle: returns the stored row for a
    /// known `external_id`, creates a new one otherwise.
    ///
    /// The create path is race-safe through the store's unique index on
    /// `external_id`: attempt the insert, and when it reports a uniqueness
    /// conflict, re-read by key and return the row the concurrent caller
    /// created. A plain check-then-insert would admit duplicate vehicles
    /// under load.
    pub async fn resolve(
        &self,
        fields: VehicleFields,
    ) -> RequestResult<WithId<Vehicle>> {
        self.resolve_at(fields, Utc::now()).await
    }

    /// `resolve` with an explicit sighting timestamp: a vehicle created
    /// here starts with `first_seen = last_seen = seen_at`, so the ingest
    /// pipeline can stamp new vehicles with the observation's own time
    /// rather than the ingest wall clock.
    pub async fn resolve_at(
        &self,
        fields: VehicleFields,
        seen_at: DateTime<Utc>,
    ) -> RequestResult<WithId<Vehicle>> {
        let external_id = fields.external_id.filter(|id| !id.is_empty());
        let mut store = self.database.auto();

        if let Some(key) = external_id.as_deref() {
            if let Some(existing) = store.vehicle_by_external_id(key).await? {
                return Ok(existing);
            }
        }

        let vehicle = Vehicle {
            external_id: external_id.clone(),
            description: fields.description,
            reported_by: fields.reported_by,
            first_seen: seen_at,
            last_seen: seen_at,
        };

        match store.insert_vehicle(vehicle).await {
            Ok(created) => {
                log::debug!("registered vehicle {}", created.id);
                Ok(created)
            }
            Err(DatabaseError::UniqueViolation) => match external_id.as_deref() {
                Some(key) => {
                    log::debug!("lost create race for external id {:?}", key);
                    store
                        .vehicle_by_external_id(key)
                        .await?
                        .ok_or(RequestError::NotFound)
                }
                // anonymous rows carry no key that could conflict
                None => Err(DatabaseError::UniqueViolation.into()),
            },
            Err(why) => Err(why.into()),
        }
    }

    /// Public pre-register path: create-or-find without submitting an
    /// observation. Same uniqueness and non-overwrite semantics as
    /// `resolve`.
    pub async fn register(
        &self,
        fields: VehicleFields,
    ) -> RequestResult<WithId<Vehicle>> {
        self.resolve(fields).await
    }

    /// Advances `last_seen` to `at` unless the stored value is already
    /// newer. Returns the stored timestamp. Tolerates out-of-order
    /// delivery; never moves `last_seen` backward.
    pub async fn touch(
        &self,
        id: &Id<Vehicle>,
        at: DateTime<Utc>,
    ) -> RequestResult<DateTime<Utc>> {
        Ok(self.database.auto().advance_last_seen(id, at).await?)
    }

    pub async fn vehicle(&self, id: &Id<Vehicle>) -> RequestResult<WithId<Vehicle>> {
        Ok(self.database.auto().vehicle(id).await?)
    }

    pub async fn vehicles(&self) -> RequestResult<Vec<WithId<Vehicle>>> {
        Ok(self.database.auto().vehicles().await?)
    }

    /// Observation history of one vehicle, most recent first. Fails with
    /// `NotFound` for an unknown vehicle rather than returning an empty
    /// history.
    pub async fn observations(
        &self,
        id: &Id<Vehicle>,
    ) -> RequestResult<Vec<WithId<Observation>>> {
        let mut store = self.database.auto();
        store.vehicle(id).await?;
        Ok(store.observations_for(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::memory::MemoryDatabase;

    fn fields(external_id: Option<&str>) -> VehicleFields {
        VehicleFields {
            external_id: external_id.map(str::to_owned),
            description: Some("test vehicle".to_owned()),
            reported_by: Some("unit-test".to_owned()),
        }
    }

    #[tokio::test]
    async fn resolve_creates_then_finds() {
        let registry = Registry::new(MemoryDatabase::new());

        let first = registry.resolve(fields(Some("X1"))).await.unwrap();
        let second = registry.resolve(fields(Some("X1"))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(registry.vehicles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolve_keeps_stored_fields_on_find() {
        let registry = Registry::new(MemoryDatabase::new());

        registry
            .resolve(VehicleFields {
                external_id: Some("X1".to_owned()),
                description: Some("original".to_owned()),
                reported_by: Some("reporter-a".to_owned()),
            })
            .await
            .unwrap();

        let found = registry
            .resolve(VehicleFields {
                external_id: Some("X1".to_owned()),
                description: Some("changed".to_owned()),
                reported_by: Some("reporter-b".to_owned()),
            })
            .await
            .unwrap();

        assert_eq!(found.content.description.as_deref(), Some("original"));
        assert_eq!(found.content.reported_by.as_deref(), Some("reporter-a"));
    }

    #[tokio::test]
    async fn anonymous_resolutions_never_fuse() {
        let registry = Registry::new(MemoryDatabase::new());

        let first = registry.resolve(fields(None)).await.unwrap();
        let second = registry.resolve(fields(None)).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(registry.vehicles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_external_id_is_treated_as_absent() {
        let registry = Registry::new(MemoryDatabase::new());

        let first = registry.resolve(fields(Some(""))).await.unwrap();
        let second = registry.resolve(fields(Some(""))).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.content.external_id, None);
    }

    #[tokio::test]
    async fn concurrent_resolves_create_one_vehicle() {
        let registry = Registry::new(MemoryDatabase::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.resolve(fields(Some("RACE-1"))).await.unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(registry.vehicles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolve_after_lost_race_returns_winner() {
        let database = MemoryDatabase::new();
        let registry = Registry::new(database.clone());

        // seed the row another resolution would have created
        let winner = registry.resolve(fields(Some("X9"))).await.unwrap();

        let found = registry.resolve(fields(Some("X9"))).await.unwrap();
        assert_eq!(winner.id, found.id);
    }

    #[tokio::test]
    async fn register_is_create_or_find() {
        let registry = Registry::new(MemoryDatabase::new());

        let created = registry.register(fields(Some("N-123"))).await.unwrap();
        let found = registry.register(fields(Some("N-123"))).await.unwrap();

        assert_eq!(created.id, found.id);
        assert_eq!(created.content.first_seen, created.content.last_seen);
    }

    #[tokio::test]
    async fn touch_never_moves_last_seen_backward() {
        let registry = Registry::new(MemoryDatabase::new());
        let vehicle = registry.resolve(fields(Some("X1"))).await.unwrap();

        let later = Utc::now() + Duration::minutes(10);
        let earlier = later - Duration::minutes(30);

        let stored = registry.touch(&vehicle.id, later).await.unwrap();
        assert_eq!(stored, later);

        let stored = registry.touch(&vehicle.id, earlier).await.unwrap();
        assert_eq!(stored, later);
    }

    #[tokio::test]
    async fn first_seen_is_immutable() {
        let registry = Registry::new(MemoryDatabase::new());
        let vehicle = registry.resolve(fields(Some("X1"))).await.unwrap();
        let first_seen = vehicle.content.first_seen;

        registry
            .touch(&vehicle.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        let reloaded = registry.vehicle(&vehicle.id).await.unwrap();
        assert_eq!(reloaded.content.first_seen, first_seen);
    }

    #[tokio::test]
    async fn unknown_vehicle_is_not_found() {
        let registry = Registry::new(MemoryDatabase::new());

        let result = registry.vehicle(&Id::new(4711)).await;
        assert!(matches!(result, Err(RequestError::NotFound)));

        let result = registry.observations(&Id::new(4711)).await;
        assert!(matches!(result, Err(RequestError::NotFound)));
    }
}
