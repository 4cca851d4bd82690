use chrono::{DateTime, TimeZone, Utc};
use model::{observation::Observation, vehicle::Vehicle, ExampleData, WithId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    database::{Database, ObservationRepo},
    registry::{Registry, VehicleFields},
    RequestError, RequestResult,
};

/// Raw telemetry payload as submitted by a reporter. Everything is optional
/// at the wire level; the pipeline decides what is actually required.
/// Unknown fields are rejected before they reach the registry.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TelemetryReport {
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub heading: Option<f64>,
    pub speed_mps: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

impl ExampleData for TelemetryReport {
    fn example_data() -> Self {
        TelemetryReport {
            external_id: Some("FAA-3981724".to_owned()),
            description: Some("quadcopter, white".to_owned()),
            latitude: Some(37.7749),
            longitude: Some(-122.4194),
            altitude_m: Some(52.0),
            heading: Some(270.0),
            speed_mps: Some(8.5),
            observed_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()),
            source: Some("cellphone-4412".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub vehicle: WithId<Vehicle>,
    pub observation: WithId<Observation>,
}

/// Validates a report, drives identity resolution through the registry,
/// persists the observation and returns the combined outcome.
#[derive(Debug, Clone)]
pub struct IngestPipeline<D>
where
    D: Database + Send + Sync + Sized + 'static,
{
    registry: Registry<D>,
    database: D,
}

impl<D> IngestPipeline<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self {
            registry: Registry::new(database.clone()),
            database,
        }
    }

    /// Single ingest step. No retries happen in here: a persistence failure
    /// is fatal for this one report and propagates to the caller, who may
    /// resubmit the whole request.
    pub async fn ingest(
        &self,
        report: TelemetryReport,
    ) -> RequestResult<IngestOutcome> {
        let (latitude, longitude) = match (report.latitude, report.longitude) {
            (Some(latitude), Some(longitude)) => (latitude, longitude),
            _ => {
                return Err(RequestError::validation(
                    "latitude and longitude are required",
                ))
            }
        };

        let observed_at = report.observed_at.unwrap_or_else(Utc::now);
        let vehicle = self
            .registry
            .resolve_at(
                VehicleFields {
                    external_id: report.external_id,
                    description: report.description,
                    reported_by: report.source.clone(),
                },
                observed_at,
            )
            .await?;
        let observation = self
            .database
            .auto()
            .insert_observation(Observation {
                vehicle_id: vehicle.id.clone(),
                latitude,
                longitude,
                altitude_m: report.altitude_m,
                heading: report.heading,
                speed_mps: report.speed_mps,
                observed_at,
                source: report.source,
            })
            .await?;

        let last_seen = self.registry.touch(&vehicle.id, observed_at).await?;
        let vehicle = WithId::new(
            vehicle.id,
            Vehicle {
                last_seen,
                ..vehicle.content
            },
        );

        Ok(IngestOutcome {
            vehicle,
            observation,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::memory::MemoryDatabase;

    fn report(external_id: Option<&str>) -> TelemetryReport {
        TelemetryReport {
            external_id: external_id.map(str::to_owned),
            latitude: Some(37.77),
            longitude: Some(-122.41),
            altitude_m: Some(50.0),
            source: Some("cellphone-1".to_owned()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_ingest_creates_vehicle_and_observation() {
        let database = MemoryDatabase::new();
        let pipeline = IngestPipeline::new(database.clone());

        let outcome = pipeline.ingest(report(Some("X1"))).await.unwrap();

        assert_eq!(outcome.vehicle.content.external_id.as_deref(), Some("X1"));
        assert_eq!(
            outcome.vehicle.content.first_seen,
            outcome.vehicle.content.last_seen
        );
        assert_eq!(outcome.observation.content.latitude, 37.77);
        assert_eq!(outcome.observation.content.vehicle_id, outcome.vehicle.id);

        let registry = Registry::new(database);
        let history = registry.observations(&outcome.vehicle.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn repeated_ingest_reuses_vehicle_and_appends() {
        let database = MemoryDatabase::new();
        let pipeline = IngestPipeline::new(database.clone());

        let first = pipeline.ingest(report(Some("X1"))).await.unwrap();
        let second = pipeline
            .ingest(TelemetryReport {
                altitude_m: Some(80.0),
                ..report(Some("X1"))
            })
            .await
            .unwrap();

        assert_eq!(first.vehicle.id, second.vehicle.id);
        assert!(second.vehicle.content.last_seen >= first.vehicle.content.last_seen);

        let registry = Registry::new(database);
        let history = registry.observations(&first.vehicle.id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn anonymous_ingests_create_distinct_vehicles() {
        let pipeline = IngestPipeline::new(MemoryDatabase::new());

        let first = pipeline.ingest(report(None)).await.unwrap();
        let second = pipeline.ingest(report(None)).await.unwrap();

        assert_ne!(first.vehicle.id, second.vehicle.id);
    }

    #[tokio::test]
    async fn missing_latitude_fails_validation_without_side_effects() {
        let database = MemoryDatabase::new();
        let pipeline = IngestPipeline::new(database.clone());

        let result = pipeline
            .ingest(TelemetryReport {
                latitude: None,
                ..report(Some("X1"))
            })
            .await;

        assert!(matches!(result, Err(RequestError::Validation(_))));

        let registry = Registry::new(database);
        assert!(registry.vehicles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_seen_tracks_maximum_observed_at() {
        let pipeline = IngestPipeline::new(MemoryDatabase::new());

        let late = Utc::now() + Duration::minutes(30);
        let early = late - Duration::hours(2);

        let outcome = pipeline
            .ingest(TelemetryReport {
                observed_at: Some(late),
                ..report(Some("X1"))
            })
            .await
            .unwrap();
        assert_eq!(outcome.vehicle.content.last_seen, late);

        // out-of-order delivery must not move last_seen backward
        let outcome = pipeline
            .ingest(TelemetryReport {
                observed_at: Some(early),
                ..report(Some("X1"))
            })
            .await
            .unwrap();
        assert_eq!(outcome.vehicle.content.last_seen, late);
        assert_eq!(outcome.observation.content.observed_at, early);
    }

    #[tokio::test]
    async fn reporter_supplied_observed_at_is_kept() {
        let pipeline = IngestPipeline::new(MemoryDatabase::new());

        let at = Utc::now() - Duration::minutes(5);
        let outcome = pipeline
            .ingest(TelemetryReport {
                observed_at: Some(at),
                ..report(Some("X1"))
            })
            .await
            .unwrap();

        assert_eq!(outcome.observation.content.observed_at, at);
    }
}
