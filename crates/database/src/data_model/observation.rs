use chrono::{DateTime, Utc};
use model::observation::Observation;
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct ObservationRow {
    pub id: i64,
    pub vehicle_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: Option<f64>,
    pub heading: Option<f64>,
    pub speed_mps: Option<f64>,
    pub observed_at: DateTime<Utc>,
    pub source: Option<String>,
}

impl DatabaseRow for ObservationRow {
    type Model = Observation;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Observation {
        Observation {
            vehicle_id: Id::new(self.vehicle_id),
            latitude: self.latitude,
            longitude: self.longitude,
            altitude_m: self.altitude_m,
            heading: self.heading,
            speed_mps: self.speed_mps,
            observed_at: self.observed_at,
            source: self.source,
        }
    }
}
