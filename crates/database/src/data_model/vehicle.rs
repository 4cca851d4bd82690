use chrono::{DateTime, Utc};
use model::vehicle::Vehicle;
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct VehicleRow {
    pub id: i64,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub reported_by: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl DatabaseRow for VehicleRow {
    type Model = Vehicle;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Vehicle {
        Vehicle {
            external_id: self.external_id,
            description: self.description,
            reported_by: self.reported_by,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
        }
    }
}
