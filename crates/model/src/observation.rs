use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{vehicle::Vehicle, ExampleData};

/// One reported position/state sample of a vehicle. Append-only; rows are
/// never updated after insert.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub vehicle_id: Id<Vehicle>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: Option<f64>,
    pub heading: Option<f64>,
    pub speed_mps: Option<f64>,
    pub observed_at: DateTime<Utc>,
    pub source: Option<String>,
}

impl HasId for Observation {
    type IdType = i64;
}

impl ExampleData for Observation {
    fn example_data() -> Self {
        Observation {
            vehicle_id: Id::new(1),
            latitude: 37.7749,
            longitude: -122.4194,
            altitude_m: Some(52.0),
            heading: Some(270.0),
            speed_mps: Some(8.5),
            observed_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
            source: Some("cellphone-4412".to_owned()),
        }
    }
}
