use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::ExampleData;

/// Persistent identity record for one observed aerial object.
///
/// The `external_id` is the reporter-supplied broadcast serial or
/// registration string. When present it is the resolution key: the store
/// keeps at most one vehicle per distinct value. Vehicles reported without
/// one are each their own identity; there is no fusion of anonymous reports.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub reported_by: Option<String>,
    /// Timestamp of the earliest observation. Set once at creation.
    pub first_seen: DateTime<Utc>,
    /// Timestamp of the most recent observation. Never moves backward.
    pub last_seen: DateTime<Utc>,
}

impl HasId for Vehicle {
    type IdType = i64;
}

impl ExampleData for Vehicle {
    fn example_data() -> Self {
        let seen = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
        Vehicle {
            external_id: Some("FAA-3981724".to_owned()),
            description: Some("quadcopter, white".to_owned()),
            reported_by: Some("rooftop-sensor-12".to_owned()),
            first_seen: seen,
            last_seen: seen,
        }
    }
}
