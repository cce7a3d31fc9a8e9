use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single activity boundary. Everything after `stamp` up to the next event belongs to `id`.
///
/// Field names are capitalized on disk, other tooling reads the state file as is.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    #[serde(rename = "Id")]
    pub id: Arc<str>,
    #[serde(rename = "Stamp")]
    pub stamp: DateTime<Utc>,
}

impl Event {
    pub fn new(id: impl Into<Arc<str>>, stamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            stamp,
        }
    }
}
