//! Session state that outlives a process: when the list was last fetched
//! and which category the user had selected.

use crate::storage::{StorageBackend, SESSION_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub last_fetched: Option<DateTime<Utc>>,
    #[serde(default)]
    pub selected_category: Option<String>,
}

impl SessionState {
    /// Missing or malformed state reads as the default.
    pub fn load(storage: &dyn StorageBackend) -> Self {
        match storage.get(SESSION_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "discarding malformed session state");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read session state");
                Self::default()
            }
        }
    }

    /// Best effort. Durability is lost on failure, nothing else.
    pub fn save(&self, storage: &dyn StorageBackend) {
        let result = serde_json::to_string(self)
            .map_err(crate::error::MealError::from)
            .and_then(|payload| storage.set(SESSION_KEY, &payload));
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not persist session state");
        }
    }
}
