use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user offense counter. One row per offending user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub user_id: String,
    pub warn_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WarningRecord {
    /// A fresh record with no offenses yet.
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            warn_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Count one more offense. The count never decreases.
    pub fn increment(&mut self) -> u32 {
        self.warn_count = self.warn_count.saturating_add(1);
        self.updated_at = Utc::now();
        self.warn_count
    }
}
