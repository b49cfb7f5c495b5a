//! Profile document as stored per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub plan: String,
    pub visits: i64,
    pub last_visit: Option<DateTime<Utc>>,
    /// Analyses performed.
    pub sentiments: i64,
    /// Most recent query first.
    pub recent: Vec<String>,
}

impl Profile {
    /// Placeholder shown for a signed-in user that has no stored document yet.
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: None,
            email: None,
            plan: "free".to_string(),
            visits: 0,
            last_visit: None,
            sentiments: 0,
            recent: Vec::new(),
        }
    }

    pub fn recent_page(&self, show: usize) -> &[String] {
        &self.recent[..show.min(self.recent.len())]
    }
}
