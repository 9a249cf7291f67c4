use chrono::{DateTime, Utc};

/// Per-query context handed to metadata and page source calls.
#[derive(Debug, Clone)]
pub struct ConnectorSession {
    pub query_id: String,
    pub user: String,
    pub start_time: DateTime<Utc>,
}

impl ConnectorSession {
    pub fn new(query_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            user: user.into(),
            start_time: Utc::now(),
        }
    }
}
