use serde::{Deserialize, Serialize};

use crate::models::Notification;

// -- Feed --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct FeedEntryResponse {
    #[serde(flatten)]
    pub notification: Notification,
    pub is_new: bool,
    pub icon: String,
    pub summary: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub notifications: Vec<FeedEntryResponse>,
    /// Stored entries that could not be decoded and were left out.
    pub skipped: usize,
}

// -- Counters --

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub total: usize,
    pub new: usize,
    /// The new count as shown on the notifications icon, e.g. "4" or "30+".
    pub badge: String,
}

// -- Watermark --

#[derive(Debug, Serialize, Deserialize)]
pub struct LastReadResponse {
    pub last_read: f64,
}

// -- Events --

#[derive(Debug, Serialize, Deserialize)]
pub struct EventAccepted {
    pub user_id: uuid::Uuid,
    pub time: f64,
}
