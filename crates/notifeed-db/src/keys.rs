use uuid::Uuid;

/// Store keys owned by one user's feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserKeys {
    pub feed: String,
    pub last_read: String,
    pub pending_last_read: String,
}

impl UserKeys {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            feed: format!("user:{}:notifications", user_id),
            last_read: format!("user:{}:last_read", user_id),
            pending_last_read: format!("user:{}:pending_last_read", user_id),
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.feed, &self.last_read, &self.pending_last_read]
    }
}
