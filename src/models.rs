use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Paste {
    pub id: i64,
    pub token: String,
    pub owner_id: Option<i64>,
    pub public: bool,
    pub document: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Paste {
    /// Whether `account_id` (None for anonymous) may read this paste.
    pub fn readable_by(&self, account_id: Option<i64>) -> bool {
        self.public || self.owned_by(account_id)
    }

    /// Whether `account_id` (None for anonymous) may modify or delete this paste.
    pub fn owned_by(&self, account_id: Option<i64>) -> bool {
        match (self.owner_id, account_id) {
            (Some(owner), Some(requester)) => owner == requester,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub account_id: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
