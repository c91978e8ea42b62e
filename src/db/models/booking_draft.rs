use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Server-side state of the public booking wizard between steps.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct BookingDraft {
    pub token: Uuid,
    pub course_id: Option<i64>,
    pub campus_id: Option<i64>,
    pub session_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BookingDraft {
    pub fn new(course_id: i64, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token: Uuid::new_v4(),
            course_id: Some(course_id),
            campus_id: None,
            session_id: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
