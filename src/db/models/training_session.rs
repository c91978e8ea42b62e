use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Whether trainees may still book a seat in a session with this status.
    pub fn is_bookable(&self) -> bool {
        matches!(self, SessionStatus::Scheduled | SessionStatus::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" | "canceled" => Ok(SessionStatus::Cancelled),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: i64,
    pub course_id: i64,
    pub campus_id: i64,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub instructor_name: Option<String>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingSession {
    pub fn available_spots(&self) -> i32 {
        self.max_participants - self.current_participants
    }
}

/// Column values written for a session row, on insert or in-place update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrainingSession {
    pub course_id: i64,
    pub campus_id: i64,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub instructor_name: Option<String>,
    pub max_participants: i32,
    pub status: SessionStatus,
}

/// A session joined with the names of its course and campus, for listings.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SessionListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub session: TrainingSession,
    pub course_name: String,
    pub campus_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilter {
    pub course_id: Option<i64>,
    pub campus_id: Option<i64>,
    pub from_date: Option<NaiveDate>,
    /// Only sessions a trainee could still book.
    #[serde(default)]
    pub bookable_only: bool,
}
