mod booking;
mod booking_draft;
mod campus;
mod course;
mod document;
mod training_session;
mod user;

pub use booking::*;
pub use booking_draft::*;
pub use campus::*;
pub use course::*;
pub use document::*;
pub use training_session::*;
pub use user::*;

use serde::Serialize;

/// How many sessions, and bookings on those sessions, point at a course or campus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct ReferenceUsage {
    pub sessions: i64,
    pub bookings: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct DashboardCounts {
    pub active_courses: i64,
    pub active_campuses: i64,
    pub upcoming_sessions: i64,
    pub confirmed_bookings: i64,
    pub trainees: i64,
}

/// HTML forms post empty strings for untouched optional fields.
pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CourseInput {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = blank_to_none(self.description);
        self
    }
}

impl CampusInput {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.address = blank_to_none(self.address);
        self.city = blank_to_none(self.city);
        self.region = blank_to_none(self.region);
        self.phone = blank_to_none(self.phone);
        self.email = blank_to_none(self.email).map(|e| e.to_lowercase());
        self
    }
}
