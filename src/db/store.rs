//! Storage seam between the services and the relational backend.
//!
//! Every service operation runs against a [`StoreTx`] obtained from
//! [`Store::begin`]. Nothing is visible to other callers until
//! [`StoreTx::commit`] succeeds; dropping a transaction rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::error::DatabaseError;
use super::models::*;

pub type DbResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> DbResult<()>;
}

#[async_trait]
pub trait StoreTx: Send {
    // Courses
    async fn list_courses(&mut self, active_only: bool) -> DbResult<Vec<Course>>;
    async fn course(&mut self, id: i64) -> DbResult<Option<Course>>;
    async fn insert_course(&mut self, input: &CourseInput) -> DbResult<Course>;
    async fn update_course(&mut self, id: i64, input: &CourseInput) -> DbResult<Option<Course>>;
    async fn set_course_active(&mut self, id: i64, active: bool) -> DbResult<bool>;
    async fn delete_course(&mut self, id: i64) -> DbResult<bool>;
    async fn course_usage(&mut self, id: i64) -> DbResult<ReferenceUsage>;

    // Campuses
    async fn list_campuses(&mut self, active_only: bool) -> DbResult<Vec<Campus>>;
    async fn campus(&mut self, id: i64) -> DbResult<Option<Campus>>;
    async fn insert_campus(&mut self, input: &CampusInput) -> DbResult<Campus>;
    async fn update_campus(&mut self, id: i64, input: &CampusInput) -> DbResult<Option<Campus>>;
    async fn set_campus_active(&mut self, id: i64, active: bool) -> DbResult<bool>;
    async fn delete_campus(&mut self, id: i64) -> DbResult<bool>;
    async fn campus_usage(&mut self, id: i64) -> DbResult<ReferenceUsage>;

    // Training sessions
    async fn list_sessions(
        &mut self,
        filter: &SessionFilter,
        today: NaiveDate,
    ) -> DbResult<Vec<SessionListing>>;
    async fn session(&mut self, id: i64) -> DbResult<Option<TrainingSession>>;
    async fn insert_session(&mut self, session: &NewTrainingSession) -> DbResult<TrainingSession>;
    async fn update_session(
        &mut self,
        id: i64,
        session: &NewTrainingSession,
    ) -> DbResult<Option<TrainingSession>>;
    async fn delete_session(&mut self, id: i64) -> DbResult<bool>;
    async fn session_booking_count(&mut self, id: i64) -> DbResult<i64>;
    /// Adds one participant only while the session is below capacity.
    /// Returns `false` when no row was updated.
    async fn increment_participants(&mut self, id: i64) -> DbResult<bool>;
    /// Removes one participant, never going below zero.
    async fn decrement_participants(&mut self, id: i64) -> DbResult<bool>;

    // Users
    async fn user(&mut self, id: i64) -> DbResult<Option<User>>;
    async fn user_by_email(&mut self, email: &str) -> DbResult<Option<User>>;
    async fn insert_user(&mut self, user: &NewUser) -> DbResult<User>;
    async fn list_students(&mut self) -> DbResult<Vec<StudentSummary>>;

    // Bookings
    async fn insert_booking(&mut self, booking: &NewBooking) -> DbResult<Booking>;
    async fn booking(&mut self, id: i64) -> DbResult<Option<Booking>>;
    async fn booking_by_code(&mut self, code: &str) -> DbResult<Option<BookingDetails>>;
    async fn bookings_for_user(&mut self, user_id: i64) -> DbResult<Vec<BookingDetails>>;
    async fn bookings_for_session(&mut self, session_id: i64) -> DbResult<Vec<BookingDetails>>;
    async fn update_booking_status(
        &mut self,
        id: i64,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> DbResult<Option<Booking>>;
    async fn delete_booking(&mut self, id: i64) -> DbResult<bool>;

    // Documents
    async fn insert_document(&mut self, document: &NewDocument) -> DbResult<Document>;
    async fn document(&mut self, id: i64) -> DbResult<Option<Document>>;
    async fn list_documents(&mut self, user_id: Option<i64>) -> DbResult<Vec<Document>>;
    async fn delete_document(&mut self, id: i64) -> DbResult<bool>;

    // Booking drafts
    async fn insert_draft(&mut self, draft: &BookingDraft) -> DbResult<()>;
    /// Returns the draft only if it has not expired at `now`.
    async fn draft(&mut self, token: Uuid, now: DateTime<Utc>) -> DbResult<Option<BookingDraft>>;
    async fn update_draft(&mut self, draft: &BookingDraft) -> DbResult<()>;
    async fn delete_draft(&mut self, token: Uuid) -> DbResult<()>;
    async fn purge_expired_drafts(&mut self, now: DateTime<Utc>) -> DbResult<u64>;

    async fn dashboard_counts(&mut self, today: NaiveDate) -> DbResult<DashboardCounts>;

    async fn commit(self: Box<Self>) -> DbResult<()>;
}
