//! In-memory store for development and testing.
//!
//! A transaction works on a private copy of the tables while holding the
//! store lock, so transactions are serialized and a dropped transaction
//! leaves the shared state untouched.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::error::DatabaseError;
use super::models::*;
use super::store::{DbResult, Store, StoreTx};

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    courses: Vec<Course>,
    campuses: Vec<Campus>,
    sessions: Vec<TrainingSession>,
    users: Vec<User>,
    bookings: Vec<Booking>,
    documents: Vec<Document>,
    drafts: Vec<BookingDraft>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn usage<F>(&self, references: F) -> ReferenceUsage
    where
        F: Fn(&TrainingSession) -> bool,
    {
        let session_ids: Vec<i64> = self
            .sessions
            .iter()
            .filter(|s| references(s))
            .map(|s| s.id)
            .collect();
        let bookings = self
            .bookings
            .iter()
            .filter(|b| session_ids.contains(&b.session_id))
            .count();
        ReferenceUsage {
            sessions: session_ids.len() as i64,
            bookings: bookings as i64,
        }
    }

    fn details(&self, booking: &Booking) -> Option<BookingDetails> {
        let user = self.users.iter().find(|u| u.id == booking.user_id)?;
        let session = self.sessions.iter().find(|s| s.id == booking.session_id)?;
        let course = self.courses.iter().find(|c| c.id == session.course_id)?;
        let campus = self.campuses.iter().find(|c| c.id == session.campus_id)?;
        Some(BookingDetails {
            booking: booking.clone(),
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            course_name: course.name.clone(),
            campus_name: campus.name.clone(),
            session_date: session.session_date,
            start_time: session.start_time,
            end_time: session.end_time,
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    session_insert_budget: Arc<Option<AtomicUsize>>,
    seats_taken_elsewhere: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects every session insert after the first `limit`,
    /// counted over the lifetime of the store.
    pub fn failing_session_inserts_after(limit: usize) -> Self {
        Self {
            tables: Arc::default(),
            session_insert_budget: Arc::new(Some(AtomicUsize::new(limit))),
            seats_taken_elsewhere: false,
        }
    }

    /// Store whose conditional seat increment always finds the session full,
    /// as when a concurrent transaction took the last seat after the read.
    pub fn losing_seat_races() -> Self {
        Self {
            seats_taken_elsewhere: true,
            ..Self::default()
        }
    }

    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }

    pub async fn booking_count(&self) -> usize {
        self.tables.lock().await.bookings.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            session_insert_budget: self.session_insert_budget.clone(),
            seats_taken_elsewhere: self.seats_taken_elsewhere,
        }))
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    session_insert_budget: Arc<Option<AtomicUsize>>,
    seats_taken_elsewhere: bool,
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn check_session_row(session: &NewTrainingSession) -> DbResult<()> {
    if session.start_time >= session.end_time {
        return Err(DatabaseError::Constraint(
            "training_sessions_time_window".into(),
        ));
    }
    if session.max_participants <= 0 {
        return Err(DatabaseError::Constraint(
            "training_sessions_max_participants_check".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn list_courses(&mut self, active_only: bool) -> DbResult<Vec<Course>> {
        let mut courses: Vec<Course> = self
            .working
            .courses
            .iter()
            .filter(|c| !active_only || c.active)
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(courses)
    }

    async fn course(&mut self, id: i64) -> DbResult<Option<Course>> {
        Ok(self.working.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_course(&mut self, input: &CourseInput) -> DbResult<Course> {
        let course = Course {
            id: self.working.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
            duration_hours: input.duration_hours,
            price: input.price,
            max_capacity: input.max_capacity,
            active: input.active,
            created_at: now(),
            updated_at: now(),
        };
        self.working.courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(&mut self, id: i64, input: &CourseInput) -> DbResult<Option<Course>> {
        let Some(course) = self.working.courses.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        course.name = input.name.clone();
        course.description = input.description.clone();
        course.duration_hours = input.duration_hours;
        course.price = input.price;
        course.max_capacity = input.max_capacity;
        course.active = input.active;
        course.updated_at = now();
        Ok(Some(course.clone()))
    }

    async fn set_course_active(&mut self, id: i64, active: bool) -> DbResult<bool> {
        match self.working.courses.iter_mut().find(|c| c.id == id) {
            Some(course) => {
                course.active = active;
                course.updated_at = now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_course(&mut self, id: i64) -> DbResult<bool> {
        if self.working.sessions.iter().any(|s| s.course_id == id) {
            return Err(DatabaseError::Constraint(
                "training_sessions_course_id_fkey".into(),
            ));
        }
        let before = self.working.courses.len();
        self.working.courses.retain(|c| c.id != id);
        self.working.drafts.retain(|d| d.course_id != Some(id));
        Ok(self.working.courses.len() < before)
    }

    async fn course_usage(&mut self, id: i64) -> DbResult<ReferenceUsage> {
        Ok(self.working.usage(|s| s.course_id == id))
    }

    async fn list_campuses(&mut self, active_only: bool) -> DbResult<Vec<Campus>> {
        let mut campuses: Vec<Campus> = self
            .working
            .campuses
            .iter()
            .filter(|c| !active_only || c.active)
            .cloned()
            .collect();
        campuses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(campuses)
    }

    async fn campus(&mut self, id: i64) -> DbResult<Option<Campus>> {
        Ok(self.working.campuses.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_campus(&mut self, input: &CampusInput) -> DbResult<Campus> {
        let campus = Campus {
            id: self.working.next_id(),
            name: input.name.clone(),
            address: input.address.clone(),
            city: input.city.clone(),
            region: input.region.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            active: input.active,
            created_at: now(),
            updated_at: now(),
        };
        self.working.campuses.push(campus.clone());
        Ok(campus)
    }

    async fn update_campus(&mut self, id: i64, input: &CampusInput) -> DbResult<Option<Campus>> {
        let Some(campus) = self.working.campuses.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        campus.name = input.name.clone();
        campus.address = input.address.clone();
        campus.city = input.city.clone();
        campus.region = input.region.clone();
        campus.phone = input.phone.clone();
        campus.email = input.email.clone();
        campus.active = input.active;
        campus.updated_at = now();
        Ok(Some(campus.clone()))
    }

    async fn set_campus_active(&mut self, id: i64, active: bool) -> DbResult<bool> {
        match self.working.campuses.iter_mut().find(|c| c.id == id) {
            Some(campus) => {
                campus.active = active;
                campus.updated_at = now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_campus(&mut self, id: i64) -> DbResult<bool> {
        if self.working.sessions.iter().any(|s| s.campus_id == id) {
            return Err(DatabaseError::Constraint(
                "training_sessions_campus_id_fkey".into(),
            ));
        }
        let before = self.working.campuses.len();
        self.working.campuses.retain(|c| c.id != id);
        self.working.drafts.retain(|d| d.campus_id != Some(id));
        Ok(self.working.campuses.len() < before)
    }

    async fn campus_usage(&mut self, id: i64) -> DbResult<ReferenceUsage> {
        Ok(self.working.usage(|s| s.campus_id == id))
    }

    async fn list_sessions(
        &mut self,
        filter: &SessionFilter,
        today: NaiveDate,
    ) -> DbResult<Vec<SessionListing>> {
        let tables = &self.working;
        let mut listings: Vec<SessionListing> = tables
            .sessions
            .iter()
            .filter(|s| filter.course_id.map_or(true, |id| s.course_id == id))
            .filter(|s| filter.campus_id.map_or(true, |id| s.campus_id == id))
            .filter(|s| filter.from_date.map_or(true, |d| s.session_date >= d))
            .filter(|s| {
                !filter.bookable_only
                    || (s.status.is_bookable()
                        && s.session_date >= today
                        && s.current_participants < s.max_participants)
            })
            .filter_map(|s| {
                let course = tables.courses.iter().find(|c| c.id == s.course_id)?;
                let campus = tables.campuses.iter().find(|c| c.id == s.campus_id)?;
                Some(SessionListing {
                    session: s.clone(),
                    course_name: course.name.clone(),
                    campus_name: campus.name.clone(),
                })
            })
            .collect();
        listings.sort_by_key(|l| (l.session.session_date, l.session.start_time, l.session.id));
        Ok(listings)
    }

    async fn session(&mut self, id: i64) -> DbResult<Option<TrainingSession>> {
        Ok(self.working.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_session(&mut self, session: &NewTrainingSession) -> DbResult<TrainingSession> {
        if let Some(budget) = self.session_insert_budget.as_ref() {
            let exhausted = budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_err();
            if exhausted {
                return Err(DatabaseError::TransactionError(
                    "session insert rejected by store".into(),
                ));
            }
        }
        check_session_row(session)?;
        let inserted = TrainingSession {
            id: self.working.next_id(),
            course_id: session.course_id,
            campus_id: session.campus_id,
            session_date: session.session_date,
            start_time: session.start_time,
            end_time: session.end_time,
            instructor_name: session.instructor_name.clone(),
            max_participants: session.max_participants,
            current_participants: 0,
            status: session.status,
            created_at: now(),
            updated_at: now(),
        };
        self.working.sessions.push(inserted.clone());
        Ok(inserted)
    }

    async fn update_session(
        &mut self,
        id: i64,
        session: &NewTrainingSession,
    ) -> DbResult<Option<TrainingSession>> {
        check_session_row(session)?;
        let Some(existing) = self.working.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if existing.current_participants > session.max_participants {
            return Err(DatabaseError::Constraint("training_sessions_capacity".into()));
        }
        existing.course_id = session.course_id;
        existing.campus_id = session.campus_id;
        existing.session_date = session.session_date;
        existing.start_time = session.start_time;
        existing.end_time = session.end_time;
        existing.instructor_name = session.instructor_name.clone();
        existing.max_participants = session.max_participants;
        existing.status = session.status;
        existing.updated_at = now();
        Ok(Some(existing.clone()))
    }

    async fn delete_session(&mut self, id: i64) -> DbResult<bool> {
        if self.working.bookings.iter().any(|b| b.session_id == id) {
            return Err(DatabaseError::Constraint(
                "bookings_session_id_fkey".into(),
            ));
        }
        let before = self.working.sessions.len();
        self.working.sessions.retain(|s| s.id != id);
        self.working.drafts.retain(|d| d.session_id != Some(id));
        Ok(self.working.sessions.len() < before)
    }

    async fn session_booking_count(&mut self, id: i64) -> DbResult<i64> {
        Ok(self
            .working
            .bookings
            .iter()
            .filter(|b| b.session_id == id)
            .count() as i64)
    }

    async fn increment_participants(&mut self, id: i64) -> DbResult<bool> {
        if self.seats_taken_elsewhere {
            return Ok(false);
        }
        match self
            .working
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.current_participants < s.max_participants)
        {
            Some(session) => {
                session.current_participants += 1;
                session.updated_at = now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn decrement_participants(&mut self, id: i64) -> DbResult<bool> {
        match self
            .working
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.current_participants > 0)
        {
            Some(session) => {
                session.current_participants -= 1;
                session.updated_at = now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn user(&mut self, id: i64) -> DbResult<Option<User>> {
        Ok(self.working.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&mut self, email: &str) -> DbResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self.working.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&mut self, user: &NewUser) -> DbResult<User> {
        let email = user.email.to_lowercase();
        if self.working.users.iter().any(|u| u.email == email) {
            return Err(DatabaseError::Duplicate("users_email_key".into()));
        }
        let inserted = User {
            id: self.working.next_id(),
            email,
            password_hash: user.password_hash.clone(),
            role: user.role,
            name: user.name.clone(),
            phone: user.phone.clone(),
            region: user.region.clone(),
            status: user.status,
            created_at: now(),
            updated_at: now(),
        };
        self.working.users.push(inserted.clone());
        Ok(inserted)
    }

    async fn list_students(&mut self) -> DbResult<Vec<StudentSummary>> {
        let tables = &self.working;
        let mut students: Vec<StudentSummary> = tables
            .users
            .iter()
            .filter(|u| u.role == UserRole::Trainee)
            .map(|u| StudentSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                phone: u.phone.clone(),
                region: u.region.clone(),
                status: u.status,
                booking_count: tables.bookings.iter().filter(|b| b.user_id == u.id).count()
                    as i64,
            })
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(students)
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> DbResult<Booking> {
        if self
            .working
            .bookings
            .iter()
            .any(|b| b.confirmation_code == booking.confirmation_code)
        {
            return Err(DatabaseError::Duplicate(
                "bookings_confirmation_code_key".into(),
            ));
        }
        if !self.working.sessions.iter().any(|s| s.id == booking.session_id) {
            return Err(DatabaseError::Constraint("bookings_session_id_fkey".into()));
        }
        let inserted = Booking {
            id: self.working.next_id(),
            user_id: booking.user_id,
            session_id: booking.session_id,
            status: booking.status,
            payment_status: booking.payment_status,
            confirmation_code: booking.confirmation_code.clone(),
            notes: booking.notes.clone(),
            created_at: now(),
            updated_at: now(),
        };
        self.working.bookings.push(inserted.clone());
        Ok(inserted)
    }

    async fn booking(&mut self, id: i64) -> DbResult<Option<Booking>> {
        Ok(self.working.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn booking_by_code(&mut self, code: &str) -> DbResult<Option<BookingDetails>> {
        Ok(self
            .working
            .bookings
            .iter()
            .find(|b| b.confirmation_code == code)
            .and_then(|b| self.working.details(b)))
    }

    async fn bookings_for_user(&mut self, user_id: i64) -> DbResult<Vec<BookingDetails>> {
        let mut details: Vec<BookingDetails> = self
            .working
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter_map(|b| self.working.details(b))
            .collect();
        details.sort_by(|a, b| {
            b.session_date
                .cmp(&a.session_date)
                .then(a.start_time.cmp(&b.start_time))
        });
        Ok(details)
    }

    async fn bookings_for_session(&mut self, session_id: i64) -> DbResult<Vec<BookingDetails>> {
        let mut details: Vec<BookingDetails> = self
            .working
            .bookings
            .iter()
            .filter(|b| b.session_id == session_id)
            .filter_map(|b| self.working.details(b))
            .collect();
        details.sort_by(|a, b| {
            a.user_name
                .cmp(&b.user_name)
                .then(a.booking.id.cmp(&b.booking.id))
        });
        Ok(details)
    }

    async fn update_booking_status(
        &mut self,
        id: i64,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> DbResult<Option<Booking>> {
        let Some(booking) = self.working.bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        booking.status = status;
        booking.payment_status = payment_status;
        booking.updated_at = now();
        Ok(Some(booking.clone()))
    }

    async fn delete_booking(&mut self, id: i64) -> DbResult<bool> {
        let before = self.working.bookings.len();
        self.working.bookings.retain(|b| b.id != id);
        Ok(self.working.bookings.len() < before)
    }

    async fn insert_document(&mut self, document: &NewDocument) -> DbResult<Document> {
        if !self.working.users.iter().any(|u| u.id == document.user_id) {
            return Err(DatabaseError::Constraint("documents_user_id_fkey".into()));
        }
        let inserted = Document {
            id: self.working.next_id(),
            user_id: document.user_id,
            doc_type: document.doc_type,
            original_filename: document.original_filename.clone(),
            storage_path: document.storage_path.clone(),
            size_bytes: document.size_bytes,
            mime_type: document.mime_type.clone(),
            uploaded_at: now(),
        };
        self.working.documents.push(inserted.clone());
        Ok(inserted)
    }

    async fn document(&mut self, id: i64) -> DbResult<Option<Document>> {
        Ok(self.working.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list_documents(&mut self, user_id: Option<i64>) -> DbResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .working
            .documents
            .iter()
            .filter(|d| user_id.map_or(true, |id| d.user_id == id))
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        Ok(documents)
    }

    async fn delete_document(&mut self, id: i64) -> DbResult<bool> {
        let before = self.working.documents.len();
        self.working.documents.retain(|d| d.id != id);
        Ok(self.working.documents.len() < before)
    }

    async fn insert_draft(&mut self, draft: &BookingDraft) -> DbResult<()> {
        if self.working.drafts.iter().any(|d| d.token == draft.token) {
            return Err(DatabaseError::Duplicate("booking_drafts_pkey".into()));
        }
        self.working.drafts.push(draft.clone());
        Ok(())
    }

    async fn draft(&mut self, token: Uuid, now: DateTime<Utc>) -> DbResult<Option<BookingDraft>> {
        Ok(self
            .working
            .drafts
            .iter()
            .find(|d| d.token == token && !d.is_expired(now))
            .cloned())
    }

    async fn update_draft(&mut self, draft: &BookingDraft) -> DbResult<()> {
        let existing = self
            .working
            .drafts
            .iter_mut()
            .find(|d| d.token == draft.token)
            .ok_or(DatabaseError::NotFound)?;
        existing.course_id = draft.course_id;
        existing.campus_id = draft.campus_id;
        existing.session_id = draft.session_id;
        Ok(())
    }

    async fn delete_draft(&mut self, token: Uuid) -> DbResult<()> {
        self.working.drafts.retain(|d| d.token != token);
        Ok(())
    }

    async fn purge_expired_drafts(&mut self, now: DateTime<Utc>) -> DbResult<u64> {
        let before = self.working.drafts.len();
        self.working.drafts.retain(|d| !d.is_expired(now));
        Ok((before - self.working.drafts.len()) as u64)
    }

    async fn dashboard_counts(&mut self, today: NaiveDate) -> DbResult<DashboardCounts> {
        let tables = &self.working;
        Ok(DashboardCounts {
            active_courses: tables.courses.iter().filter(|c| c.active).count() as i64,
            active_campuses: tables.campuses.iter().filter(|c| c.active).count() as i64,
            upcoming_sessions: tables
                .sessions
                .iter()
                .filter(|s| s.session_date >= today && s.status.is_bookable())
                .count() as i64,
            confirmed_bookings: tables
                .bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Confirmed)
                .count() as i64,
            trainees: tables
                .users
                .iter()
                .filter(|u| u.role == UserRole::Trainee)
                .count() as i64,
        })
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
