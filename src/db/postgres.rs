//! PostgreSQL-backed store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::error::DatabaseError;
use super::models::*;
use super::store::{DbResult, Store, StoreTx};

const BOOKING_DETAILS_SELECT: &str = r#"
    SELECT b.*, u.name AS user_name, u.email AS user_email,
           c.name AS course_name, p.name AS campus_name,
           s.session_date, s.start_time, s.end_time
    FROM bookings b
    JOIN users u ON u.id = b.user_id
    JOIN training_sessions s ON s.id = b.session_id
    JOIN courses c ON c.id = s.course_id
    JOIN campuses p ON p.id = s.campus_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn list_courses(&mut self, active_only: bool) -> DbResult<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE (NOT $1 OR active) ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(courses)
    }

    async fn course(&mut self, id: i64) -> DbResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(course)
    }

    async fn insert_course(&mut self, input: &CourseInput) -> DbResult<Course> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (name, description, duration_hours, price, max_capacity, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.duration_hours)
        .bind(input.price)
        .bind(input.max_capacity)
        .bind(input.active)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(course)
    }

    async fn update_course(&mut self, id: i64, input: &CourseInput) -> DbResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET name = $1, description = $2, duration_hours = $3, price = $4,
                max_capacity = $5, active = $6, updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.duration_hours)
        .bind(input.price)
        .bind(input.max_capacity)
        .bind(input.active)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(course)
    }

    async fn set_course_active(&mut self, id: i64, active: bool) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE courses SET active = $1, updated_at = NOW() WHERE id = $2")
                .bind(active)
                .bind(id)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_course(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn course_usage(&mut self, id: i64) -> DbResult<ReferenceUsage> {
        let usage = sqlx::query_as::<_, ReferenceUsage>(
            r#"
            SELECT COUNT(DISTINCT s.id) AS sessions, COUNT(b.id) AS bookings
            FROM training_sessions s
            LEFT JOIN bookings b ON b.session_id = s.id
            WHERE s.course_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(usage)
    }

    async fn list_campuses(&mut self, active_only: bool) -> DbResult<Vec<Campus>> {
        let campuses = sqlx::query_as::<_, Campus>(
            "SELECT * FROM campuses WHERE (NOT $1 OR active) ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(campuses)
    }

    async fn campus(&mut self, id: i64) -> DbResult<Option<Campus>> {
        let campus = sqlx::query_as::<_, Campus>("SELECT * FROM campuses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(campus)
    }

    async fn insert_campus(&mut self, input: &CampusInput) -> DbResult<Campus> {
        let campus = sqlx::query_as::<_, Campus>(
            r#"
            INSERT INTO campuses (name, address, city, region, phone, email, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.region)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(input.active)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(campus)
    }

    async fn update_campus(&mut self, id: i64, input: &CampusInput) -> DbResult<Option<Campus>> {
        let campus = sqlx::query_as::<_, Campus>(
            r#"
            UPDATE campuses
            SET name = $1, address = $2, city = $3, region = $4, phone = $5,
                email = $6, active = $7, updated_at = NOW()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.region)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(input.active)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(campus)
    }

    async fn set_campus_active(&mut self, id: i64, active: bool) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE campuses SET active = $1, updated_at = NOW() WHERE id = $2")
                .bind(active)
                .bind(id)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_campus(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM campuses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn campus_usage(&mut self, id: i64) -> DbResult<ReferenceUsage> {
        let usage = sqlx::query_as::<_, ReferenceUsage>(
            r#"
            SELECT COUNT(DISTINCT s.id) AS sessions, COUNT(b.id) AS bookings
            FROM training_sessions s
            LEFT JOIN bookings b ON b.session_id = s.id
            WHERE s.campus_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(usage)
    }

    async fn list_sessions(
        &mut self,
        filter: &SessionFilter,
        today: NaiveDate,
    ) -> DbResult<Vec<SessionListing>> {
        let sessions = sqlx::query_as::<_, SessionListing>(
            r#"
            SELECT s.*, c.name AS course_name, p.name AS campus_name
            FROM training_sessions s
            JOIN courses c ON c.id = s.course_id
            JOIN campuses p ON p.id = s.campus_id
            WHERE ($1::BIGINT IS NULL OR s.course_id = $1)
              AND ($2::BIGINT IS NULL OR s.campus_id = $2)
              AND ($3::DATE IS NULL OR s.session_date >= $3)
              AND (NOT $4 OR (
                    s.status IN ('scheduled', 'active')
                    AND s.session_date >= $5
                    AND s.current_participants < s.max_participants
              ))
            ORDER BY s.session_date, s.start_time, s.id
            "#,
        )
        .bind(filter.course_id)
        .bind(filter.campus_id)
        .bind(filter.from_date)
        .bind(filter.bookable_only)
        .bind(today)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(sessions)
    }

    async fn session(&mut self, id: i64) -> DbResult<Option<TrainingSession>> {
        let session =
            sqlx::query_as::<_, TrainingSession>("SELECT * FROM training_sessions WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(session)
    }

    async fn insert_session(&mut self, session: &NewTrainingSession) -> DbResult<TrainingSession> {
        let inserted = sqlx::query_as::<_, TrainingSession>(
            r#"
            INSERT INTO training_sessions
                (course_id, campus_id, session_date, start_time, end_time,
                 instructor_name, max_participants, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(session.course_id)
        .bind(session.campus_id)
        .bind(session.session_date)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(&session.instructor_name)
        .bind(session.max_participants)
        .bind(session.status)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(inserted)
    }

    async fn update_session(
        &mut self,
        id: i64,
        session: &NewTrainingSession,
    ) -> DbResult<Option<TrainingSession>> {
        let updated = sqlx::query_as::<_, TrainingSession>(
            r#"
            UPDATE training_sessions
            SET course_id = $1, campus_id = $2, session_date = $3, start_time = $4,
                end_time = $5, instructor_name = $6, max_participants = $7, status = $8,
                updated_at = NOW()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(session.course_id)
        .bind(session.campus_id)
        .bind(session.session_date)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(&session.instructor_name)
        .bind(session.max_participants)
        .bind(session.status)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(updated)
    }

    async fn delete_session(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM training_sessions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn session_booking_count(&mut self, id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE session_id = $1")
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn increment_participants(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE training_sessions
            SET current_participants = current_participants + 1, updated_at = NOW()
            WHERE id = $1 AND current_participants < max_participants
            "#,
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn decrement_participants(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE training_sessions
            SET current_participants = current_participants - 1, updated_at = NOW()
            WHERE id = $1 AND current_participants > 0
            "#,
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn user(&mut self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn user_by_email(&mut self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn insert_user(&mut self, user: &NewUser) -> DbResult<User> {
        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, role, name, phone, region, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.region)
        .bind(user.status)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(inserted)
    }

    async fn list_students(&mut self) -> DbResult<Vec<StudentSummary>> {
        let students = sqlx::query_as::<_, StudentSummary>(
            r#"
            SELECT u.id, u.name, u.email, u.phone, u.region, u.status,
                   COUNT(b.id) AS booking_count
            FROM users u
            LEFT JOIN bookings b ON b.user_id = u.id
            WHERE u.role = 'trainee'
            GROUP BY u.id
            ORDER BY u.name, u.id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(students)
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> DbResult<Booking> {
        let inserted = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings
                (user_id, session_id, status, payment_status, confirmation_code, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(booking.user_id)
        .bind(booking.session_id)
        .bind(booking.status)
        .bind(booking.payment_status)
        .bind(&booking.confirmation_code)
        .bind(&booking.notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(inserted)
    }

    async fn booking(&mut self, id: i64) -> DbResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(booking)
    }

    async fn booking_by_code(&mut self, code: &str) -> DbResult<Option<BookingDetails>> {
        let sql = format!("{} WHERE b.confirmation_code = $1", BOOKING_DETAILS_SELECT);
        let details = sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(details)
    }

    async fn bookings_for_user(&mut self, user_id: i64) -> DbResult<Vec<BookingDetails>> {
        let sql = format!(
            "{} WHERE b.user_id = $1 ORDER BY s.session_date DESC, s.start_time",
            BOOKING_DETAILS_SELECT
        );
        let details = sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(details)
    }

    async fn bookings_for_session(&mut self, session_id: i64) -> DbResult<Vec<BookingDetails>> {
        let sql = format!(
            "{} WHERE b.session_id = $1 ORDER BY u.name, b.id",
            BOOKING_DETAILS_SELECT
        );
        let details = sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(session_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(details)
    }

    async fn update_booking_status(
        &mut self,
        id: i64,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> DbResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $1, payment_status = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(payment_status)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(booking)
    }

    async fn delete_booking(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_document(&mut self, document: &NewDocument) -> DbResult<Document> {
        let inserted = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents
                (user_id, doc_type, original_filename, storage_path, size_bytes, mime_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(document.user_id)
        .bind(document.doc_type)
        .bind(&document.original_filename)
        .bind(&document.storage_path)
        .bind(document.size_bytes)
        .bind(&document.mime_type)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(inserted)
    }

    async fn document(&mut self, id: i64) -> DbResult<Option<Document>> {
        let document = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(document)
    }

    async fn list_documents(&mut self, user_id: Option<i64>) -> DbResult<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(documents)
    }

    async fn delete_document(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_draft(&mut self, draft: &BookingDraft) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_drafts
                (token, course_id, campus_id, session_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(draft.token)
        .bind(draft.course_id)
        .bind(draft.campus_id)
        .bind(draft.session_id)
        .bind(draft.created_at)
        .bind(draft.expires_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn draft(&mut self, token: Uuid, now: DateTime<Utc>) -> DbResult<Option<BookingDraft>> {
        let draft = sqlx::query_as::<_, BookingDraft>(
            "SELECT * FROM booking_drafts WHERE token = $1 AND expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(draft)
    }

    async fn update_draft(&mut self, draft: &BookingDraft) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE booking_drafts
            SET course_id = $1, campus_id = $2, session_id = $3
            WHERE token = $4
            "#,
        )
        .bind(draft.course_id)
        .bind(draft.campus_id)
        .bind(draft.session_id)
        .bind(draft.token)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn delete_draft(&mut self, token: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM booking_drafts WHERE token = $1")
            .bind(token)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn purge_expired_drafts(&mut self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM booking_drafts WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn dashboard_counts(&mut self, today: NaiveDate) -> DbResult<DashboardCounts> {
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM courses WHERE active) AS active_courses,
                (SELECT COUNT(*) FROM campuses WHERE active) AS active_campuses,
                (SELECT COUNT(*) FROM training_sessions
                    WHERE session_date >= $1 AND status IN ('scheduled', 'active'))
                    AS upcoming_sessions,
                (SELECT COUNT(*) FROM bookings WHERE status = 'confirmed') AS confirmed_bookings,
                (SELECT COUNT(*) FROM users WHERE role = 'trainee') AS trainees
            "#,
        )
        .bind(today)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(counts)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let PgTx { tx } = *self;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionError(e.to_string()))
    }
}
