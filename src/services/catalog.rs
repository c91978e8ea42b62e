//! Admin management of courses, campuses and sessions, plus the dashboard
//! and the public catalog reads.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::db::{
    BookingDetails, Campus, CampusInput, Course, CourseInput, DashboardCounts, ReferenceUsage,
    SessionFilter, SessionListing, Store, TrainingSession,
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Kept for booking history and hidden from the catalog.
    Deactivated,
}

fn deletion_plan(entity: &str, usage: ReferenceUsage) -> AppResult<DeleteOutcome> {
    if usage.sessions == 0 {
        Ok(DeleteOutcome::Deleted)
    } else if usage.bookings > 0 {
        Ok(DeleteOutcome::Deactivated)
    } else {
        Err(AppError::Validation(format!(
            "{} is still used by {} session(s); remove them first",
            entity, usage.sessions
        )))
    }
}

fn validated_course(input: CourseInput) -> AppResult<CourseInput> {
    let input = input.normalized();
    input.validate()?;
    if input.price < Decimal::ZERO {
        return Err(AppError::Validation("price must not be negative".into()));
    }
    Ok(input)
}

fn validated_campus(input: CampusInput) -> AppResult<CampusInput> {
    let input = input.normalized();
    input.validate()?;
    Ok(input)
}

// Courses

pub async fn list_courses(store: &dyn Store, active_only: bool) -> AppResult<Vec<Course>> {
    let mut tx = store.begin().await?;
    Ok(tx.list_courses(active_only).await?)
}

pub async fn get_course(store: &dyn Store, id: i64) -> AppResult<Course> {
    let mut tx = store.begin().await?;
    tx.course(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("course {}", id)))
}

pub async fn create_course(store: &dyn Store, input: CourseInput) -> AppResult<Course> {
    let input = validated_course(input)?;
    let mut tx = store.begin().await?;
    let course = tx.insert_course(&input).await?;
    tx.commit().await?;
    info!(course_id = course.id, "Course created");
    Ok(course)
}

pub async fn update_course(store: &dyn Store, id: i64, input: CourseInput) -> AppResult<Course> {
    let input = validated_course(input)?;
    let mut tx = store.begin().await?;
    let course = tx
        .update_course(id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("course {}", id)))?;
    tx.commit().await?;
    info!(course_id = id, "Course updated");
    Ok(course)
}

pub async fn delete_course(store: &dyn Store, id: i64) -> AppResult<DeleteOutcome> {
    let mut tx = store.begin().await?;
    if tx.course(id).await?.is_none() {
        return Err(AppError::NotFound(format!("course {}", id)));
    }

    let outcome = deletion_plan("course", tx.course_usage(id).await?)?;
    match outcome {
        DeleteOutcome::Deleted => {
            tx.delete_course(id).await?;
        }
        DeleteOutcome::Deactivated => {
            tx.set_course_active(id, false).await?;
        }
    }
    tx.commit().await?;

    info!(course_id = id, ?outcome, "Course removed from catalog");
    Ok(outcome)
}

// Campuses

pub async fn list_campuses(store: &dyn Store, active_only: bool) -> AppResult<Vec<Campus>> {
    let mut tx = store.begin().await?;
    Ok(tx.list_campuses(active_only).await?)
}

pub async fn get_campus(store: &dyn Store, id: i64) -> AppResult<Campus> {
    let mut tx = store.begin().await?;
    tx.campus(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campus {}", id)))
}

pub async fn create_campus(store: &dyn Store, input: CampusInput) -> AppResult<Campus> {
    let input = validated_campus(input)?;
    let mut tx = store.begin().await?;
    let campus = tx.insert_campus(&input).await?;
    tx.commit().await?;
    info!(campus_id = campus.id, "Campus created");
    Ok(campus)
}

pub async fn update_campus(store: &dyn Store, id: i64, input: CampusInput) -> AppResult<Campus> {
    let input = validated_campus(input)?;
    let mut tx = store.begin().await?;
    let campus = tx
        .update_campus(id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campus {}", id)))?;
    tx.commit().await?;
    info!(campus_id = id, "Campus updated");
    Ok(campus)
}

pub async fn delete_campus(store: &dyn Store, id: i64) -> AppResult<DeleteOutcome> {
    let mut tx = store.begin().await?;
    if tx.campus(id).await?.is_none() {
        return Err(AppError::NotFound(format!("campus {}", id)));
    }

    let outcome = deletion_plan("campus", tx.campus_usage(id).await?)?;
    match outcome {
        DeleteOutcome::Deleted => {
            tx.delete_campus(id).await?;
        }
        DeleteOutcome::Deactivated => {
            tx.set_campus_active(id, false).await?;
        }
    }
    tx.commit().await?;

    info!(campus_id = id, ?outcome, "Campus removed from catalog");
    Ok(outcome)
}

// Sessions

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session: TrainingSession,
    pub course: Option<Course>,
    pub campus: Option<Campus>,
    pub bookings: Vec<BookingDetails>,
}

pub async fn list_sessions(
    store: &dyn Store,
    filter: &SessionFilter,
    today: NaiveDate,
) -> AppResult<Vec<SessionListing>> {
    let mut tx = store.begin().await?;
    Ok(tx.list_sessions(filter, today).await?)
}

/// Sessions a trainee can still book for the given course and campus.
pub async fn bookable_sessions(
    store: &dyn Store,
    course_id: Option<i64>,
    campus_id: Option<i64>,
    today: NaiveDate,
) -> AppResult<Vec<SessionListing>> {
    let filter = SessionFilter {
        course_id,
        campus_id,
        from_date: None,
        bookable_only: true,
    };
    list_sessions(store, &filter, today).await
}

pub async fn session_detail(store: &dyn Store, id: i64) -> AppResult<SessionDetail> {
    let mut tx = store.begin().await?;
    let session = tx
        .session(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("session {}", id)))?;
    let course = tx.course(session.course_id).await?;
    let campus = tx.campus(session.campus_id).await?;
    let bookings = tx.bookings_for_session(id).await?;
    Ok(SessionDetail {
        session,
        course,
        campus,
        bookings,
    })
}

pub async fn delete_session(store: &dyn Store, id: i64) -> AppResult<()> {
    let mut tx = store.begin().await?;
    let bookings = tx.session_booking_count(id).await?;
    if bookings > 0 {
        return Err(AppError::Validation(format!(
            "session {} has {} booking(s) and cannot be deleted",
            id, bookings
        )));
    }
    if !tx.delete_session(id).await? {
        return Err(AppError::NotFound(format!("session {}", id)));
    }
    tx.commit().await?;
    info!(session_id = id, "Session deleted");
    Ok(())
}

pub async fn dashboard(store: &dyn Store, today: NaiveDate) -> AppResult<DashboardCounts> {
    let mut tx = store.begin().await?;
    Ok(tx.dashboard_counts(today).await?)
}
