use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    response::Json,
    Form,
};
use chrono::Utc;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::db::{
    BookingStatus, Campus, CampusInput, Course, CourseInput, DashboardCounts, PaymentStatus,
    SessionFilter, SessionListing, StudentSummary,
};
use crate::error::AppResult;
use crate::i18n::I18n;
use crate::i18n_args;
use crate::modules::flash::{form_body, Flash};
use crate::services::catalog::{self, DeleteOutcome, SessionDetail};
use crate::services::schedule::{self, ScheduleForm, ScheduleRequest};
use crate::services::students::{self, StudentDetail};
use crate::services::booking;

pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardCounts>> {
    let counts = catalog::dashboard(state.store(), Utc::now().date_naive()).await?;
    Ok(Json(counts))
}

// Courses

pub async fn list_courses(State(state): State<AppState>) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(catalog::list_courses(state.store(), false).await?))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Course>> {
    Ok(Json(catalog::get_course(state.store(), id).await?))
}

pub async fn create_course(
    State(state): State<AppState>,
    i18n: I18n,
    input: Result<Form<CourseInput>, FormRejection>,
) -> Flash {
    let result = async {
        let input = form_body(input)?;
        catalog::create_course(state.store(), input).await
    }
    .await;

    match result {
        Ok(course) => Flash::success(format!("/admin/courses/{}", course.id), i18n.get("course-created")),
        Err(e) => Flash::failure("/admin/courses", &e, &i18n),
    }
}

pub async fn update_course(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
    input: Result<Form<CourseInput>, FormRejection>,
) -> Flash {
    let location = format!("/admin/courses/{}", id);
    let result = async {
        let input = form_body(input)?;
        catalog::update_course(state.store(), id, input).await
    }
    .await;

    match result {
        Ok(_) => Flash::success(location, i18n.get("course-updated")),
        Err(e) => Flash::failure(location, &e, &i18n),
    }
}

pub async fn delete_course(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
) -> Flash {
    match catalog::delete_course(state.store(), id).await {
        Ok(DeleteOutcome::Deleted) => Flash::success("/admin/courses", i18n.get("course-deleted")),
        Ok(DeleteOutcome::Deactivated) => {
            Flash::success("/admin/courses", i18n.get("course-deactivated"))
        }
        Err(e) => Flash::failure("/admin/courses", &e, &i18n),
    }
}

// Campuses

pub async fn list_campuses(State(state): State<AppState>) -> AppResult<Json<Vec<Campus>>> {
    Ok(Json(catalog::list_campuses(state.store(), false).await?))
}

pub async fn get_campus(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Campus>> {
    Ok(Json(catalog::get_campus(state.store(), id).await?))
}

pub async fn create_campus(
    State(state): State<AppState>,
    i18n: I18n,
    input: Result<Form<CampusInput>, FormRejection>,
) -> Flash {
    let result = async {
        let input = form_body(input)?;
        catalog::create_campus(state.store(), input).await
    }
    .await;

    match result {
        Ok(campus) => Flash::success(format!("/admin/campuses/{}", campus.id), i18n.get("campus-created")),
        Err(e) => Flash::failure("/admin/campuses", &e, &i18n),
    }
}

pub async fn update_campus(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
    input: Result<Form<CampusInput>, FormRejection>,
) -> Flash {
    let location = format!("/admin/campuses/{}", id);
    let result = async {
        let input = form_body(input)?;
        catalog::update_campus(state.store(), id, input).await
    }
    .await;

    match result {
        Ok(_) => Flash::success(location, i18n.get("campus-updated")),
        Err(e) => Flash::failure(location, &e, &i18n),
    }
}

pub async fn delete_campus(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
) -> Flash {
    match catalog::delete_campus(state.store(), id).await {
        Ok(DeleteOutcome::Deleted) => Flash::success("/admin/campuses", i18n.get("campus-deleted")),
        Ok(DeleteOutcome::Deactivated) => {
            Flash::success("/admin/campuses", i18n.get("campus-deactivated"))
        }
        Err(e) => Flash::failure("/admin/campuses", &e, &i18n),
    }
}

// Sessions

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(filter): Query<SessionFilter>,
) -> AppResult<Json<Vec<SessionListing>>> {
    let sessions = catalog::list_sessions(state.store(), &filter, Utc::now().date_naive()).await?;
    Ok(Json(sessions))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<SessionDetail>> {
    Ok(Json(catalog::session_detail(state.store(), id).await?))
}

/// Schedule Generator form submission.
pub async fn create_sessions(
    State(state): State<AppState>,
    i18n: I18n,
    form: Result<Form<ScheduleForm>, FormRejection>,
) -> Flash {
    let result = async {
        let request = ScheduleRequest::try_from(form_body(form)?)?;
        schedule::generate(state.store(), &request).await
    }
    .await;

    match result {
        Ok(created) => Flash::success(
            "/admin/sessions",
            i18n.get_with_args("sessions-created", &i18n_args! { "count" => created.len() }),
        ),
        Err(e) => Flash::failure("/admin/sessions", &e, &i18n),
    }
}

/// Edit-mode submission of the Schedule Generator form.
pub async fn update_session(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
    form: Result<Form<ScheduleForm>, FormRejection>,
) -> Flash {
    let location = format!("/admin/sessions/{}", id);
    let result = async {
        let request = ScheduleRequest::try_from(form_body(form)?)?;
        schedule::reschedule(state.store(), id, &request).await
    }
    .await;

    match result {
        Ok(outcome) if outcome.siblings.is_empty() => {
            Flash::success(location, i18n.get("session-updated"))
        }
        Ok(outcome) => Flash::success(
            location,
            i18n.get_with_args(
                "session-updated-with-siblings",
                &i18n_args! { "count" => outcome.siblings.len() },
            ),
        ),
        Err(e) => Flash::failure(location, &e, &i18n),
    }
}

pub async fn delete_session(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
) -> Flash {
    match catalog::delete_session(state.store(), id).await {
        Ok(()) => Flash::success("/admin/sessions", i18n.get("session-deleted")),
        Err(e) => Flash::failure(format!("/admin/sessions/{}", id), &e, &i18n),
    }
}

// Students and their bookings

pub async fn list_students(State(state): State<AppState>) -> AppResult<Json<Vec<StudentSummary>>> {
    Ok(Json(students::list_students(state.store()).await?))
}

pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<StudentDetail>> {
    Ok(Json(students::student_detail(state.store(), id).await?))
}

#[derive(Debug, Deserialize)]
pub struct BookingStatusForm {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
    form: Result<Form<BookingStatusForm>, FormRejection>,
) -> Flash {
    let result = async {
        let form = form_body(form)?;
        booking::update_status(state.store(), id, form.status, form.payment_status).await
    }
    .await;

    match result {
        Ok(updated) => Flash::success(
            format!("/admin/sessions/{}", updated.session_id),
            i18n.get("booking-updated"),
        ),
        Err(e) => Flash::failure("/admin/sessions", &e, &i18n),
    }
}

/// Remove a student from a session, freeing the seat.
pub async fn remove_booking(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
) -> Flash {
    match booking::remove(state.store(), id).await {
        Ok(removed) => Flash::success(
            format!("/admin/sessions/{}", removed.session_id),
            i18n.get("booking-removed"),
        ),
        Err(e) => Flash::failure("/admin/sessions", &e, &i18n),
    }
}
