//! Public booking wizard: course, then campus, then session, then contact
//! details. Progress between steps lives in a server-side draft identified
//! by an opaque token and discarded after a fixed time.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{
    Booking, BookingDraft, Campus, Course, SessionFilter, SessionListing, Store, StoreTx,
    TrainingSession,
};
use crate::error::{AppError, AppResult};
use crate::services::booking::{self, BookingRequest, TraineeContact};

/// A draft with its chosen entities resolved and the options for the next step.
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    pub draft: BookingDraft,
    pub course: Option<Course>,
    pub campus: Option<Campus>,
    pub session: Option<TrainingSession>,
    pub campus_options: Vec<Campus>,
    pub session_options: Vec<SessionListing>,
}

async fn live_draft(tx: &mut dyn StoreTx, token: Uuid, now: DateTime<Utc>) -> AppResult<BookingDraft> {
    tx.draft(token, now)
        .await?
        .ok_or_else(|| AppError::NotFound("booking draft expired or unknown".into()))
}

/// Begin a booking for a course. Expired drafts are purged on the way.
pub async fn start(
    store: &dyn Store,
    course_id: i64,
    now: DateTime<Utc>,
    ttl: Duration,
) -> AppResult<BookingDraft> {
    let mut tx = store.begin().await?;
    let purged = tx.purge_expired_drafts(now).await?;
    if purged > 0 {
        debug!(purged, "Purged expired booking drafts");
    }

    match tx.course(course_id).await? {
        Some(course) if course.active => {}
        _ => return Err(AppError::NotFound(format!("course {}", course_id))),
    }

    let draft = BookingDraft::new(course_id, now, ttl);
    tx.insert_draft(&draft).await?;
    tx.commit().await?;

    info!(token = %draft.token, course_id, "Booking draft started");
    Ok(draft)
}

pub async fn view(store: &dyn Store, token: Uuid, now: DateTime<Utc>) -> AppResult<DraftView> {
    let mut tx = store.begin().await?;
    let draft = live_draft(tx.as_mut(), token, now).await?;

    let course = match draft.course_id {
        Some(id) => tx.course(id).await?,
        None => None,
    };
    let campus = match draft.campus_id {
        Some(id) => tx.campus(id).await?,
        None => None,
    };
    let session = match draft.session_id {
        Some(id) => tx.session(id).await?,
        None => None,
    };

    let campus_options = if campus.is_none() {
        tx.list_campuses(true).await?
    } else {
        Vec::new()
    };
    let session_options = match (draft.course_id, draft.campus_id, draft.session_id) {
        (Some(course_id), Some(campus_id), None) => {
            let filter = SessionFilter {
                course_id: Some(course_id),
                campus_id: Some(campus_id),
                from_date: None,
                bookable_only: true,
            };
            tx.list_sessions(&filter, now.date_naive()).await?
        }
        _ => Vec::new(),
    };

    Ok(DraftView {
        draft,
        course,
        campus,
        session,
        campus_options,
        session_options,
    })
}

/// Choosing a campus clears any session chosen earlier.
pub async fn choose_campus(
    store: &dyn Store,
    token: Uuid,
    campus_id: i64,
    now: DateTime<Utc>,
) -> AppResult<BookingDraft> {
    let mut tx = store.begin().await?;
    let mut draft = live_draft(tx.as_mut(), token, now).await?;

    match tx.campus(campus_id).await? {
        Some(campus) if campus.active => {}
        _ => return Err(AppError::NotFound(format!("campus {}", campus_id))),
    }

    draft.campus_id = Some(campus_id);
    draft.session_id = None;
    tx.update_draft(&draft).await?;
    tx.commit().await?;
    Ok(draft)
}

pub async fn choose_session(
    store: &dyn Store,
    token: Uuid,
    session_id: i64,
    now: DateTime<Utc>,
) -> AppResult<BookingDraft> {
    let mut tx = store.begin().await?;
    let mut draft = live_draft(tx.as_mut(), token, now).await?;

    let (Some(course_id), Some(campus_id)) = (draft.course_id, draft.campus_id) else {
        return Err(AppError::Validation("choose a campus before a session".into()));
    };
    let session = tx
        .session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("session {}", session_id)))?;

    if session.course_id != course_id || session.campus_id != campus_id {
        return Err(AppError::Validation(
            "session does not belong to the chosen course and campus".into(),
        ));
    }
    if !session.status.is_bookable() || session.session_date < now.date_naive() {
        return Err(AppError::Validation(format!(
            "session {} is no longer open for booking",
            session.id
        )));
    }
    if session.available_spots() <= 0 {
        return Err(AppError::Capacity(session.id));
    }

    draft.session_id = Some(session.id);
    tx.update_draft(&draft).await?;
    tx.commit().await?;
    Ok(draft)
}

/// Book the drafted session for the trainee and discard the draft.
pub async fn confirm(
    store: &dyn Store,
    token: Uuid,
    trainee: TraineeContact,
    special_requirements: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<Booking> {
    let session_id = {
        let mut tx = store.begin().await?;
        let draft = live_draft(tx.as_mut(), token, now).await?;
        draft
            .session_id
            .ok_or_else(|| AppError::Validation("choose a session before confirming".into()))?
    };

    let booking = booking::book(
        store,
        BookingRequest {
            session_id,
            trainee,
            special_requirements,
        },
        now,
    )
    .await?;

    // The booking stands even if the draft lingers until it expires.
    let discarded = async {
        let mut tx = store.begin().await?;
        tx.delete_draft(token).await?;
        tx.commit().await
    }
    .await;
    if let Err(e) = discarded {
        warn!(%token, error = %e, "Failed to discard booking draft");
    }

    Ok(booking)
}
