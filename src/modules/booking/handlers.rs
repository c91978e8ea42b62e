use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    response::Json,
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::BookingDetails;
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;
use crate::i18n_args;
use crate::modules::flash::{form_body, Flash};
use crate::services::booking::{self, TraineeContact};
use crate::services::wizard::{self, DraftView};

fn draft_location(token: Uuid) -> String {
    format!("/booking/{}", token)
}

/// An unknown or expired draft sends the visitor back to the start page.
fn failure(token: Uuid, err: &AppError, i18n: &I18n) -> Flash {
    let location = match err {
        AppError::NotFound(_) => "/".to_string(),
        _ => draft_location(token),
    };
    Flash::failure(location, err, i18n)
}

#[derive(Debug, Deserialize)]
pub struct StartForm {
    pub course_id: i64,
}

pub async fn start(
    State(state): State<AppState>,
    i18n: I18n,
    form: Result<Form<StartForm>, FormRejection>,
) -> Flash {
    let ttl = state.env.booking_draft_ttl();
    let result = async {
        let form = form_body(form)?;
        wizard::start(state.store(), form.course_id, Utc::now(), ttl).await
    }
    .await;

    match result {
        Ok(draft) => Flash::success(draft_location(draft.token), i18n.get("wizard-course-selected")),
        Err(e) => Flash::failure("/", &e, &i18n),
    }
}

pub async fn show(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> AppResult<Json<DraftView>> {
    Ok(Json(wizard::view(state.store(), token, Utc::now()).await?))
}

#[derive(Debug, Deserialize)]
pub struct CampusForm {
    pub campus_id: i64,
}

pub async fn choose_campus(
    State(state): State<AppState>,
    i18n: I18n,
    Path(token): Path<Uuid>,
    form: Result<Form<CampusForm>, FormRejection>,
) -> Flash {
    let result = async {
        let form = form_body(form)?;
        wizard::choose_campus(state.store(), token, form.campus_id, Utc::now()).await
    }
    .await;

    match result {
        Ok(_) => Flash::success(draft_location(token), i18n.get("wizard-campus-selected")),
        Err(e) => failure(token, &e, &i18n),
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionForm {
    pub session_id: i64,
}

pub async fn choose_session(
    State(state): State<AppState>,
    i18n: I18n,
    Path(token): Path<Uuid>,
    form: Result<Form<SessionForm>, FormRejection>,
) -> Flash {
    let result = async {
        let form = form_body(form)?;
        wizard::choose_session(state.store(), token, form.session_id, Utc::now()).await
    }
    .await;

    match result {
        Ok(_) => Flash::success(draft_location(token), i18n.get("wizard-session-selected")),
        Err(e) => failure(token, &e, &i18n),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub region: Option<String>,
    pub special_requirements: Option<String>,
}

pub async fn confirm(
    State(state): State<AppState>,
    i18n: I18n,
    Path(token): Path<Uuid>,
    form: Result<Form<ConfirmForm>, FormRejection>,
) -> Flash {
    let result = async {
        let form = form_body(form)?;
        let trainee = TraineeContact {
            name: form.name,
            email: form.email,
            phone: form.phone,
            region: form.region,
        };
        wizard::confirm(state.store(), token, trainee, form.special_requirements, Utc::now()).await
    }
    .await;

    match result {
        Ok(booking) => {
            let message = i18n.get_with_args(
                "booking-confirmed",
                &i18n_args! { "code" => booking.confirmation_code.as_str() },
            );
            Flash::success(
                format!("/booking/success?code={}", booking.confirmation_code),
                message,
            )
        }
        Err(e) => failure(token, &e, &i18n),
    }
}

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub code: String,
}

pub async fn success(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> AppResult<Json<BookingDetails>> {
    Ok(Json(booking::details_by_code(state.store(), &query.code).await?))
}
