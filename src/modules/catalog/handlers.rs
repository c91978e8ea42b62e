use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::db::{Campus, Course, SessionListing};
use crate::error::AppResult;
use crate::i18n::{I18n, SupportedLanguage};
use crate::services::catalog;

/// Active courses offered to trainees.
pub async fn courses(State(state): State<AppState>) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(catalog::list_courses(state.store(), true).await?))
}

pub async fn campuses(State(state): State<AppState>) -> AppResult<Json<Vec<Campus>>> {
    Ok(Json(catalog::list_campuses(state.store(), true).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub course_id: Option<i64>,
    pub campus_id: Option<i64>,
}

/// Upcoming sessions that still have free seats.
pub async fn sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<Vec<SessionListing>>> {
    let sessions = catalog::bookable_sessions(
        state.store(),
        query.course_id,
        query.campus_id,
        Utc::now().date_naive(),
    )
    .await?;
    Ok(Json(sessions))
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub is_default: bool,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageInfo>,
    pub current_language: &'static str,
}

pub async fn languages(State(state): State<AppState>, i18n: I18n) -> Json<LanguagesResponse> {
    let default_language = state.localizer.default_language();
    let languages = SupportedLanguage::all()
        .iter()
        .map(|lang| LanguageInfo {
            code: lang.code(),
            name: lang.name(),
            is_default: *lang == default_language,
        })
        .collect();

    Json(LanguagesResponse {
        languages,
        current_language: i18n.language().code(),
    })
}
