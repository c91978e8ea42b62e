#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use training_center::app_state::AppState;
use training_center::config::Config;
use training_center::db::{
    Booking, Campus, CampusInput, Course, CourseInput, MemoryStore, SessionStatus,
    TrainingSession,
};
use training_center::error::AppResult;
use training_center::i18n::{init_i18n, SupportedLanguage};
use training_center::services::booking::{self, BookingRequest, TraineeContact};
use training_center::services::catalog;
use training_center::services::schedule::{self, Recurrence, ScheduleRequest};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub async fn course(store: &MemoryStore, name: &str, max_capacity: i32) -> Course {
    catalog::create_course(
        store,
        CourseInput {
            name: name.into(),
            description: Some("Hands-on training".into()),
            duration_hours: 8,
            price: Decimal::new(150_00, 2),
            max_capacity,
            active: true,
        },
    )
    .await
    .unwrap()
}

pub async fn campus(store: &MemoryStore, name: &str) -> Campus {
    catalog::create_campus(
        store,
        CampusInput {
            name: name.into(),
            address: None,
            city: Some("İstanbul".into()),
            region: Some("Marmara".into()),
            phone: None,
            email: None,
            active: true,
        },
    )
    .await
    .unwrap()
}

pub fn one_off(course: &Course, campus: &Campus, on: NaiveDate) -> ScheduleRequest {
    ScheduleRequest {
        course_id: Some(course.id),
        campus_id: Some(campus.id),
        start_date: Some(on),
        start_time: Some(time(9, 0)),
        end_time: Some(time(17, 0)),
        max_participants: None,
        instructor_name: Some("Deniz Kaya".into()),
        status: SessionStatus::Scheduled,
        recurrence: Recurrence::OneOff,
    }
}

/// A course, a campus and one future session with the given capacity.
pub async fn session_with_capacity(store: &MemoryStore, capacity: i32) -> TrainingSession {
    let course = course(store, "Fire Safety", capacity).await;
    let campus = campus(store, "Kadıköy").await;
    let mut sessions = schedule::generate(store, &one_off(&course, &campus, date(2030, 3, 4)))
        .await
        .unwrap();
    sessions.remove(0)
}

pub fn trainee(name: &str, email: &str) -> TraineeContact {
    TraineeContact {
        name: name.into(),
        email: email.into(),
        phone: Some("+90 555 000 00 00".into()),
        region: None,
    }
}

pub async fn book(store: &MemoryStore, session_id: i64, email: &str) -> AppResult<Booking> {
    booking::book(
        store,
        BookingRequest {
            session_id,
            trainee: trainee("Test Trainee", email),
            special_requirements: None,
        },
        chrono::Utc::now(),
    )
    .await
}

pub fn app_state(store: MemoryStore) -> AppState {
    let localizer = init_i18n("locales", SupportedLanguage::English).unwrap();
    AppState::new(
        Arc::new(store),
        Config::new("postgres://localhost/unused"),
        Arc::new(localizer),
    )
}
