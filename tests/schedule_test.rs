mod common;

use common::{campus, course, date, one_off, time};
use training_center::db::{MemoryStore, SessionStatus};
use training_center::error::AppError;
use training_center::services::schedule::{
    self, Frequency, Recurrence, ScheduleForm, ScheduleRequest,
};

#[tokio::test]
async fn weekly_recurrence_creates_sessions_seven_days_apart() {
    let store = MemoryStore::new();
    let course = course(&store, "Working at Height", 15).await;
    let campus = campus(&store, "Ataşehir").await;

    let mut request = one_off(&course, &campus, date(2030, 1, 7));
    request.max_participants = Some(10);
    request.recurrence = Recurrence::Recurring {
        frequency: Frequency::Weekly,
        count: 4,
    };

    let created = schedule::generate(&store, &request).await.unwrap();

    assert_eq!(created.len(), 4);
    for pair in created.windows(2) {
        assert_eq!((pair[1].session_date - pair[0].session_date).num_days(), 7);
    }
    for session in &created {
        assert_eq!(session.course_id, course.id);
        assert_eq!(session.campus_id, campus.id);
        assert_eq!(session.start_time, time(9, 0));
        assert_eq!(session.end_time, time(17, 0));
        assert_eq!(session.max_participants, 10);
        assert_eq!(session.current_participants, 0);
        assert_eq!(session.status, SessionStatus::Scheduled);
        assert_eq!(session.instructor_name.as_deref(), Some("Deniz Kaya"));
    }
    assert_eq!(store.session_count().await, 4);
}

#[tokio::test]
async fn daily_recurrence_covers_consecutive_days() {
    let store = MemoryStore::new();
    let course = course(&store, "First Aid", 12).await;
    let campus = campus(&store, "Bornova").await;

    let mut request = one_off(&course, &campus, date(2025, 1, 1));
    request.recurrence = Recurrence::Recurring {
        frequency: Frequency::Daily,
        count: 5,
    };

    let dates: Vec<_> = schedule::generate(&store, &request)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.session_date)
        .collect();
    assert_eq!(
        dates,
        (1..=5).map(|d| date(2025, 1, d)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn monthly_recurrence_clamps_to_month_end() {
    let store = MemoryStore::new();
    let course = course(&store, "Forklift Operation", 6).await;
    let campus = campus(&store, "Gebze").await;

    let mut request = one_off(&course, &campus, date(2030, 1, 31));
    request.recurrence = Recurrence::Recurring {
        frequency: Frequency::Monthly,
        count: 3,
    };

    let dates: Vec<_> = schedule::generate(&store, &request)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.session_date)
        .collect();
    assert_eq!(dates, vec![date(2030, 1, 31), date(2030, 2, 28), date(2030, 3, 31)]);
}

#[tokio::test]
async fn one_off_form_creates_a_single_session_with_course_capacity() {
    let store = MemoryStore::new();
    let course = course(&store, "Electrical Safety", 20).await;
    let campus = campus(&store, "Çankaya").await;

    let form = ScheduleForm {
        course_id: Some(course.id.to_string()),
        campus_id: Some(campus.id.to_string()),
        session_date: Some("2030-05-20".into()),
        start_time: Some("10:00".into()),
        end_time: Some("16:00".into()),
        max_participants: Some("".into()),
        schedule_type: Some("one_off".into()),
        recurrence_frequency: Some("daily".into()),
        recurrence_count: Some("10".into()),
        ..Default::default()
    };
    let request = ScheduleRequest::try_from(form).unwrap();
    let created = schedule::generate(&store, &request).await.unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].max_participants, 20);
    assert_eq!(store.session_count().await, 1);
}

#[tokio::test]
async fn inverted_time_window_writes_nothing() {
    let store = MemoryStore::new();
    let course = course(&store, "Chemical Handling", 10).await;
    let campus = campus(&store, "Konak").await;

    let mut request = one_off(&course, &campus, date(2030, 2, 1));
    request.start_time = Some(time(14, 0));
    request.end_time = Some(time(14, 0));

    let err = schedule::generate(&store, &request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn unknown_course_is_not_found() {
    let store = MemoryStore::new();
    let course = course(&store, "Ergonomics", 10).await;
    let campus = campus(&store, "Nilüfer").await;

    let mut request = one_off(&course, &campus, date(2030, 2, 1));
    request.course_id = Some(course.id + 1000);

    let err = schedule::generate(&store, &request).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn failure_mid_batch_rolls_back_every_row() {
    let store = MemoryStore::failing_session_inserts_after(2);
    let course = course(&store, "Confined Spaces", 8).await;
    let campus = campus(&store, "Tuzla").await;

    let mut request = one_off(&course, &campus, date(2030, 6, 2));
    request.recurrence = Recurrence::Recurring {
        frequency: Frequency::Weekly,
        count: 5,
    };

    let err = schedule::generate(&store, &request).await.unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn edit_updates_in_place_and_adds_remaining_occurrences() {
    let store = MemoryStore::new();
    let course = course(&store, "Scaffolding", 10).await;
    let campus = campus(&store, "Pendik").await;
    let original = schedule::generate(&store, &one_off(&course, &campus, date(2030, 9, 1)))
        .await
        .unwrap()
        .remove(0);

    let mut request = one_off(&course, &campus, date(2030, 9, 3));
    request.end_time = Some(time(13, 0));
    request.recurrence = Recurrence::Recurring {
        frequency: Frequency::Daily,
        count: 3,
    };

    let outcome = schedule::reschedule(&store, original.id, &request).await.unwrap();

    assert_eq!(outcome.updated.id, original.id);
    assert_eq!(outcome.updated.session_date, date(2030, 9, 3));
    assert_eq!(outcome.updated.end_time, time(13, 0));
    assert_eq!(outcome.updated.max_participants, original.max_participants);
    let sibling_dates: Vec<_> = outcome.siblings.iter().map(|s| s.session_date).collect();
    assert_eq!(sibling_dates, vec![date(2030, 9, 4), date(2030, 9, 5)]);
    assert_eq!(store.session_count().await, 3);
}

#[tokio::test]
async fn edit_cannot_drop_capacity_below_booked_seats() {
    let store = MemoryStore::new();
    let session = common::session_with_capacity(&store, 5).await;
    common::book(&store, session.id, "first@example.com").await.unwrap();
    common::book(&store, session.id, "second@example.com").await.unwrap();

    let request = ScheduleRequest {
        course_id: Some(session.course_id),
        campus_id: Some(session.campus_id),
        start_date: Some(session.session_date),
        start_time: Some(session.start_time),
        end_time: Some(session.end_time),
        max_participants: Some(1),
        instructor_name: None,
        status: SessionStatus::Scheduled,
        recurrence: Recurrence::OneOff,
    };

    let err = schedule::reschedule(&store, session.id, &request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
