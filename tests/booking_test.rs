mod common;

use chrono::{Duration, Utc};

use common::{book, date, one_off, session_with_capacity, trainee};
use training_center::db::{
    BookingStatus, DocumentType, MemoryStore, PaymentStatus, SessionStatus, Store, UserStatus,
};
use training_center::error::AppError;
use training_center::services::catalog::{self, DeleteOutcome};
use training_center::services::documents::{self, Upload};
use training_center::services::{booking, schedule, students, wizard};

async fn participants(store: &MemoryStore, session_id: i64) -> i32 {
    catalog::session_detail(store, session_id)
        .await
        .unwrap()
        .session
        .current_participants
}

#[tokio::test]
async fn booking_takes_one_seat() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 3).await;

    let booking = book(&store, session.id, "trainee@example.com").await.unwrap();

    assert_eq!(booking.session_id, session.id);
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Unpaid);
    assert!(booking.confirmation_code.starts_with("TC-"));
    assert_eq!(participants(&store, session.id).await, 1);
    assert_eq!(store.booking_count().await, 1);
}

#[tokio::test]
async fn confirmation_codes_are_unique() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 10).await;

    let mut codes = Vec::new();
    for i in 0..5 {
        let booking = book(&store, session.id, &format!("t{}@example.com", i))
            .await
            .unwrap();
        codes.push(booking.confirmation_code);
    }
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 5);
    assert_eq!(participants(&store, session.id).await, 5);
}

#[tokio::test]
async fn full_session_rejects_booking_without_writing() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 1).await;
    book(&store, session.id, "first@example.com").await.unwrap();

    let err = book(&store, session.id, "second@example.com").await.unwrap_err();

    assert!(matches!(err, AppError::Capacity(id) if id == session.id));
    assert_eq!(store.booking_count().await, 1);
    assert_eq!(store.user_count().await, 1);
    assert_eq!(participants(&store, session.id).await, 1);
}

#[tokio::test]
async fn cancelled_session_cannot_be_booked() {
    let store = MemoryStore::new();
    let course = common::course(&store, "Hazard Awareness", 10).await;
    let campus = common::campus(&store, "Maltepe").await;
    let mut request = one_off(&course, &campus, date(2030, 4, 1));
    request.status = SessionStatus::Cancelled;
    let session = schedule::generate(&store, &request).await.unwrap().remove(0);

    let err = book(&store, session.id, "trainee@example.com").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(store.booking_count().await, 0);
}

#[tokio::test]
async fn returning_trainee_reuses_account() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;

    let first = book(&store, session.id, "ali@example.com").await.unwrap();
    let second = book(&store, session.id, "  ALI@Example.com ").await.unwrap();

    assert_eq!(first.user_id, second.user_id);
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn first_booking_creates_pending_trainee() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    let booked = book(&store, session.id, "new@example.com").await.unwrap();

    let trainees = students::list_students(&store).await.unwrap();
    assert_eq!(trainees.len(), 1);
    assert_eq!(trainees[0].id, booked.user_id);
    assert_eq!(trainees[0].status, UserStatus::Pending);
    assert_eq!(trainees[0].booking_count, 1);
}

#[tokio::test]
async fn seat_lost_to_concurrent_booking_rolls_back() {
    let store = MemoryStore::losing_seat_races();
    let session = session_with_capacity(&store, 5).await;

    let err = book(&store, session.id, "late@example.com").await.unwrap_err();

    assert!(matches!(err, AppError::Capacity(id) if id == session.id));
    assert_eq!(store.booking_count().await, 0);
    assert_eq!(store.user_count().await, 0);
    assert_eq!(participants(&store, session.id).await, 0);
}

#[tokio::test]
async fn invalid_contact_is_rejected_before_writing() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;

    let err = book(&store, session.id, "not-an-email").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(store.user_count().await, 0);
}

#[tokio::test]
async fn removal_frees_only_the_targeted_seat() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    let keep = book(&store, session.id, "keep@example.com").await.unwrap();
    let leaving = book(&store, session.id, "drop@example.com").await.unwrap();

    let removed = booking::remove(&store, leaving.id).await.unwrap();

    assert_eq!(removed.id, leaving.id);
    assert_eq!(participants(&store, session.id).await, 1);
    let remaining = catalog::session_detail(&store, session.id).await.unwrap().bookings;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].booking.id, keep.id);

    let err = booking::remove(&store, leaving.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn status_update_keeps_seat_count() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    let booked = book(&store, session.id, "pay@example.com").await.unwrap();

    let updated = booking::update_status(&store, booked.id, BookingStatus::Completed, PaymentStatus::Paid)
        .await
        .unwrap();

    assert_eq!(updated.status, BookingStatus::Completed);
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
    assert_eq!(participants(&store, session.id).await, 1);
}

#[tokio::test]
async fn wizard_walks_from_course_to_confirmed_booking() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 4).await;
    let now = Utc::now();
    let ttl = Duration::minutes(30);

    let draft = wizard::start(&store, session.course_id, now, ttl).await.unwrap();
    let view = wizard::view(&store, draft.token, now).await.unwrap();
    assert!(view.campus_options.iter().any(|c| c.id == session.campus_id));

    wizard::choose_campus(&store, draft.token, session.campus_id, now).await.unwrap();
    let view = wizard::view(&store, draft.token, now).await.unwrap();
    assert_eq!(view.session_options.len(), 1);
    assert_eq!(view.session_options[0].session.id, session.id);

    wizard::choose_session(&store, draft.token, session.id, now).await.unwrap();
    let confirmed = wizard::confirm(
        &store,
        draft.token,
        trainee("Elif Demir", "elif@example.com"),
        Some("Vegetarian lunch".into()),
        now,
    )
    .await
    .unwrap();

    assert_eq!(confirmed.notes.as_deref(), Some("Vegetarian lunch"));
    let details = booking::details_by_code(&store, &confirmed.confirmation_code)
        .await
        .unwrap();
    assert_eq!(details.user_email, "elif@example.com");
    assert_eq!(details.session_date, session.session_date);

    // The draft is gone once the booking is made.
    let err = wizard::view(&store, draft.token, now).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn expired_draft_is_rejected() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 4).await;
    let now = Utc::now();

    let draft = wizard::start(&store, session.course_id, now, Duration::minutes(30))
        .await
        .unwrap();
    let later = now + Duration::minutes(31);

    let err = wizard::choose_campus(&store, draft.token, session.campus_id, later)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn wizard_rejects_session_from_another_campus() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 4).await;
    let other_campus = common::campus(&store, "Üsküdar").await;
    let now = Utc::now();

    let draft = wizard::start(&store, session.course_id, now, Duration::minutes(30))
        .await
        .unwrap();
    wizard::choose_campus(&store, draft.token, other_campus.id, now).await.unwrap();

    let err = wizard::choose_session(&store, draft.token, session.id, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn course_deletion_is_hard_soft_or_refused() {
    let store = MemoryStore::new();

    let unused = common::course(&store, "Unused", 5).await;
    assert_eq!(
        catalog::delete_course(&store, unused.id).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert!(matches!(
        catalog::get_course(&store, unused.id).await,
        Err(AppError::NotFound(_))
    ));

    let session = session_with_capacity(&store, 5).await;
    let err = catalog::delete_course(&store, session.course_id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    book(&store, session.id, "history@example.com").await.unwrap();
    assert_eq!(
        catalog::delete_course(&store, session.course_id).await.unwrap(),
        DeleteOutcome::Deactivated
    );
    let course = catalog::get_course(&store, session.course_id).await.unwrap();
    assert!(!course.active);
    let active = catalog::list_courses(&store, true).await.unwrap();
    assert!(active.iter().all(|c| c.id != course.id));
}

#[tokio::test]
async fn campus_with_booked_sessions_is_deactivated() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    book(&store, session.id, "c@example.com").await.unwrap();

    assert_eq!(
        catalog::delete_campus(&store, session.campus_id).await.unwrap(),
        DeleteOutcome::Deactivated
    );
    assert!(!catalog::get_campus(&store, session.campus_id).await.unwrap().active);
}

#[tokio::test]
async fn session_with_bookings_cannot_be_deleted() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    let booked = book(&store, session.id, "s@example.com").await.unwrap();

    let err = catalog::delete_session(&store, session.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    booking::remove(&store, booked.id).await.unwrap();
    catalog::delete_session(&store, session.id).await.unwrap();
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn dashboard_counts_reflect_activity() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    book(&store, session.id, "a@example.com").await.unwrap();
    book(&store, session.id, "b@example.com").await.unwrap();

    let counts = catalog::dashboard(&store, date(2030, 1, 1)).await.unwrap();
    assert_eq!(counts.active_courses, 1);
    assert_eq!(counts.active_campuses, 1);
    assert_eq!(counts.upcoming_sessions, 1);
    assert_eq!(counts.confirmed_bookings, 2);
    assert_eq!(counts.trainees, 2);
}

#[tokio::test]
async fn documents_are_stored_listed_and_deleted() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    let booked = book(&store, session.id, "docs@example.com").await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let document = documents::upload(
        &store,
        dir.path(),
        1024,
        Upload {
            user_id: booked.user_id,
            doc_type: DocumentType::Certificate,
            original_filename: "../sertifika 2030.pdf".into(),
            mime_type: Some("application/pdf".into()),
            bytes: b"%PDF-1.7".to_vec(),
        },
    )
    .await
    .unwrap();

    let path = std::path::PathBuf::from(&document.storage_path);
    assert!(path.starts_with(dir.path()));
    assert!(path.to_string_lossy().ends_with("-sertifika_2030.pdf"));
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");

    let detail = students::student_detail(&store, booked.user_id).await.unwrap();
    assert_eq!(detail.documents.len(), 1);
    assert_eq!(detail.bookings.len(), 1);

    documents::delete(&store, document.id).await.unwrap();
    assert!(!path.exists());
    assert!(documents::list(&store, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    let booked = book(&store, session.id, "big@example.com").await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let err = documents::upload(
        &store,
        dir.path(),
        4,
        Upload {
            user_id: booked.user_id,
            doc_type: DocumentType::Other,
            original_filename: "scan.png".into(),
            mime_type: None,
            bytes: vec![0u8; 5],
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_document_file_does_not_block_delete() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 5).await;
    let booked = book(&store, session.id, "gone@example.com").await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let document = documents::upload(
        &store,
        dir.path(),
        1024,
        Upload {
            user_id: booked.user_id,
            doc_type: DocumentType::Identity,
            original_filename: "kimlik.jpg".into(),
            mime_type: Some("image/jpeg".into()),
            bytes: vec![1, 2, 3],
        },
    )
    .await
    .unwrap();
    std::fs::remove_file(&document.storage_path).unwrap();

    documents::delete(&store, document.id).await.unwrap();
    let mut tx = store.begin().await.unwrap();
    assert!(tx.document(document.id).await.unwrap().is_none());
}
