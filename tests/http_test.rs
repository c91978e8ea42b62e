mod common;

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use common::{app_state, session_with_capacity};
use training_center::app::create_router;
use training_center::db::MemoryStore;

fn router(store: &MemoryStore) -> Router {
    create_router(app_state(store.clone()))
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Path and decoded query parameters of a redirect.
fn redirect(response: &Response) -> (String, HashMap<String, String>) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    match location.split_once('?') {
        Some((path, query)) => (path.to_string(), serde_urlencoded::from_str(query).unwrap()),
        None => (location, HashMap::new()),
    }
}

#[tokio::test]
async fn health_reports_database_status() {
    let store = MemoryStore::new();
    let response = router(&store).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["services"]["database"], "healthy");
}

#[tokio::test]
async fn course_form_redirects_with_success_message() {
    let store = MemoryStore::new();
    let response = router(&store)
        .oneshot(form_post(
            "/admin/courses",
            "name=Fire+Safety&description=&duration_hours=8&price=120.50&max_capacity=15",
        ))
        .await
        .unwrap();

    let (path, params) = redirect(&response);
    assert!(path.starts_with("/admin/courses/"));
    assert_eq!(params["success"], "The course was created.");

    let courses = json_body(router(&store).oneshot(get("/api/courses")).await.unwrap()).await;
    assert_eq!(courses.as_array().unwrap().len(), 1);
    assert_eq!(courses[0]["name"], "Fire Safety");
}

#[tokio::test]
async fn schedule_form_creates_recurring_sessions() {
    let store = MemoryStore::new();
    let course = common::course(&store, "Working at Height", 12).await;
    let campus = common::campus(&store, "Levent").await;

    let body = format!(
        "course_id={}&campus_id={}&session_date=2030-02-04&start_time=09%3A00&end_time=12%3A00\
         &max_participants=&instructor_name=&status=scheduled&schedule_type=recurring\
         &recurrence_frequency=weekly&recurrence_count=4",
        course.id, campus.id
    );
    let response = router(&store)
        .oneshot(form_post("/admin/sessions", &body))
        .await
        .unwrap();

    let (path, params) = redirect(&response);
    assert_eq!(path, "/admin/sessions");
    assert_eq!(params["success"], "4 sessions were scheduled.");
    assert_eq!(store.session_count().await, 4);
}

#[tokio::test]
async fn schedule_errors_are_localized() {
    let store = MemoryStore::new();
    let course = common::course(&store, "Forklift", 6).await;
    let campus = common::campus(&store, "Gebze").await;

    let body = format!(
        "course_id={}&campus_id={}&session_date=2030-02-04&start_time=15%3A00&end_time=09%3A00",
        course.id, campus.id
    );
    let mut request = form_post("/admin/sessions", &body);
    request
        .headers_mut()
        .insert(header::ACCEPT_LANGUAGE, "tr-TR,tr;q=0.9".parse().unwrap());
    let response = router(&store).oneshot(request).await.unwrap();

    let (path, params) = redirect(&response);
    assert_eq!(path, "/admin/sessions");
    assert!(params["error"].starts_with("Geçersiz giriş:"));
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn booking_wizard_over_http() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 2).await;

    let response = router(&store)
        .oneshot(form_post("/booking/start", &format!("course_id={}", session.course_id)))
        .await
        .unwrap();
    let (draft_path, _) = redirect(&response);
    assert!(draft_path.starts_with("/booking/"));

    let response = router(&store)
        .oneshot(form_post(
            &format!("{}/campus", draft_path),
            &format!("campus_id={}", session.campus_id),
        ))
        .await
        .unwrap();
    assert_eq!(redirect(&response).0, draft_path);

    let view = json_body(router(&store).oneshot(get(&draft_path)).await.unwrap()).await;
    assert_eq!(view["session_options"][0]["id"], session.id);

    let response = router(&store)
        .oneshot(form_post(
            &format!("{}/session", draft_path),
            &format!("session_id={}", session.id),
        ))
        .await
        .unwrap();
    assert_eq!(redirect(&response).0, draft_path);

    let response = router(&store)
        .oneshot(form_post(
            &format!("{}/confirm", draft_path),
            "name=Mert+%C3%96z&email=mert%40example.com&phone=&special_requirements=",
        ))
        .await
        .unwrap();
    let (path, params) = redirect(&response);
    assert_eq!(path, "/booking/success");
    let code = params["code"].clone();
    assert!(code.starts_with("TC-"));
    assert!(params["success"].contains(&code));

    let summary = json_body(
        router(&store)
            .oneshot(get(&format!("/booking/success?code={}", code)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(summary["user_email"], "mert@example.com");
    assert_eq!(summary["user_name"], "Mert Öz");

    let sessions = json_body(
        router(&store)
            .oneshot(get(&format!("/admin/sessions/{}", session.id)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(sessions["session"]["current_participants"], 1);
}

#[tokio::test]
async fn unknown_draft_is_not_found() {
    let store = MemoryStore::new();
    let response = router(&store)
        .oneshot(get("/booking/6f1c2f8e-5d3a-4c55-9a0e-3b8f9e1d2c4a"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "not_found");
}

#[tokio::test]
async fn public_sessions_list_only_bookable_sessions() {
    let store = MemoryStore::new();
    let open = session_with_capacity(&store, 1).await;
    common::book(&store, open.id, "seat@example.com").await.unwrap();

    let sessions = json_body(
        router(&store)
            .oneshot(get(&format!("/api/sessions?course_id={}", open.course_id)))
            .await
            .unwrap(),
    )
    .await;
    assert!(sessions.as_array().unwrap().is_empty());

    let admin = json_body(router(&store).oneshot(get("/admin/sessions")).await.unwrap()).await;
    assert_eq!(admin.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn removing_a_student_redirects_to_the_session() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 3).await;
    let booked = common::book(&store, session.id, "leave@example.com").await.unwrap();

    let response = router(&store)
        .oneshot(form_post(&format!("/admin/bookings/{}/remove", booked.id), ""))
        .await
        .unwrap();

    let (path, params) = redirect(&response);
    assert_eq!(path, format!("/admin/sessions/{}", session.id));
    assert_eq!(params["success"], "The student was removed from the session.");
    assert_eq!(store.booking_count().await, 0);
}

#[tokio::test]
async fn language_can_be_chosen_by_header() {
    let store = MemoryStore::new();
    let request = Request::builder()
        .uri("/api/languages")
        .header("X-Language", "tr")
        .body(Body::empty())
        .unwrap();
    let body = json_body(router(&store).oneshot(request).await.unwrap()).await;

    assert_eq!(body["current_language"], "tr");
    assert_eq!(body["languages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_booking_start_redirects_with_error() {
    let store = MemoryStore::new();
    let response = router(&store)
        .oneshot(form_post("/booking/start", "course_id="))
        .await
        .unwrap();

    let (path, params) = redirect(&response);
    assert_eq!(path, "/");
    assert!(params["error"].starts_with("Invalid input:"));
}

#[tokio::test]
async fn malformed_wizard_step_returns_to_the_draft() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 2).await;
    let response = router(&store)
        .oneshot(form_post("/booking/start", &format!("course_id={}", session.course_id)))
        .await
        .unwrap();
    let (draft_path, _) = redirect(&response);

    let response = router(&store)
        .oneshot(form_post(&format!("{}/campus", draft_path), "campus_id=first"))
        .await
        .unwrap();

    let (path, params) = redirect(&response);
    assert_eq!(path, draft_path);
    assert!(params["error"].starts_with("Invalid input:"));
}

#[tokio::test]
async fn malformed_course_form_redirects_with_error() {
    let store = MemoryStore::new();
    let response = router(&store)
        .oneshot(form_post(
            "/admin/courses",
            "name=Fire+Safety&duration_hours=8&price=abc&max_capacity=15",
        ))
        .await
        .unwrap();

    let (path, params) = redirect(&response);
    assert_eq!(path, "/admin/courses");
    assert!(params["error"].starts_with("Invalid input:"));

    let courses = json_body(router(&store).oneshot(get("/admin/courses")).await.unwrap()).await;
    assert!(courses.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn course_form_accepts_checkbox_value() {
    let store = MemoryStore::new();
    let response = router(&store)
        .oneshot(form_post(
            "/admin/courses",
            "name=First+Aid&duration_hours=16&price=300&max_capacity=12&active=on",
        ))
        .await
        .unwrap();

    let (path, params) = redirect(&response);
    assert!(path.starts_with("/admin/courses/"));
    assert_eq!(params["success"], "The course was created.");

    let course = json_body(router(&store).oneshot(get(&path)).await.unwrap()).await;
    assert_eq!(course["active"], true);
}

#[tokio::test]
async fn unknown_booking_status_redirects_with_error() {
    let store = MemoryStore::new();
    let session = session_with_capacity(&store, 3).await;
    let booked = common::book(&store, session.id, "status@example.com").await.unwrap();

    let response = router(&store)
        .oneshot(form_post(
            &format!("/admin/bookings/{}/status", booked.id),
            "status=lost&payment_status=paid",
        ))
        .await
        .unwrap();

    let (path, params) = redirect(&response);
    assert_eq!(path, "/admin/sessions");
    assert!(params["error"].starts_with("Invalid input:"));
}
