//! Registration and login flows for students and teachers.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{json_request, registration_body, test_config, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_registration_issues_token_and_profile() {
    let app = TestApp::new();

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/student/register",
            registration_body("asha@example.edu", "CS2024001", "device-1"),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "asha@example.edu");
    assert!(body["expiresAt"].is_string());
    assert!(body.get("otp").is_none());

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/student/verify-registration",
            json!({ "email": "asha@example.edu", "otp": app.last_code("asha@example.edu") }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().unwrap().split('.').count() == 3);
    assert_eq!(body["expiresIn"], 86_400);
    assert_eq!(body["student"]["enrollmentNumber"], "CS2024001");
    assert!(body["student"].get("deviceId").is_none());
}

#[tokio::test]
async fn test_registration_code_is_single_use() {
    let app = TestApp::new();
    app.register_student("asha@example.edu", "CS2024001", "device-1")
        .await;

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/student/verify-registration",
            json!({ "email": "asha@example.edu", "otp": app.last_code("asha@example.edu") }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_otp");
    assert_eq!(body["error"], "Invalid or expired OTP");
}

#[tokio::test]
async fn test_wrong_code_rejected() {
    let app = TestApp::new();
    app.call(json_request(
        Method::POST,
        "/api/student/register",
        registration_body("asha@example.edu", "CS2024001", "device-1"),
    ))
    .await;

    let code = app.last_code("asha@example.edu");
    let wrong = if code == "123456" { "654321" } else { "123456" };

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/student/verify-registration",
            json!({ "email": "asha@example.edu", "otp": wrong }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_otp");
}

#[tokio::test]
async fn test_reissue_invalidates_previous_code() {
    let app = TestApp::new();
    let register = || {
        json_request(
            Method::POST,
            "/api/student/register",
            registration_body("asha@example.edu", "CS2024001", "device-1"),
        )
    };

    app.call(register()).await;
    let first = app.last_code("asha@example.edu");
    app.call(register()).await;
    let second = app.last_code("asha@example.edu");

    if first != second {
        let (status, _) = app
            .call(json_request(
                Method::POST,
                "/api/student/verify-registration",
                json!({ "email": "asha@example.edu", "otp": first }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app
        .call(json_request(
            Method::POST,
            "/api/student/verify-registration",
            json!({ "email": "asha@example.edu", "otp": second }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_duplicate_device_rejected() {
    let app = TestApp::new();
    app.register_student("asha@example.edu", "CS2024001", "device-1")
        .await;

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/student/register",
            registration_body("ravi@example.edu", "CS2024002", "device-1"),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "duplicate");
    assert_eq!(
        body["error"],
        "This device is already registered with another account"
    );
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let app = TestApp::new();
    app.register_student("asha@example.edu", "CS2024001", "device-1")
        .await;

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/student/register",
            registration_body("asha@example.edu", "CS2024009", "device-9"),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "duplicate");
}

#[tokio::test]
async fn test_registration_validation() {
    let app = TestApp::new();
    let mut body = registration_body("not-an-email", "CS2024001", "device-1");
    body["year"] = json!(9);

    let (status, body) = app
        .call(json_request(Method::POST, "/api/student/register", body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_dispatch_failure_is_service_unavailable() {
    let app = TestApp::new();
    app.notifier.set_failing(true);

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/student/register",
            registration_body("asha@example.edu", "CS2024001", "device-1"),
        ))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "service_unavailable");
}

#[tokio::test]
async fn test_login_not_found_and_device_mismatch_are_distinct() {
    let app = TestApp::new();
    app.register_student("asha@example.edu", "CS2024001", "device-1")
        .await;

    let (status, unknown) = app
        .call(json_request(
            Method::POST,
            "/api/student/login",
            json!({ "email": "nobody@example.edu", "deviceId": "device-1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(unknown["code"], "not_found");

    let (status, mismatch) = app
        .call(json_request(
            Method::POST,
            "/api/student/login",
            json!({ "email": "asha@example.edu", "deviceId": "device-2" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(mismatch["code"], "device_mismatch");
    assert_ne!(unknown["error"], mismatch["error"]);
}

#[tokio::test]
async fn test_student_login_round_trip() {
    let app = TestApp::new();
    app.register_student("asha@example.edu", "CS2024001", "device-1")
        .await;

    let (status, _) = app
        .call(json_request(
            Method::POST,
            "/api/student/login",
            json!({ "email": "asha@example.edu", "deviceId": "device-1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let code = app.last_code("asha@example.edu");

    // The code is bound to the device it was requested from.
    let (status, _) = app
        .call(json_request(
            Method::POST,
            "/api/student/verify-login",
            json!({ "email": "asha@example.edu", "otp": code, "deviceId": "device-2" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/student/verify-login",
            json!({ "email": "asha@example.edu", "otp": code, "deviceId": "device-1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_teacher_login_unknown_or_inactive() {
    let app = TestApp::new();
    let teacher = app
        .store
        .add_teacher("Dr. Sen", "sen@example.edu", "EEE", "EMP02");
    app.store.set_teacher_active(teacher.id, false);

    for email in ["ghost@example.edu", "sen@example.edu"] {
        let (status, body) = app
            .call(json_request(
                Method::POST,
                "/api/teacher/login",
                json!({ "email": email }),
            ))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Teacher not found or account is inactive");
    }
}

#[tokio::test]
async fn test_otp_issuance_rate_limited_per_email() {
    let mut config = test_config();
    config.security.otp_rate_limit_per_hour = 2;
    let app = TestApp::with_config(config);

    let register = |email: &str| {
        json_request(
            Method::POST,
            "/api/student/register",
            registration_body(email, "CS2024001", "device-1"),
        )
    };

    assert_eq!(app.call(register("asha@example.edu")).await.0, StatusCode::OK);
    assert_eq!(app.call(register("asha@example.edu")).await.0, StatusCode::OK);

    let response = app.send(register("asha@example.edu")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Other addresses keep their own budget.
    assert_eq!(app.call(register("ravi@example.edu")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_body_with_missing_field_is_validation_error() {
    let app = TestApp::new();

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/teacher/login",
            json!({ "mail": "iyer@example.edu" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("email"));

    let mut registration = registration_body("asha@example.edu", "CS2024001", "device-1");
    registration.as_object_mut().unwrap().remove("deviceId");
    let (status, body) = app
        .call(json_request(Method::POST, "/api/student/register", registration))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_or_untyped_body_is_validation_error() {
    let app = TestApp::new();

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/student/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let (status, body) = app.call(malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let wrong_type = json_request(
        Method::POST,
        "/api/student/login",
        json!({ "email": "asha@example.edu", "deviceId": 42 }),
    );
    let (status, body) = app.call(wrong_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let no_content_type = Request::builder()
        .method(Method::POST)
        .uri("/api/student/login")
        .body(Body::from(r#"{"email":"asha@example.edu","deviceId":"device-1"}"#))
        .unwrap();
    let (status, body) = app.call(no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}
