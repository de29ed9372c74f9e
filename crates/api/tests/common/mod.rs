//! Common test utilities for integration tests.
//!
//! The router runs over the in-memory store and the mock notifier, so these
//! tests need no database or mail provider.

#![allow(dead_code)]

use attendance_api::app::{create_app, AppState};
use attendance_api::config::{
    AttendanceConfig, Config, DatabaseConfig, EmailConfig, JwtAuthConfig, LoggingConfig,
    SecurityConfig, ServerConfig,
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use domain::memory::InMemoryStore;
use domain::models::{Subject, Teacher};
use domain::services::MockOtpNotifier;
use fake::faker::name::en::Name;
use fake::Fake;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_KEY: &str = "test-admin-key";

/// Classroom anchor used by the teacher fixtures.
pub const CLASSROOM: (f64, f64) = (12.9716, 77.5946);
/// About 7 m from the anchor.
pub const NEARBY: (f64, f64) = (12.97165, 77.59465);
/// About 1.1 km from the anchor.
pub const FAR_AWAY: (f64, f64) = (12.980, 77.600);

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            otp_rate_limit_per_hour: 0, // Disable rate limiting for tests
            admin_api_key: ADMIN_KEY.to_string(),
        },
        jwt: JwtAuthConfig {
            secret: "integration-test-secret".to_string(),
            private_key: String::new(),
            public_key: String::new(),
            token_expiry_secs: 86_400,
            leeway_secs: 30,
        },
        email: EmailConfig::default(),
        attendance: AttendanceConfig::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<MockOtpNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(MockOtpNotifier::new());
        let state = AppState::new(config, store.clone().stores(), notifier.clone())
            .expect("Failed to build app state");

        Self {
            router: create_app(state),
            store,
            notifier,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends the request and returns the status with the parsed JSON body.
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.send(request).await;
        let status = response.status();
        (status, parse_response_body(response).await)
    }

    pub fn last_code(&self, email: &str) -> String {
        self.notifier
            .last_code_for(email)
            .expect("No passcode dispatched")
    }

    /// Registers and verifies a student through the API. Returns the token.
    pub async fn register_student(&self, email: &str, enrollment: &str, device: &str) -> String {
        self.register_student_with_id(email, enrollment, device)
            .await
            .0
    }

    pub async fn register_student_with_id(
        &self,
        email: &str,
        enrollment: &str,
        device: &str,
    ) -> (String, Uuid) {
        let (status, body) = self
            .call(json_request(
                Method::POST,
                "/api/student/register",
                registration_body(email, enrollment, device),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);

        let (status, body) = self
            .call(json_request(
                Method::POST,
                "/api/student/verify-registration",
                serde_json::json!({ "email": email, "otp": self.last_code(email) }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "verify failed: {}", body);
        let id = body["student"]["id"].as_str().unwrap().parse().unwrap();
        (body["token"].as_str().unwrap().to_string(), id)
    }

    /// Seeds a teacher assigned to one subject and logs them in.
    pub async fn teacher_with_subject(&self) -> (String, Teacher, Subject) {
        let teacher = self
            .store
            .add_teacher("Dr. Iyer", "iyer@example.edu", "CSE", "EMP01");
        let subject = self
            .store
            .add_subject("Algorithms", "CS301", "CSE", 5, 4);
        self.store.assign_subject(teacher.id, subject.id);

        let (status, _) = self
            .call(json_request(
                Method::POST,
                "/api/teacher/login",
                serde_json::json!({ "email": teacher.email }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self
            .call(json_request(
                Method::POST,
                "/api/teacher/verify-login",
                serde_json::json!({
                    "email": teacher.email,
                    "otp": self.last_code(&teacher.email),
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "teacher login failed: {}", body);

        (body["token"].as_str().unwrap().to_string(), teacher, subject)
    }

    /// Opens a QR session at the classroom anchor. Returns the session id.
    pub async fn open_session(&self, teacher_token: &str, subject: &Subject) -> String {
        let (status, body) = self
            .call(json_request_with_auth(
                Method::POST,
                "/api/teacher/generate-qr",
                serde_json::json!({
                    "subjectId": subject.id,
                    "latitude": CLASSROOM.0,
                    "longitude": CLASSROOM.1,
                }),
                teacher_token,
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "generate-qr failed: {}", body);
        body["sessionId"].as_str().unwrap().to_string()
    }

    pub async fn mark(
        &self,
        student_token: &str,
        session_id: &str,
        at: (f64, f64),
    ) -> (StatusCode, serde_json::Value) {
        self.call(json_request_with_auth(
            Method::POST,
            "/api/student/mark-attendance",
            serde_json::json!({
                "sessionId": session_id,
                "latitude": at.0,
                "longitude": at.1,
            }),
            student_token,
        ))
        .await
    }
}

pub fn registration_body(email: &str, enrollment: &str, device: &str) -> serde_json::Value {
    serde_json::json!({
        "fullName": Name().fake::<String>(),
        "email": email,
        "enrollmentNumber": enrollment,
        "branch": "CSE",
        "year": 2,
        "deviceId": device,
    })
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn json_request_with_auth(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request_with_auth(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn admin_request(method: Method, uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("X-Admin-Key", key);
    }
    builder.body(Body::from("{}")).unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
