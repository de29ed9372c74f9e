use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{
    AttendanceService, CredentialService, DeviceChangeService, IdentityService, OtpNotifier,
    OtpSettings, ProximityValidator, SessionService,
};
use domain::store::Stores;
use shared::jwt::{JwtConfig, JwtError};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    handle_timeout_error, metrics_handler, metrics_middleware, require_admin,
    security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{admin, health, student, teacher};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: Stores,
    pub jwt: Arc<JwtConfig>,
    pub credentials: CredentialService,
    pub identity: IdentityService,
    pub sessions: SessionService,
    pub attendance: AttendanceService,
    pub device_changes: DeviceChangeService,
    pub otp_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    /// Wires the services over `stores`. Fails only on unusable JWT key material.
    pub fn new(
        config: Config,
        stores: Stores,
        notifier: Arc<dyn OtpNotifier>,
    ) -> Result<Self, JwtError> {
        let jwt = Arc::new(config.jwt.build()?);
        let rules = &config.attendance;

        let credentials = CredentialService::new(
            stores.credentials.clone(),
            notifier,
            OtpSettings {
                validity: chrono::Duration::seconds(rules.otp_validity_secs),
                dispatch_timeout: Duration::from_secs(config.email.timeout_secs),
            },
        );
        let identity = IdentityService::new(&stores, credentials.clone());
        let sessions = SessionService::new(
            &stores,
            chrono::Duration::seconds(rules.session_validity_secs),
        );
        let attendance = AttendanceService::new(
            &stores,
            sessions.clone(),
            ProximityValidator::new(rules.max_distance_meters),
        );
        let device_changes = DeviceChangeService::new(&stores);
        let otp_limiter = RateLimiterState::per_hour(config.security.otp_rate_limit_per_hour)
            .map(Arc::new);

        Ok(Self {
            config: Arc::new(config),
            stores,
            jwt,
            credentials,
            identity,
            sessions,
            attendance,
            device_changes,
            otp_limiter,
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // Development default
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Unauthenticated endpoints; protected handlers authenticate through
    // the StudentAuth/TeacherAuth extractors.
    let student_routes = Router::new()
        .route("/register", post(student::register))
        .route("/verify-registration", post(student::verify_registration))
        .route("/login", post(student::login))
        .route("/verify-login", post(student::verify_login))
        .route("/attendance", get(student::attendance_history))
        .route("/mark-attendance", post(student::mark_attendance))
        .route(
            "/request-device-change",
            post(student::request_device_change),
        );

    let teacher_routes = Router::new()
        .route("/login", post(teacher::login))
        .route("/verify-login", post(teacher::verify_login))
        .route("/subjects", get(teacher::subjects))
        .route("/active-sessions", get(teacher::active_sessions))
        .route("/generate-qr", post(teacher::generate_qr))
        .route(
            "/attendance-report/:subject_id",
            get(teacher::attendance_report),
        );

    let admin_routes = Router::new()
        .route(
            "/device-change-requests",
            get(admin::list_device_changes),
        )
        .route(
            "/device-change-requests/:id/approve",
            post(admin::approve_device_change),
        )
        .route(
            "/device-change-requests/:id/reject",
            post(admin::reject_device_change),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let health_routes = Router::new()
        .route("/", get(health::health_check))
        .route("/live", get(health::live))
        .route("/ready", get(health::ready));

    let api = Router::new()
        .nest("/student", student_routes)
        .nest("/teacher", teacher_routes)
        .nest("/admin", admin_routes)
        .nest("/health", health_routes);

    Router::new()
        .nest("/api", api)
        .route("/metrics", get(metrics_handler))
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(Duration::from_secs(config.server.request_timeout_secs)),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config.security.cors_origins))
        .with_state(state)
}
