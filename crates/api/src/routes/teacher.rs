//! Teacher login, QR session and report endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{
    ActiveSessionsResponse, AttendanceReport, GenerateQrRequest, GenerateQrResponse,
    ListSubjectsResponse, OtpSentResponse, TeacherAuthResponse, TeacherLoginRequest,
    TeacherProfile, VerifyTeacherLoginRequest,
};
use shared::jwt::{Role, TokenSubject};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, TeacherAuth};
use crate::middleware::metrics::record_otp_issued;

use super::check_otp_rate;

/// POST /api/teacher/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TeacherLoginRequest>,
) -> Result<Json<OtpSentResponse>, ApiError> {
    request.validate()?;
    check_otp_rate(&state, &request.email)?;

    let issued = state
        .identity
        .authenticate_teacher_login(&request.email)
        .await?;
    record_otp_issued("login");

    Ok(Json(OtpSentResponse {
        message: "OTP sent to your email".to_string(),
        email: issued.email,
        expires_at: issued.expires_at,
    }))
}

/// POST /api/teacher/verify-login
pub async fn verify_login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyTeacherLoginRequest>,
) -> Result<Json<TeacherAuthResponse>, ApiError> {
    request.validate()?;

    let teacher = state
        .identity
        .verify_teacher_login(&request.email, &request.otp)
        .await?;

    let issued = state.jwt.issue(&TokenSubject {
        account_id: teacher.id,
        email: &teacher.email,
        role: Role::Teacher,
        device_id: None,
    })?;

    Ok(Json(TeacherAuthResponse {
        message: "Login successful".to_string(),
        token: issued.token,
        expires_in: issued.expires_in,
        teacher: TeacherProfile::from(&teacher),
    }))
}

/// GET /api/teacher/subjects
pub async fn subjects(
    State(state): State<AppState>,
    auth: TeacherAuth,
) -> Result<Json<ListSubjectsResponse>, ApiError> {
    let subjects = state.sessions.list_subjects(auth.teacher.id).await?;
    Ok(Json(ListSubjectsResponse { subjects }))
}

/// GET /api/teacher/active-sessions
pub async fn active_sessions(
    State(state): State<AppState>,
    auth: TeacherAuth,
) -> Result<Json<ActiveSessionsResponse>, ApiError> {
    let sessions = state.sessions.list_active_sessions(auth.teacher.id).await?;
    Ok(Json(ActiveSessionsResponse { sessions }))
}

/// Opens a new QR session, superseding the previous one for the subject.
///
/// POST /api/teacher/generate-qr
pub async fn generate_qr(
    State(state): State<AppState>,
    auth: TeacherAuth,
    ApiJson(request): ApiJson<GenerateQrRequest>,
) -> Result<Json<GenerateQrResponse>, ApiError> {
    request.validate()?;

    let created = state
        .sessions
        .create_session(
            auth.teacher.id,
            request.subject_id,
            request.latitude,
            request.longitude,
        )
        .await?;

    Ok(Json(GenerateQrResponse::from(created)))
}

/// GET /api/teacher/attendance-report/:subject_id
pub async fn attendance_report(
    State(state): State<AppState>,
    auth: TeacherAuth,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<AttendanceReport>, ApiError> {
    let report = state
        .attendance
        .attendance_report(auth.teacher.id, subject_id)
        .await?;
    Ok(Json(report))
}
