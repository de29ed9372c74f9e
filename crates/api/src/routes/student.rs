//! Student registration, login and attendance endpoints.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::{
    CreateDeviceChangeRequest, DeviceChangeResponse, MarkAttendanceRequest,
    MarkAttendanceResponse, OtpSentResponse, RegisterStudentRequest, Student,
    StudentAttendanceResponse, StudentAuthResponse, StudentLoginRequest, StudentProfile,
    VerifyRegistrationRequest, VerifyStudentLoginRequest,
};
use domain::DomainError;
use shared::jwt::{Role, TokenSubject};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, StudentAuth};
use crate::middleware::metrics::{
    record_attendance_marked, record_attendance_rejected, record_otp_issued,
};

use super::check_otp_rate;

fn auth_response(
    state: &AppState,
    student: &Student,
    message: &str,
) -> Result<StudentAuthResponse, ApiError> {
    let issued = state.jwt.issue(&TokenSubject {
        account_id: student.id,
        email: &student.email,
        role: Role::Student,
        device_id: Some(&student.device_id),
    })?;

    Ok(StudentAuthResponse {
        message: message.to_string(),
        token: issued.token,
        expires_in: issued.expires_in,
        student: StudentProfile::from(student),
    })
}

/// Starts a registration and emails a confirmation code.
///
/// POST /api/student/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterStudentRequest>,
) -> Result<Json<OtpSentResponse>, ApiError> {
    request.validate()?;
    check_otp_rate(&state, &request.email)?;

    let issued = state.identity.register_student(&request).await?;
    record_otp_issued("registration");

    Ok(Json(OtpSentResponse {
        message: "OTP sent to your email. Please verify to complete registration.".to_string(),
        email: issued.email,
        expires_at: issued.expires_at,
    }))
}

/// POST /api/student/verify-registration
pub async fn verify_registration(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyRegistrationRequest>,
) -> Result<(StatusCode, Json<StudentAuthResponse>), ApiError> {
    request.validate()?;

    let student = state
        .identity
        .verify_registration(&request.email, &request.otp)
        .await?;

    let response = auth_response(&state, &student, "Registration successful")?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Sends a login code when the account is bound to the requesting device.
///
/// POST /api/student/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StudentLoginRequest>,
) -> Result<Json<OtpSentResponse>, ApiError> {
    request.validate()?;
    check_otp_rate(&state, &request.email)?;

    let issued = state
        .identity
        .authenticate_student_login(&request.email, &request.device_id)
        .await?;
    record_otp_issued("login");

    Ok(Json(OtpSentResponse {
        message: "OTP sent to your email".to_string(),
        email: issued.email,
        expires_at: issued.expires_at,
    }))
}

/// POST /api/student/verify-login
pub async fn verify_login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyStudentLoginRequest>,
) -> Result<Json<StudentAuthResponse>, ApiError> {
    request.validate()?;

    let student = state
        .identity
        .verify_student_login(&request.email, &request.otp, &request.device_id)
        .await?;

    Ok(Json(auth_response(&state, &student, "Login successful")?))
}

/// GET /api/student/attendance
pub async fn attendance_history(
    State(state): State<AppState>,
    auth: StudentAuth,
) -> Result<Json<StudentAttendanceResponse>, ApiError> {
    let attendance = state.attendance.student_attendance(auth.student.id).await?;
    Ok(Json(StudentAttendanceResponse { attendance }))
}

/// Records attendance for a scanned QR session.
///
/// POST /api/student/mark-attendance
pub async fn mark_attendance(
    State(state): State<AppState>,
    auth: StudentAuth,
    ApiJson(request): ApiJson<MarkAttendanceRequest>,
) -> Result<Json<MarkAttendanceResponse>, ApiError> {
    request.validate()?;

    let result = state
        .attendance
        .mark_attendance(
            auth.student.id,
            &request.session_id,
            request.latitude,
            request.longitude,
        )
        .await;

    match result {
        Ok(record) => {
            record_attendance_marked();
            Ok(Json(MarkAttendanceResponse::from(&record)))
        }
        Err(err) => {
            if let Some(reason) = rejection_reason(&err) {
                record_attendance_rejected(reason);
            }
            Err(err.into())
        }
    }
}

fn rejection_reason(err: &DomainError) -> Option<&'static str> {
    match err {
        DomainError::InvalidSession => Some("invalid_session"),
        DomainError::TooFar { .. } => Some("too_far"),
        DomainError::AlreadyMarked => Some("already_marked"),
        _ => None,
    }
}

/// Files a request to rebind the account to a new device.
///
/// POST /api/student/request-device-change
pub async fn request_device_change(
    State(state): State<AppState>,
    auth: StudentAuth,
    ApiJson(request): ApiJson<CreateDeviceChangeRequest>,
) -> Result<(StatusCode, Json<DeviceChangeResponse>), ApiError> {
    request.validate()?;

    let created = state
        .device_changes
        .request_change(auth.student.id, &request)
        .await?;

    Ok((StatusCode::CREATED, Json(DeviceChangeResponse { request: created })))
}
