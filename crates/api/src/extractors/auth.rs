//! Bearer token extractors for student and teacher routes.
//!
//! Both extractors validate the signature, check the role claim and then load
//! the account so deactivated accounts and rebound devices are refused even
//! while an old token is still unexpired.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use domain::models::{Student, Teacher};
use shared::jwt::{extract_account_id, Claims, Role};

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated student.
#[derive(Debug, Clone)]
pub struct StudentAuth {
    pub student: Student,
    pub claims: Claims,
}

/// Authenticated teacher.
#[derive(Debug, Clone)]
pub struct TeacherAuth {
    pub teacher: Teacher,
    pub claims: Claims,
}

async fn bearer_token(parts: &mut Parts, state: &AppState) -> Result<String, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                if rejection.is_missing() {
                    ApiError::Unauthorized("Missing Authorization header".to_string())
                } else {
                    ApiError::Unauthorized("Invalid Authorization header format".to_string())
                }
            })?;
    Ok(bearer.token().to_string())
}

/// Validates the token and requires `role`. A valid token of the other
/// role is forbidden rather than unauthorized.
async fn claims_for(parts: &mut Parts, state: &AppState, role: Role) -> Result<Claims, ApiError> {
    let token = bearer_token(parts, state).await?;
    let claims = state.jwt.validate(&token)?;
    if claims.role != role {
        return Err(ApiError::Forbidden(format!(
            "This endpoint requires a {} account",
            role.as_str()
        )));
    }
    Ok(claims)
}

#[async_trait]
impl FromRequestParts<AppState> for StudentAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_for(parts, state, Role::Student).await?;
        let student_id = extract_account_id(&claims)?;
        let student = state
            .identity
            .authorize_student(student_id, claims.device_id.as_deref())
            .await?;
        Ok(Self { student, claims })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for TeacherAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_for(parts, state, Role::Teacher).await?;
        let teacher_id = extract_account_id(&claims)?;
        let teacher = state.identity.authorize_teacher(teacher_id).await?;
        Ok(Self { teacher, claims })
    }
}
