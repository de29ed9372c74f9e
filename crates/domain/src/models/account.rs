//! Student and teacher account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A verified student account bound to exactly one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub enrollment_number: String,
    pub branch: String,
    pub year: i32,
    pub device_id: String,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Whether the account may sign in at all.
    pub fn can_sign_in(&self) -> bool {
        self.is_verified && self.is_active
    }

    /// Whether `device_id` is the device this account is bound to.
    pub fn is_bound_to(&self, device_id: &str) -> bool {
        self.device_id == device_id
    }
}

/// A teacher account. Teachers are provisioned externally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub employee_id: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public view of a student returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub enrollment_number: String,
    pub branch: String,
    pub year: i32,
}

impl From<&Student> for StudentProfile {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            full_name: student.full_name.clone(),
            email: student.email.clone(),
            enrollment_number: student.enrollment_number.clone(),
            branch: student.branch.clone(),
            year: student.year,
        }
    }
}

/// Public view of a teacher returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub employee_id: String,
}

impl From<&Teacher> for TeacherProfile {
    fn from(teacher: &Teacher) -> Self {
        Self {
            id: teacher.id,
            full_name: teacher.full_name.clone(),
            email: teacher.email.clone(),
            department: teacher.department.clone(),
            employee_id: teacher.employee_id.clone(),
        }
    }
}

/// Accepts the academic year either as a JSON number or a numeric string.
fn year_from_number_or_string<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Number(i32),
        Text(String),
    }

    match Year::deserialize(deserializer)? {
        Year::Number(n) => Ok(n),
        Year::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom("year must be a number")),
    }
}

/// Request payload for student registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    #[validate(
        length(min = 1, max = 255, message = "Full name must be 1-255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub full_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "shared::validation::validate_enrollment_number"))]
    pub enrollment_number: String,

    #[validate(
        length(min = 1, max = 100, message = "Branch must be 1-100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub branch: String,

    #[serde(deserialize_with = "year_from_number_or_string")]
    #[validate(custom(function = "shared::validation::validate_year"))]
    pub year: i32,

    #[validate(custom(function = "shared::validation::validate_device_id"))]
    pub device_id: String,
}

/// Request payload for completing registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRegistrationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "OTP is required"))]
    pub otp: String,
}

/// Request payload for starting a student login.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "shared::validation::validate_device_id"))]
    pub device_id: String,
}

/// Request payload for completing a student login.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyStudentLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "OTP is required"))]
    pub otp: String,

    #[validate(custom(function = "shared::validation::validate_device_id"))]
    pub device_id: String,
}

/// Request payload for starting a teacher login.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeacherLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Request payload for completing a teacher login.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTeacherLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "OTP is required"))]
    pub otp: String,
}

/// Response after a passcode was dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSentResponse {
    pub message: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Response after a student authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAuthResponse {
    pub message: String,
    pub token: String,
    pub expires_in: i64,
    pub student: StudentProfile,
}

/// Response after a teacher authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAuthResponse {
    pub message: String,
    pub token: String,
    pub expires_in: i64,
    pub teacher: TeacherProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registration_json() -> serde_json::Value {
        json!({
            "fullName": "Asha Rao",
            "email": "asha@example.edu",
            "enrollmentNumber": "CS2021001",
            "branch": "CSE",
            "year": 3,
            "deviceId": "device-001"
        })
    }

    #[test]
    fn test_register_request_valid() {
        let request: RegisterStudentRequest = serde_json::from_value(registration_json()).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.year, 3);
    }

    #[test]
    fn test_register_request_accepts_year_as_string() {
        let mut body = registration_json();
        body["year"] = json!("2");
        let request: RegisterStudentRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.year, 2);
    }

    #[test]
    fn test_register_request_rejects_non_numeric_year() {
        let mut body = registration_json();
        body["year"] = json!("second");
        assert!(serde_json::from_value::<RegisterStudentRequest>(body).is_err());
    }

    #[test]
    fn test_register_request_missing_field() {
        let mut body = registration_json();
        body.as_object_mut().unwrap().remove("deviceId");
        assert!(serde_json::from_value::<RegisterStudentRequest>(body).is_err());
    }

    #[test]
    fn test_register_request_invalid_email() {
        let mut body = registration_json();
        body["email"] = json!("not-an-email");
        let request: RegisterStudentRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_blank_name() {
        let mut body = registration_json();
        body["fullName"] = json!("   ");
        let request: RegisterStudentRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_year_out_of_range() {
        let mut body = registration_json();
        body["year"] = json!(9);
        let request: RegisterStudentRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_student_profile_serializes_camel_case() {
        let student = Student {
            id: Uuid::new_v4(),
            full_name: "Asha Rao".into(),
            email: "asha@example.edu".into(),
            enrollment_number: "CS2021001".into(),
            branch: "CSE".into(),
            year: 3,
            device_id: "device-001".into(),
            is_verified: true,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(StudentProfile::from(&student)).unwrap();
        assert_eq!(value["fullName"], "Asha Rao");
        assert_eq!(value["enrollmentNumber"], "CS2021001");
        assert!(value.get("deviceId").is_none());
    }

    #[test]
    fn test_student_sign_in_rules() {
        let mut student = Student {
            id: Uuid::new_v4(),
            full_name: "Asha Rao".into(),
            email: "asha@example.edu".into(),
            enrollment_number: "CS2021001".into(),
            branch: "CSE".into(),
            year: 3,
            device_id: "device-001".into(),
            is_verified: true,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        };
        assert!(student.can_sign_in());
        assert!(student.is_bound_to("device-001"));
        assert!(!student.is_bound_to("device-002"));

        student.is_active = false;
        assert!(!student.can_sign_in());
    }
}
