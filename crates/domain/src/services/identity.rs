//! Account registration, login and device binding.

use chrono::Utc;
use shared::jwt::Role;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{
    DomainError, MSG_DUPLICATE_DEVICE, MSG_DUPLICATE_IDENTITY, MSG_STUDENT_NOT_FOUND,
    MSG_TEACHER_NOT_FOUND,
};
use crate::models::{OtpIssued, RegisterStudentRequest, Student, Teacher};
use crate::services::credential::CredentialService;
use crate::store::{Stores, StudentStore, TeacherStore};

#[derive(Clone)]
pub struct IdentityService {
    students: Arc<dyn StudentStore>,
    teachers: Arc<dyn TeacherStore>,
    credentials: CredentialService,
}

impl IdentityService {
    pub fn new(stores: &Stores, credentials: CredentialService) -> Self {
        Self {
            students: stores.students.clone(),
            teachers: stores.teachers.clone(),
            credentials,
        }
    }

    /// Starts a registration after checking email, enrollment number and
    /// device are all free.
    pub async fn register_student(
        &self,
        request: &RegisterStudentRequest,
    ) -> Result<OtpIssued, DomainError> {
        if self
            .students
            .identity_taken(&request.email, &request.enrollment_number)
            .await?
        {
            return Err(DomainError::Duplicate(MSG_DUPLICATE_IDENTITY.to_string()));
        }

        if self
            .students
            .find_student_by_device(&request.device_id)
            .await?
            .is_some()
        {
            return Err(DomainError::Duplicate(MSG_DUPLICATE_DEVICE.to_string()));
        }

        self.credentials.issue_registration(request).await
    }

    /// Completes a registration with its confirmation code.
    pub async fn verify_registration(&self, email: &str, otp: &str) -> Result<Student, DomainError> {
        let student = self.credentials.redeem_registration(email, otp).await?;
        tracing::info!(student_id = %student.id, "Student registration completed");
        Ok(student)
    }

    /// Starts a student login. Unknown accounts and foreign devices fail
    /// with different errors so the student knows to request a device change.
    pub async fn authenticate_student_login(
        &self,
        email: &str,
        device_id: &str,
    ) -> Result<OtpIssued, DomainError> {
        let student = self
            .students
            .find_student_by_email(email)
            .await?
            .filter(Student::can_sign_in)
            .ok_or_else(|| DomainError::NotFound(MSG_STUDENT_NOT_FOUND.to_string()))?;

        if !student.is_bound_to(device_id) {
            tracing::warn!(student_id = %student.id, "Login attempted from unbound device");
            return Err(DomainError::DeviceMismatch);
        }

        self.credentials
            .issue_login(email, Role::Student, Some(device_id))
            .await
    }

    /// Completes a student login and records the login time.
    pub async fn verify_student_login(
        &self,
        email: &str,
        otp: &str,
        device_id: &str,
    ) -> Result<Student, DomainError> {
        self.credentials
            .verify_login(email, otp, Role::Student, Some(device_id))
            .await?;

        // The binding may have changed between issuance and verification.
        let mut student = self
            .students
            .find_student_by_email(email)
            .await?
            .filter(|s| s.can_sign_in() && s.is_bound_to(device_id))
            .ok_or(DomainError::InvalidOtp)?;

        let now = Utc::now();
        self.students.record_student_login(student.id, now).await?;
        student.last_login_at = Some(now);

        tracing::info!(student_id = %student.id, "Student login successful");
        Ok(student)
    }

    /// Starts a teacher login.
    pub async fn authenticate_teacher_login(&self, email: &str) -> Result<OtpIssued, DomainError> {
        self.teachers
            .find_active_teacher_by_email(email)
            .await?
            .ok_or_else(|| DomainError::NotFound(MSG_TEACHER_NOT_FOUND.to_string()))?;

        self.credentials.issue_login(email, Role::Teacher, None).await
    }

    /// Completes a teacher login and records the login time.
    pub async fn verify_teacher_login(&self, email: &str, otp: &str) -> Result<Teacher, DomainError> {
        self.credentials
            .verify_login(email, otp, Role::Teacher, None)
            .await?;

        let mut teacher = self
            .teachers
            .find_active_teacher_by_email(email)
            .await?
            .ok_or(DomainError::InvalidOtp)?;

        let now = Utc::now();
        self.teachers.record_teacher_login(teacher.id, now).await?;
        teacher.last_login_at = Some(now);

        tracing::info!(teacher_id = %teacher.id, "Teacher login successful");
        Ok(teacher)
    }

    /// Loads the student behind a token and checks the token's device is
    /// still the bound one.
    pub async fn authorize_student(
        &self,
        student_id: Uuid,
        token_device_id: Option<&str>,
    ) -> Result<Student, DomainError> {
        let student = self
            .students
            .find_student_by_id(student_id)
            .await?
            .filter(Student::can_sign_in)
            .ok_or_else(|| DomainError::Unauthorized("Account not found or inactive".to_string()))?;

        match token_device_id {
            Some(device) if student.is_bound_to(device) => Ok(student),
            _ => Err(DomainError::Unauthorized(
                "Token was issued for a device that is no longer bound to this account".to_string(),
            )),
        }
    }

    /// Loads the active teacher behind a token.
    pub async fn authorize_teacher(&self, teacher_id: Uuid) -> Result<Teacher, DomainError> {
        self.teachers
            .find_teacher_by_id(teacher_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or_else(|| DomainError::Unauthorized("Account not found or inactive".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::services::credential::OtpSettings;
    use crate::services::notification::MockOtpNotifier;

    struct Fixture {
        store: Arc<InMemoryStore>,
        notifier: Arc<MockOtpNotifier>,
        identity: IdentityService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(MockOtpNotifier::new());
        let stores = store.clone().stores();
        let credentials = CredentialService::new(
            stores.credentials.clone(),
            notifier.clone(),
            OtpSettings::default(),
        );
        Fixture {
            identity: IdentityService::new(&stores, credentials),
            store,
            notifier,
        }
    }

    fn registration(email: &str, enrollment: &str, device: &str) -> RegisterStudentRequest {
        RegisterStudentRequest {
            full_name: "Asha Rao".into(),
            email: email.into(),
            enrollment_number: enrollment.into(),
            branch: "CSE".into(),
            year: 3,
            device_id: device.into(),
        }
    }

    async fn register(f: &Fixture, email: &str, enrollment: &str, device: &str) -> Student {
        f.identity
            .register_student(&registration(email, enrollment, device))
            .await
            .unwrap();
        let code = f.notifier.last_code_for(email).unwrap();
        f.identity.verify_registration(email, &code).await.unwrap()
    }

    #[tokio::test]
    async fn test_register_and_login_flow() {
        let f = fixture();
        let student = register(&f, "asha@example.edu", "CS001", "dev-1").await;
        assert_eq!(student.email, "asha@example.edu");

        f.identity
            .authenticate_student_login("asha@example.edu", "dev-1")
            .await
            .unwrap();
        let code = f.notifier.last_code_for("asha@example.edu").unwrap();
        let logged_in = f
            .identity
            .verify_student_login("asha@example.edu", &code, "dev-1")
            .await
            .unwrap();

        assert_eq!(logged_in.id, student.id);
        assert!(logged_in.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_device_rejected() {
        let f = fixture();
        register(&f, "first@example.edu", "CS001", "shared-device").await;

        let result = f
            .identity
            .register_student(&registration("second@example.edu", "CS002", "shared-device"))
            .await;
        match result {
            Err(DomainError::Duplicate(msg)) => assert_eq!(msg, MSG_DUPLICATE_DEVICE),
            other => panic!("expected Duplicate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_or_enrollment_rejected() {
        let f = fixture();
        register(&f, "first@example.edu", "CS001", "dev-1").await;

        for request in [
            registration("first@example.edu", "CS999", "dev-2"),
            registration("other@example.edu", "CS001", "dev-3"),
        ] {
            match f.identity.register_student(&request).await {
                Err(DomainError::Duplicate(msg)) => assert_eq!(msg, MSG_DUPLICATE_IDENTITY),
                other => panic!("expected Duplicate, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_pending_registrations_for_same_device() {
        // Both pass the pre-checks; the second promotion hits the unique device.
        let f = fixture();
        f.identity
            .register_student(&registration("a@example.edu", "CS001", "dev-x"))
            .await
            .unwrap();
        let code_a = f.notifier.last_code_for("a@example.edu").unwrap();
        f.identity
            .register_student(&registration("b@example.edu", "CS002", "dev-x"))
            .await
            .unwrap();
        let code_b = f.notifier.last_code_for("b@example.edu").unwrap();

        f.identity
            .verify_registration("a@example.edu", &code_a)
            .await
            .unwrap();
        match f.identity.verify_registration("b@example.edu", &code_b).await {
            Err(DomainError::Duplicate(msg)) => assert_eq!(msg, MSG_DUPLICATE_DEVICE),
            other => panic!("expected Duplicate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_not_found_distinct_from_device_mismatch() {
        let f = fixture();
        register(&f, "asha@example.edu", "CS001", "dev-1").await;

        let unknown = f
            .identity
            .authenticate_student_login("nobody@example.edu", "dev-1")
            .await;
        assert!(matches!(unknown, Err(DomainError::NotFound(_))));

        let mismatch = f
            .identity
            .authenticate_student_login("asha@example.edu", "dev-2")
            .await;
        assert!(matches!(mismatch, Err(DomainError::DeviceMismatch)));
        assert_ne!(
            unknown.unwrap_err().to_string(),
            mismatch.unwrap_err().to_string()
        );
    }

    #[tokio::test]
    async fn test_student_login_code_requires_same_device() {
        let f = fixture();
        register(&f, "asha@example.edu", "CS001", "dev-1").await;
        f.identity
            .authenticate_student_login("asha@example.edu", "dev-1")
            .await
            .unwrap();
        let code = f.notifier.last_code_for("asha@example.edu").unwrap();

        assert!(matches!(
            f.identity
                .verify_student_login("asha@example.edu", &code, "dev-2")
                .await,
            Err(DomainError::InvalidOtp)
        ));
    }

    #[tokio::test]
    async fn test_teacher_login() {
        let f = fixture();
        let teacher = f.store.add_teacher("Dr. Iyer", "iyer@example.edu", "CSE", "EMP01");

        f.identity
            .authenticate_teacher_login("iyer@example.edu")
            .await
            .unwrap();
        let code = f.notifier.last_code_for("iyer@example.edu").unwrap();
        let verified = f
            .identity
            .verify_teacher_login("iyer@example.edu", &code)
            .await
            .unwrap();
        assert_eq!(verified.id, teacher.id);
        assert!(verified.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_inactive_teacher_cannot_login() {
        let f = fixture();
        let teacher = f.store.add_teacher("Dr. Iyer", "iyer@example.edu", "CSE", "EMP01");
        f.store.set_teacher_active(teacher.id, false);

        match f.identity.authenticate_teacher_login("iyer@example.edu").await {
            Err(DomainError::NotFound(msg)) => assert_eq!(msg, MSG_TEACHER_NOT_FOUND),
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_authorize_student_checks_bound_device() {
        let f = fixture();
        let student = register(&f, "asha@example.edu", "CS001", "dev-1").await;

        assert!(f
            .identity
            .authorize_student(student.id, Some("dev-1"))
            .await
            .is_ok());
        assert!(matches!(
            f.identity.authorize_student(student.id, Some("dev-2")).await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            f.identity.authorize_student(student.id, None).await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            f.identity.authorize_student(Uuid::new_v4(), Some("dev-1")).await,
            Err(DomainError::Unauthorized(_))
        ));
    }
}
