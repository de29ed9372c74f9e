//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod attendance;
pub mod device_change_request;
pub mod pending_registration;
pub mod qr_session;
pub mod student;
pub mod subject;
pub mod teacher;

pub use attendance::{AttendanceEntity, ReportRow, StudentHistoryRow};
pub use device_change_request::DeviceChangeRequestEntity;
pub use pending_registration::PendingRegistrationEntity;
pub use qr_session::{ActiveSessionRow, QrSessionEntity};
pub use student::StudentEntity;
pub use subject::SubjectEntity;
pub use teacher::TeacherEntity;
