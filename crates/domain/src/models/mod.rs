//! Domain models.

pub mod account;
pub mod attendance;
pub mod device_change;
pub mod otp;
pub mod session;
pub mod subject;

pub use account::{
    OtpSentResponse, RegisterStudentRequest, Student, StudentAuthResponse, StudentLoginRequest,
    StudentProfile, Teacher, TeacherAuthResponse, TeacherLoginRequest, TeacherProfile,
    VerifyRegistrationRequest, VerifyStudentLoginRequest, VerifyTeacherLoginRequest,
};
pub use attendance::{
    round_distance, AttendanceRecord, AttendanceReport, AttendanceStats, MarkAttendanceRequest,
    MarkAttendanceResponse, NewAttendanceRecord, ReportEntry, StudentAttendanceEntry,
    StudentAttendanceResponse,
};
pub use device_change::{
    CreateDeviceChangeRequest, DeviceChangeRequest, DeviceChangeResponse, DeviceChangeReview,
    DeviceChangeStatus, ListDeviceChangesResponse, NewDeviceChangeRequest,
    ReviewDeviceChangeRequest,
};
pub use otp::{LoginOtp, OtpIssued, OtpPurpose, PendingRegistration};
pub use session::{
    session_reference, ActiveSessionSummary, ActiveSessionsResponse, AttendanceSession,
    CreatedSession, GenerateQrRequest, GenerateQrResponse, NewSession, QrPayload,
    QrPayloadError, SessionState,
};
pub use subject::{ListSubjectsResponse, Subject};
