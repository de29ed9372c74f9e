//! Repository implementations for database operations.
//!
//! Each repository implements one domain store trait over a shared pool.

pub mod attendance;
pub mod credential;
pub mod device_change;
pub mod health;
pub mod session;
pub mod student;
pub mod subject;
pub mod teacher;

pub use attendance::AttendanceRepository;
pub use credential::CredentialRepository;
pub use device_change::DeviceChangeRepository;
pub use health::HealthRepository;
pub use session::SessionRepository;
pub use student::StudentRepository;
pub use subject::SubjectRepository;
pub use teacher::TeacherRepository;
