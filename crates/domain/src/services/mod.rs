//! Domain services for the attendance service.
//!
//! Services contain business logic that operates on domain models through
//! the store traits.

pub mod attendance;
pub mod credential;
pub mod device_change;
pub mod identity;
pub mod notification;
pub mod proximity;
pub mod session;

pub use attendance::AttendanceService;
pub use credential::{CredentialService, OtpSettings};
pub use device_change::DeviceChangeService;
pub use identity::IdentityService;
pub use notification::{MockOtpNotifier, NotificationResult, OtpMessage, OtpNotifier};
pub use proximity::{
    distance_meters, Proximity, ProximityValidator, DEFAULT_MAX_DISTANCE_METERS,
    EARTH_RADIUS_METERS,
};
pub use session::{SessionService, DEFAULT_SESSION_VALIDITY_SECS};
