//! Custom Axum extractors.

pub mod auth;
pub mod json;

pub use auth::{StudentAuth, TeacherAuth};
pub use json::ApiJson;
