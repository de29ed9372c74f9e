//! Domain layer for the attendance service.
//!
//! This crate contains:
//! - Domain models (accounts, OTP records, QR sessions, attendance)
//! - Store traits implemented by the persistence layer
//! - Business logic services
//! - Domain error types
//! - An in-memory store used by tests and local runs

pub mod error;
pub mod memory;
pub mod models;
pub mod services;
pub mod store;

pub use error::DomainError;
