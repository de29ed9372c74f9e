//! Shared utilities and common types for the attendance backend.
//!
//! This crate provides common functionality used across all other crates:
//! - One-time passcode and session token generation, digest hashing
//! - Signed access tokens (JWT)
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod validation;
