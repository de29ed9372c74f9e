//! Persistence layer for the attendance service.
//!
//! This crate contains:
//! - Database connection management and embedded migrations
//! - Entity definitions (database row mappings)
//! - PostgreSQL implementations of the domain store traits

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

use domain::store::Stores;
use sqlx::PgPool;
use std::sync::Arc;

use repositories::{
    AttendanceRepository, CredentialRepository, DeviceChangeRepository, HealthRepository,
    SessionRepository, StudentRepository, SubjectRepository, TeacherRepository,
};

/// Builds the store bundle backed by the given pool.
pub fn pg_stores(pool: PgPool) -> Stores {
    Stores {
        credentials: Arc::new(CredentialRepository::new(pool.clone())),
        students: Arc::new(StudentRepository::new(pool.clone())),
        teachers: Arc::new(TeacherRepository::new(pool.clone())),
        subjects: Arc::new(SubjectRepository::new(pool.clone())),
        sessions: Arc::new(SessionRepository::new(pool.clone())),
        attendance: Arc::new(AttendanceRepository::new(pool.clone())),
        device_changes: Arc::new(DeviceChangeRepository::new(pool.clone())),
        health: Arc::new(HealthRepository::new(pool)),
    }
}
