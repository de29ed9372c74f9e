//! Student repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::Student;
use domain::store::{StoreResult, StudentStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::StudentEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

const STUDENT_COLUMNS: &str = "id, full_name, email, enrollment_number, branch, year, device_id, \
                               is_verified, is_active, last_login_at, created_at";

#[derive(Clone)]
pub struct StudentRepository {
    pool: PgPool,
}

impl StudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        query_name: &'static str,
        filter: &str,
        value: &str,
    ) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {} FROM students WHERE {}", STUDENT_COLUMNS, filter);
        let timer = QueryTimer::new(query_name);
        let result = sqlx::query_as::<_, StudentEntity>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result.map_err(store_error)?.map(Into::into))
    }
}

#[async_trait]
impl StudentStore for StudentRepository {
    async fn find_student_by_id(&self, id: Uuid) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
        let timer = QueryTimer::new("find_student_by_id");
        let result = sqlx::query_as::<_, StudentEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result.map_err(store_error)?.map(Into::into))
    }

    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>> {
        self.find_one("find_student_by_email", "email = $1", email)
            .await
    }

    async fn find_student_by_device(&self, device_id: &str) -> StoreResult<Option<Student>> {
        self.find_one(
            "find_student_by_device",
            "device_id = $1 AND is_verified",
            device_id,
        )
        .await
    }

    async fn identity_taken(&self, email: &str, enrollment_number: &str) -> StoreResult<bool> {
        let timer = QueryTimer::new("student_identity_taken");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM students
                WHERE is_verified AND (email = $1 OR enrollment_number = $2)
            )
            "#,
        )
        .bind(email)
        .bind(enrollment_number)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)
    }

    async fn record_student_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let timer = QueryTimer::new("record_student_login");
        let result = sqlx::query("UPDATE students SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await;
        timer.record();
        result.map_err(store_error)?;
        Ok(())
    }
}
