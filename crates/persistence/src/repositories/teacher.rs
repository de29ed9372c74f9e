//! Teacher repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::Teacher;
use domain::store::{StoreResult, TeacherStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::TeacherEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct TeacherRepository {
    pool: PgPool,
}

impl TeacherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeacherStore for TeacherRepository {
    async fn find_teacher_by_id(&self, id: Uuid) -> StoreResult<Option<Teacher>> {
        let timer = QueryTimer::new("find_teacher_by_id");
        let result = sqlx::query_as::<_, TeacherEntity>(
            r#"
            SELECT id, full_name, email, department, employee_id, is_active, last_login_at, created_at
            FROM teachers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.map(Into::into))
    }

    async fn find_active_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>> {
        let timer = QueryTimer::new("find_active_teacher_by_email");
        let result = sqlx::query_as::<_, TeacherEntity>(
            r#"
            SELECT id, full_name, email, department, employee_id, is_active, last_login_at, created_at
            FROM teachers
            WHERE email = $1 AND is_active
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.map(Into::into))
    }

    async fn record_teacher_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let timer = QueryTimer::new("record_teacher_login");
        let result = sqlx::query("UPDATE teachers SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await;
        timer.record();
        result.map_err(store_error)?;
        Ok(())
    }
}
