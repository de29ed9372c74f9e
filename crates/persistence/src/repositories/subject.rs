//! Subject repository.

use async_trait::async_trait;
use domain::models::Subject;
use domain::store::{StoreResult, SubjectStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::SubjectEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct SubjectRepository {
    pool: PgPool,
}

impl SubjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubjectStore for SubjectRepository {
    async fn list_subjects_for_teacher(&self, teacher_id: Uuid) -> StoreResult<Vec<Subject>> {
        let timer = QueryTimer::new("list_subjects_for_teacher");
        let result = sqlx::query_as::<_, SubjectEntity>(
            r#"
            SELECT s.id, s.subject_name, s.subject_code, s.department, s.semester, s.credits
            FROM subjects s
            JOIN teacher_subjects ts ON ts.subject_id = s.id
            WHERE ts.teacher_id = $1
            ORDER BY s.subject_name
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn find_assigned_subject(
        &self,
        teacher_id: Uuid,
        subject_id: Uuid,
    ) -> StoreResult<Option<Subject>> {
        let timer = QueryTimer::new("find_assigned_subject");
        let result = sqlx::query_as::<_, SubjectEntity>(
            r#"
            SELECT s.id, s.subject_name, s.subject_code, s.department, s.semester, s.credits
            FROM subjects s
            JOIN teacher_subjects ts ON ts.subject_id = s.id
            WHERE ts.teacher_id = $1 AND s.id = $2
            "#,
        )
        .bind(teacher_id)
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.map(Into::into))
    }
}
