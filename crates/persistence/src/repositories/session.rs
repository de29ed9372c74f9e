//! QR session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{ActiveSessionSummary, AttendanceSession, NewSession};
use domain::store::{SessionStore, StoreResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ActiveSessionRow, QrSessionEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create_superseding(&self, session: NewSession) -> StoreResult<AttendanceSession> {
        let timer = QueryTimer::new("create_superseding_session");
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // Serializes concurrent creations for the same pair on the assignment row.
        sqlx::query(
            "SELECT 1 FROM teacher_subjects WHERE teacher_id = $1 AND subject_id = $2 FOR UPDATE",
        )
        .bind(session.teacher_id)
        .bind(session.subject_id)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        let superseded = sqlx::query(
            r#"
            UPDATE qr_sessions
            SET is_active = FALSE
            WHERE teacher_id = $1 AND subject_id = $2 AND is_active
            "#,
        )
        .bind(session.teacher_id)
        .bind(session.subject_id)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?
        .rows_affected();

        let created = sqlx::query_as::<_, QrSessionEntity>(
            r#"
            INSERT INTO qr_sessions
                (session_id, teacher_id, subject_id, latitude, longitude, created_at, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            RETURNING id, session_id, teacher_id, subject_id, latitude, longitude, created_at, expires_at, is_active
            "#,
        )
        .bind(&session.session_id)
        .bind(session.teacher_id)
        .bind(session.subject_id)
        .bind(session.latitude)
        .bind(session.longitude)
        .bind(session.created_at)
        .bind(session.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        timer.record();

        if superseded > 0 {
            tracing::debug!(
                teacher_id = %session.teacher_id,
                subject_id = %session.subject_id,
                superseded,
                "Deactivated previous sessions"
            );
        }
        Ok(created.into())
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<AttendanceSession>> {
        let timer = QueryTimer::new("find_session");
        let result = sqlx::query_as::<_, QrSessionEntity>(
            r#"
            SELECT id, session_id, teacher_id, subject_id, latitude, longitude, created_at, expires_at, is_active
            FROM qr_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.map(Into::into))
    }

    async fn list_active_sessions(
        &self,
        teacher_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<ActiveSessionSummary>> {
        let timer = QueryTimer::new("list_active_sessions");
        let result = sqlx::query_as::<_, ActiveSessionRow>(
            r#"
            SELECT s.id, s.session_id, s.subject_id, sub.subject_name, sub.subject_code,
                   s.created_at, s.expires_at, COUNT(a.id) AS student_count
            FROM qr_sessions s
            JOIN subjects sub ON sub.id = s.subject_id
            LEFT JOIN attendance a ON a.session_id = s.id
            WHERE s.teacher_id = $1 AND s.is_active AND s.expires_at > $2
            GROUP BY s.id, sub.id
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(teacher_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn count_sessions(&self, teacher_id: Uuid, subject_id: Uuid) -> StoreResult<i64> {
        let timer = QueryTimer::new("count_sessions");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM qr_sessions WHERE teacher_id = $1 AND subject_id = $2",
        )
        .bind(teacher_id)
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)
    }
}
