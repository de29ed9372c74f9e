//! Device change request repository.

use async_trait::async_trait;
use domain::models::{DeviceChangeRequest, DeviceChangeReview, NewDeviceChangeRequest};
use domain::store::{DeviceChangeStore, StoreError, StoreResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::DeviceChangeRequestEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

const REQUEST_COLUMNS: &str = "id, student_id, current_device_id, new_device_id, reason, status, \
                               reviewed_by, review_note, created_at, reviewed_at";

fn to_domain(entity: DeviceChangeRequestEntity) -> StoreResult<DeviceChangeRequest> {
    DeviceChangeRequest::try_from(entity).map_err(StoreError::Other)
}

#[derive(Clone)]
pub struct DeviceChangeRepository {
    pool: PgPool,
}

impl DeviceChangeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn review(
        &self,
        query_name: &'static str,
        id: Uuid,
        status: &str,
        review: &DeviceChangeReview,
        rebind_device: bool,
    ) -> StoreResult<Option<DeviceChangeRequest>> {
        let timer = QueryTimer::new(query_name);
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let sql = format!(
            "SELECT {} FROM device_change_requests WHERE id = $1 AND status = 'pending' FOR UPDATE",
            REQUEST_COLUMNS
        );
        let pending = sqlx::query_as::<_, DeviceChangeRequestEntity>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_error)?;

        let Some(pending) = pending else {
            timer.record();
            return Ok(None);
        };

        if rebind_device {
            sqlx::query("UPDATE students SET device_id = $2 WHERE id = $1")
                .bind(pending.student_id)
                .bind(&pending.new_device_id)
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;
        }

        let sql = format!(
            r#"
            UPDATE device_change_requests
            SET status = $2, reviewed_by = $3, review_note = $4, reviewed_at = $5
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );
        let updated = sqlx::query_as::<_, DeviceChangeRequestEntity>(&sql)
            .bind(id)
            .bind(status)
            .bind(&review.reviewed_by)
            .bind(&review.note)
            .bind(review.reviewed_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        timer.record();
        to_domain(updated).map(Some)
    }
}

#[async_trait]
impl DeviceChangeStore for DeviceChangeRepository {
    async fn create_device_change(
        &self,
        request: NewDeviceChangeRequest,
    ) -> StoreResult<DeviceChangeRequest> {
        let sql = format!(
            r#"
            INSERT INTO device_change_requests
                (student_id, current_device_id, new_device_id, reason, status, created_at)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );
        let timer = QueryTimer::new("create_device_change");
        let result = sqlx::query_as::<_, DeviceChangeRequestEntity>(&sql)
            .bind(request.student_id)
            .bind(&request.current_device_id)
            .bind(&request.new_device_id)
            .bind(&request.reason)
            .bind(request.created_at)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        to_domain(result.map_err(store_error)?)
    }

    async fn find_device_change(&self, id: Uuid) -> StoreResult<Option<DeviceChangeRequest>> {
        let sql = format!(
            "SELECT {} FROM device_change_requests WHERE id = $1",
            REQUEST_COLUMNS
        );
        let timer = QueryTimer::new("find_device_change");
        let result = sqlx::query_as::<_, DeviceChangeRequestEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result.map_err(store_error)?.map(to_domain).transpose()
    }

    async fn find_pending_device_change(
        &self,
        student_id: Uuid,
    ) -> StoreResult<Option<DeviceChangeRequest>> {
        let sql = format!(
            "SELECT {} FROM device_change_requests WHERE student_id = $1 AND status = 'pending'",
            REQUEST_COLUMNS
        );
        let timer = QueryTimer::new("find_pending_device_change");
        let result = sqlx::query_as::<_, DeviceChangeRequestEntity>(&sql)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result.map_err(store_error)?.map(to_domain).transpose()
    }

    async fn list_pending_device_changes(&self) -> StoreResult<Vec<DeviceChangeRequest>> {
        let sql = format!(
            "SELECT {} FROM device_change_requests WHERE status = 'pending' ORDER BY created_at ASC",
            REQUEST_COLUMNS
        );
        let timer = QueryTimer::new("list_pending_device_changes");
        let result = sqlx::query_as::<_, DeviceChangeRequestEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
            .map_err(store_error)?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn approve_device_change(
        &self,
        id: Uuid,
        review: DeviceChangeReview,
    ) -> StoreResult<Option<DeviceChangeRequest>> {
        self.review("approve_device_change", id, "approved", &review, true)
            .await
    }

    async fn reject_device_change(
        &self,
        id: Uuid,
        review: DeviceChangeReview,
    ) -> StoreResult<Option<DeviceChangeRequest>> {
        self.review("reject_device_change", id, "rejected", &review, false)
            .await
    }
}
