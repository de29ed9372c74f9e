//! One-time passcode repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{LoginOtp, PendingRegistration, Student};
use domain::store::{CredentialStore, StoreResult};
use shared::jwt::Role;
use sqlx::PgPool;

use crate::entities::{PendingRegistrationEntity, StudentEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for pending registrations and login passcodes.
#[derive(Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for CredentialRepository {
    async fn upsert_pending_registration(&self, pending: PendingRegistration) -> StoreResult<()> {
        let timer = QueryTimer::new("upsert_pending_registration");
        let result = sqlx::query(
            r#"
            INSERT INTO pending_registrations
                (email, full_name, enrollment_number, branch, year, device_id, otp_hash, otp_expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (email) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                enrollment_number = EXCLUDED.enrollment_number,
                branch = EXCLUDED.branch,
                year = EXCLUDED.year,
                device_id = EXCLUDED.device_id,
                otp_hash = EXCLUDED.otp_hash,
                otp_expires_at = EXCLUDED.otp_expires_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&pending.email)
        .bind(&pending.full_name)
        .bind(&pending.enrollment_number)
        .bind(&pending.branch)
        .bind(pending.year)
        .bind(&pending.device_id)
        .bind(&pending.otp_hash)
        .bind(pending.otp_expires_at)
        .bind(pending.created_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)?;
        Ok(())
    }

    async fn find_pending_registration(
        &self,
        email: &str,
    ) -> StoreResult<Option<PendingRegistration>> {
        let timer = QueryTimer::new("find_pending_registration");
        let result = sqlx::query_as::<_, PendingRegistrationEntity>(
            r#"
            SELECT email, full_name, enrollment_number, branch, year, device_id, otp_hash, otp_expires_at, created_at
            FROM pending_registrations
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.map(Into::into))
    }

    async fn promote_registration(
        &self,
        email: &str,
        otp_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Student>> {
        let timer = QueryTimer::new("promote_registration");

        // Dropping the transaction on error rolls back the delete, so a clash
        // with an existing student leaves the pending row in place.
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let pending = sqlx::query_as::<_, PendingRegistrationEntity>(
            r#"
            DELETE FROM pending_registrations
            WHERE email = $1 AND otp_hash = $2 AND otp_expires_at > $3
            RETURNING email, full_name, enrollment_number, branch, year, device_id, otp_hash, otp_expires_at, created_at
            "#,
        )
        .bind(email)
        .bind(otp_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error)?;

        let Some(pending) = pending else {
            timer.record();
            return Ok(None);
        };

        let student = sqlx::query_as::<_, StudentEntity>(
            r#"
            INSERT INTO students
                (full_name, email, enrollment_number, branch, year, device_id, is_verified, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, TRUE, $7)
            RETURNING id, full_name, email, enrollment_number, branch, year, device_id,
                      is_verified, is_active, last_login_at, created_at
            "#,
        )
        .bind(&pending.full_name)
        .bind(&pending.email)
        .bind(&pending.enrollment_number)
        .bind(&pending.branch)
        .bind(pending.year)
        .bind(&pending.device_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        timer.record();
        Ok(Some(student.into()))
    }

    async fn upsert_login_otp(&self, otp: LoginOtp) -> StoreResult<()> {
        let timer = QueryTimer::new("upsert_login_otp");
        let result = sqlx::query(
            r#"
            INSERT INTO login_otps (email, user_type, otp_hash, expires_at, device_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email, user_type) DO UPDATE SET
                otp_hash = EXCLUDED.otp_hash,
                expires_at = EXCLUDED.expires_at,
                device_id = EXCLUDED.device_id,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&otp.email)
        .bind(otp.user_type.as_str())
        .bind(&otp.otp_hash)
        .bind(otp.expires_at)
        .bind(&otp.device_id)
        .bind(otp.created_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)?;
        Ok(())
    }

    async fn consume_login_otp(
        &self,
        email: &str,
        user_type: Role,
        otp_hash: &str,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let timer = QueryTimer::new("consume_login_otp");
        let result = sqlx::query(
            r#"
            DELETE FROM login_otps
            WHERE email = $1
              AND user_type = $2
              AND otp_hash = $3
              AND expires_at > $4
              AND ($5::VARCHAR IS NULL OR device_id = $5)
            "#,
        )
        .bind(email)
        .bind(user_type.as_str())
        .bind(otp_hash)
        .bind(now)
        .bind(device_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let timer = QueryTimer::new("purge_expired_otps");
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let registrations = sqlx::query("DELETE FROM pending_registrations WHERE otp_expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?
            .rows_affected();

        let logins = sqlx::query("DELETE FROM login_otps WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?
            .rows_affected();

        tx.commit().await.map_err(store_error)?;
        timer.record();
        Ok(registrations + logins)
    }
}
