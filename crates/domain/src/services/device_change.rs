//! Device change requests and their administrative review.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DomainError, MSG_DUPLICATE_DEVICE};
use crate::models::{
    CreateDeviceChangeRequest, DeviceChangeRequest, DeviceChangeReview, DeviceChangeStatus,
    NewDeviceChangeRequest, ReviewDeviceChangeRequest,
};
use crate::store::{DeviceChangeStore, StoreError, Stores, StudentStore};

const MSG_ALREADY_PENDING: &str = "A device change request is already pending for this account";
const MSG_ALREADY_REVIEWED: &str = "Device change request has already been reviewed";
const MSG_REQUEST_NOT_FOUND: &str = "Device change request not found";

#[derive(Clone)]
pub struct DeviceChangeService {
    students: Arc<dyn StudentStore>,
    requests: Arc<dyn DeviceChangeStore>,
}

impl DeviceChangeService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            students: stores.students.clone(),
            requests: stores.device_changes.clone(),
        }
    }

    /// Files a pending request to move the student's binding to a new device.
    pub async fn request_change(
        &self,
        student_id: Uuid,
        request: &CreateDeviceChangeRequest,
    ) -> Result<DeviceChangeRequest, DomainError> {
        let student = self
            .students
            .find_student_by_id(student_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Student not found".to_string()))?;

        if student.is_bound_to(&request.new_device_id) {
            return Err(DomainError::Validation(
                "New device ID must differ from the current device".to_string(),
            ));
        }

        if self
            .students
            .find_student_by_device(&request.new_device_id)
            .await?
            .is_some()
        {
            return Err(DomainError::Duplicate(MSG_DUPLICATE_DEVICE.to_string()));
        }

        if self
            .requests
            .find_pending_device_change(student_id)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(MSG_ALREADY_PENDING.to_string()));
        }

        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let created = self
            .requests
            .create_device_change(NewDeviceChangeRequest {
                student_id,
                current_device_id: student.device_id.clone(),
                new_device_id: request.new_device_id.clone(),
                reason,
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    DomainError::Conflict(MSG_ALREADY_PENDING.to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(
            student_id = %student_id,
            request_id = %created.id,
            "Device change requested"
        );
        Ok(created)
    }

    pub async fn list_pending(&self) -> Result<Vec<DeviceChangeRequest>, DomainError> {
        Ok(self.requests.list_pending_device_changes().await?)
    }

    /// Approves a pending request and rebinds the student's device.
    pub async fn approve(
        &self,
        id: Uuid,
        review: &ReviewDeviceChangeRequest,
    ) -> Result<DeviceChangeRequest, DomainError> {
        let existing = self.pending_request(id).await?;

        if let Some(holder) = self
            .students
            .find_student_by_device(&existing.new_device_id)
            .await?
        {
            if holder.id != existing.student_id {
                return Err(DomainError::Duplicate(MSG_DUPLICATE_DEVICE.to_string()));
            }
        }

        let approved = self
            .requests
            .approve_device_change(id, Self::review(review))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    DomainError::Duplicate(MSG_DUPLICATE_DEVICE.to_string())
                }
                other => other.into(),
            })?
            .ok_or_else(|| DomainError::Conflict(MSG_ALREADY_REVIEWED.to_string()))?;

        tracing::info!(
            request_id = %id,
            student_id = %approved.student_id,
            "Device change approved"
        );
        Ok(approved)
    }

    /// Rejects a pending request. The binding is left unchanged.
    pub async fn reject(
        &self,
        id: Uuid,
        review: &ReviewDeviceChangeRequest,
    ) -> Result<DeviceChangeRequest, DomainError> {
        self.pending_request(id).await?;

        let rejected = self
            .requests
            .reject_device_change(id, Self::review(review))
            .await?
            .ok_or_else(|| DomainError::Conflict(MSG_ALREADY_REVIEWED.to_string()))?;

        tracing::info!(
            request_id = %id,
            student_id = %rejected.student_id,
            "Device change rejected"
        );
        Ok(rejected)
    }

    async fn pending_request(&self, id: Uuid) -> Result<DeviceChangeRequest, DomainError> {
        let request = self
            .requests
            .find_device_change(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(MSG_REQUEST_NOT_FOUND.to_string()))?;

        if request.status != DeviceChangeStatus::Pending {
            return Err(DomainError::Conflict(MSG_ALREADY_REVIEWED.to_string()));
        }
        Ok(request)
    }

    fn review(review: &ReviewDeviceChangeRequest) -> DeviceChangeReview {
        DeviceChangeReview {
            reviewed_by: review.reviewed_by.clone(),
            note: review.note.clone(),
            reviewed_at: Utc::now(),
        }
    }
}
