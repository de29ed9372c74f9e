//! Subject reference data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A subject taught by one or more teachers. Managed outside this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Subject {
    pub id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub department: String,
    pub semester: i32,
    pub credits: i32,
}

/// Response for listing a teacher's subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubjectsResponse {
    pub subjects: Vec<Subject>,
}
