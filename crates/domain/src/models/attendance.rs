//! Attendance ledger models and report statistics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use super::subject::Subject;

/// A recorded attendance. Unique per (student, session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    /// Internal id of the session row, not the public session id.
    pub session_id: Uuid,
    pub student_latitude: f64,
    pub student_longitude: f64,
    pub distance_meters: f64,
    pub is_valid: bool,
    pub marked_at: DateTime<Utc>,
}

/// Input for inserting an attendance record.
#[derive(Debug, Clone)]
pub struct NewAttendanceRecord {
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub session_id: Uuid,
    pub student_latitude: f64,
    pub student_longitude: f64,
    pub distance_meters: f64,
    pub marked_at: DateTime<Utc>,
}

/// Request payload for marking attendance.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    /// Either the bare session id or the scanned QR payload.
    #[validate(length(min = 1, max = 4096, message = "Session ID is required"))]
    pub session_id: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
}

/// Rounds a distance to two decimals for display.
pub fn round_distance(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

/// Response after attendance was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    pub message: String,
    pub distance: f64,
    pub marked_at: DateTime<Utc>,
}

impl From<&AttendanceRecord> for MarkAttendanceResponse {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            message: "Attendance marked successfully".to_string(),
            distance: round_distance(record.distance_meters),
            marked_at: record.marked_at,
        }
    }
}

/// One row of a teacher's subject report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub full_name: String,
    pub enrollment_number: String,
    pub email: String,
    pub marked_at: DateTime<Utc>,
    pub distance_from_teacher: f64,
    pub subject_name: String,
    pub subject_code: String,
}

/// One row of a student's own attendance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StudentAttendanceEntry {
    pub id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub teacher_name: String,
    pub marked_at: DateTime<Utc>,
    pub distance_from_teacher: f64,
    pub attendance_date: NaiveDate,
}

/// Aggregate statistics for a (teacher, subject) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttendanceStats {
    pub total_students: i64,
    pub total_classes: i64,
    pub total_attendance: i64,
    pub average_attendance: i64,
}

impl AttendanceStats {
    /// `average = round(attendance / (students * classes) * 100)`, 0 when a factor is 0.
    pub fn from_counts(total_classes: i64, total_attendance: i64, total_students: i64) -> Self {
        let average_attendance = if total_students > 0 && total_classes > 0 {
            let ratio = total_attendance as f64 / (total_students * total_classes) as f64;
            (ratio * 100.0).round() as i64
        } else {
            0
        };

        Self {
            total_students,
            total_classes,
            total_attendance,
            average_attendance,
        }
    }

    /// Computes stats from report entries.
    pub fn compute(total_classes: i64, entries: &[ReportEntry]) -> Self {
        let students: HashSet<Uuid> = entries.iter().map(|e| e.student_id).collect();
        Self::from_counts(total_classes, entries.len() as i64, students.len() as i64)
    }
}

/// Report returned to a teacher for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub attendance: Vec<ReportEntry>,
    pub stats: AttendanceStats,
    pub subject: Subject,
}

/// Response for a student's attendance history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceResponse {
    pub attendance: Vec<StudentAttendanceEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(student_id: Uuid) -> ReportEntry {
        ReportEntry {
            id: Uuid::new_v4(),
            student_id,
            full_name: "Student".into(),
            enrollment_number: "E1".into(),
            email: "s@example.edu".into(),
            marked_at: Utc::now(),
            distance_from_teacher: 3.0,
            subject_name: "Algorithms".into(),
            subject_code: "CS301".into(),
        }
    }

    #[test]
    fn test_stats_worked_example() {
        // Session 1: three students. Session 2: two of them.
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let entries = vec![entry(a), entry(b), entry(c), entry(a), entry(b)];

        let stats = AttendanceStats::compute(2, &entries);
        assert_eq!(stats.total_classes, 2);
        assert_eq!(stats.total_students, 3);
        assert_eq!(stats.total_attendance, 5);
        assert_eq!(stats.average_attendance, 83);
    }

    #[test]
    fn test_stats_zero_classes() {
        let stats = AttendanceStats::from_counts(0, 0, 0);
        assert_eq!(stats.average_attendance, 0);
    }

    #[test]
    fn test_stats_classes_without_attendance() {
        let stats = AttendanceStats::compute(4, &[]);
        assert_eq!(stats.total_classes, 4);
        assert_eq!(stats.total_students, 0);
        assert_eq!(stats.average_attendance, 0);
    }

    #[test]
    fn test_stats_full_attendance() {
        let stats = AttendanceStats::from_counts(3, 6, 2);
        assert_eq!(stats.average_attendance, 100);
    }

    #[test]
    fn test_stats_serialize_snake_case() {
        let value = serde_json::to_value(AttendanceStats::from_counts(2, 5, 3)).unwrap();
        assert_eq!(value["total_classes"], 2);
        assert_eq!(value["total_students"], 3);
        assert_eq!(value["total_attendance"], 5);
        assert_eq!(value["average_attendance"], 83);
        assert!(value.get("totalClasses").is_none());
    }

    #[test]
    fn test_round_distance() {
        assert_eq!(round_distance(7.0449), 7.04);
        assert_eq!(round_distance(7.045001), 7.05);
        assert_eq!(round_distance(0.0), 0.0);
    }
}
