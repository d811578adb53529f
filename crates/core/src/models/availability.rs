use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorAvailability {
    pub instructor_id: Uuid,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorAbsence {
    pub instructor_id: Uuid,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub exclude_booked_slots: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsResponse {
    pub instructor_id: Uuid,
    pub slots: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbsenceAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceChange {
    pub date_time: DateTime<Utc>,
    pub action: AbsenceAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAbsenceRequest {
    pub changes: Vec<AbsenceChange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessCount {
    pub add: usize,
    pub remove: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceChangeError {
    pub date_time: DateTime<Utc>,
    pub action: AbsenceAction,
    pub message: String,
}

/// Outcome of a batch absence update. Items are applied independently, so the
/// stored state reflects exactly the successful subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAbsenceResult {
    pub success_count: SuccessCount,
    pub errors: Vec<AbsenceChangeError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonReport {
    pub availabilities_created: usize,
    pub classes_created: usize,
    pub classes_skipped: usize,
}
