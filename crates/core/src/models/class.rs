use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::schedule::SlotTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassStatus {
    Pending,
    Booked,
    Rebooked,
    Completed,
    CanceledByCustomer,
    CanceledByInstructor,
    FreeTrial,
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Pending => "pending",
            ClassStatus::Booked => "booked",
            ClassStatus::Rebooked => "rebooked",
            ClassStatus::Completed => "completed",
            ClassStatus::CanceledByCustomer => "canceledByCustomer",
            ClassStatus::CanceledByInstructor => "canceledByInstructor",
            ClassStatus::FreeTrial => "freeTrial",
        }
    }

    /// Statuses that hold the instructor's and the children's time.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ClassStatus::Pending | ClassStatus::Booked | ClassStatus::Rebooked | ClassStatus::FreeTrial
        )
    }

    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            ClassStatus::CanceledByCustomer | ClassStatus::CanceledByInstructor
        )
    }

    pub const ACTIVE: [ClassStatus; 4] = [
        ClassStatus::Pending,
        ClassStatus::Booked,
        ClassStatus::Rebooked,
        ClassStatus::FreeTrial,
    ];
}

impl fmt::Display for ClassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClassStatus::Pending),
            "booked" => Ok(ClassStatus::Booked),
            "rebooked" => Ok(ClassStatus::Rebooked),
            "completed" => Ok(ClassStatus::Completed),
            "canceledByCustomer" => Ok(ClassStatus::CanceledByCustomer),
            "canceledByInstructor" => Ok(ClassStatus::CanceledByInstructor),
            "freeTrial" => Ok(ClassStatus::FreeTrial),
            other => Err(format!("Unknown class status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: Uuid,
    pub recurring_class_id: Option<Uuid>,
    pub instructor_id: Uuid,
    pub customer_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub status: ClassStatus,
    pub is_rebookable: bool,
    pub rebookable_until: Option<DateTime<Utc>>,
    pub class_code: String,
    /// Set once for trial lessons so the credit rules survive the status change.
    pub is_free_trial: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub rebooked_class_id: Option<Uuid>,
    pub child_ids: Vec<Uuid>,
}

impl Class {
    pub fn new(
        instructor_id: Uuid,
        customer_id: Uuid,
        date_time: DateTime<Utc>,
        status: ClassStatus,
        child_ids: Vec<Uuid>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            recurring_class_id: None,
            instructor_id,
            customer_id,
            date_time,
            status,
            is_rebookable: false,
            rebookable_until: None,
            class_code: class_code(id),
            is_free_trial: status == ClassStatus::FreeTrial,
            canceled_at: None,
            rebooked_class_id: None,
            child_ids,
        }
    }
}

/// Short human-readable reference printed on receipts and notifications.
pub fn class_code(id: Uuid) -> String {
    id.simple().to_string()[..8].to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringClass {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub instructor_id: Uuid,
    pub weekday: u8,
    pub start_time: SlotTime,
    pub start_at: NaiveDate,
    pub end_at: Option<NaiveDate>,
    pub child_ids: Vec<Uuid>,
}

impl RecurringClass {
    /// Whether the `[start_at, end_at)` interval reaches `date` or beyond.
    pub fn active_on_or_after(&self, date: NaiveDate) -> bool {
        self.end_at.is_none_or(|end| end > date)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_at <= date && self.end_at.is_none_or(|end| date < end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildConflict {
    pub child_id: Uuid,
    pub child_name: String,
    pub class_id: Uuid,
    pub instructor_id: Uuid,
}

/// Advisory overlaps that need the caller's explicit confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftConflicts {
    pub child_conflicts: Vec<ChildConflict>,
    pub double_bookings: Vec<Uuid>,
}

impl SoftConflicts {
    pub fn is_empty(&self) -> bool {
        self.child_conflicts.is_empty() && self.double_bookings.is_empty()
    }

    pub fn conflicting_child_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .child_conflicts
            .iter()
            .map(|c| c.child_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheckRequest {
    pub instructor_id: Uuid,
    pub customer_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub children_ids: Vec<Uuid>,
    pub exclude_class_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum ConflictCheck {
    Clear,
    Warning { conflicts: SoftConflicts },
    Blocked { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookClassRequest {
    pub instructor_id: Uuid,
    pub customer_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub children_ids: Vec<Uuid>,
    #[serde(default)]
    pub free_trial: bool,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum BookingOutcome {
    Booked { class: Class },
    NeedsConfirmation { conflicts: SoftConflicts },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebookClassRequest {
    pub date_time: DateTime<Utc>,
    pub instructor_id: Uuid,
    pub customer_id: Uuid,
    pub children_ids: Vec<Uuid>,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum RebookOutcome {
    Rebooked { original: Class, class: Class },
    NeedsConfirmation { conflicts: SoftConflicts },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecurringClassRequest {
    pub subscription_id: Uuid,
    pub instructor_id: Uuid,
    pub weekday: u8,
    pub start_time: SlotTime,
    pub start_date: NaiveDate,
    pub timezone: String,
    pub children_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecurringClassRequest {
    pub instructor_id: Uuid,
    pub weekday: u8,
    pub start_time: SlotTime,
    pub start_date: NaiveDate,
    pub timezone: String,
    pub children_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecurringClassResponse {
    pub old_recurring_class: RecurringClass,
    pub new_recurring_class: RecurringClass,
}
