use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use classbook_core::models::{
    class::{Class, ClassStatus, RecurringClass},
    people::{Child, Customer, Instructor, Subscription},
    schedule::{InstructorSchedule, ScheduleSlot},
};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbInstructor {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCustomer {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbChild {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSubscription {
    pub id: Uuid,
    pub customer_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSchedule {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbScheduleSlot {
    pub schedule_id: Uuid,
    pub weekday: i16,
    pub start_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbClass {
    pub id: Uuid,
    pub recurring_class_id: Option<Uuid>,
    pub instructor_id: Uuid,
    pub customer_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub status: String,
    pub is_rebookable: bool,
    pub rebookable_until: Option<DateTime<Utc>>,
    pub class_code: String,
    pub is_free_trial: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub rebooked_class_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbRecurringClass {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub instructor_id: Uuid,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub start_at: NaiveDate,
    pub end_at: Option<NaiveDate>,
}

/// Row of `class_attendances` or `recurring_class_attendances`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAttendance {
    pub owner_id: Uuid,
    pub child_id: Uuid,
}

fn weekday(raw: i16) -> Result<u8> {
    u8::try_from(raw)
        .ok()
        .filter(|w| *w <= 6)
        .ok_or_else(|| eyre!("Invalid weekday {raw} in database"))
}

impl From<DbInstructor> for Instructor {
    fn from(row: DbInstructor) -> Self {
        Instructor { id: row.id, name: row.name }
    }
}

impl From<DbCustomer> for Customer {
    fn from(row: DbCustomer) -> Self {
        Customer { id: row.id, name: row.name }
    }
}

impl From<DbChild> for Child {
    fn from(row: DbChild) -> Self {
        Child { id: row.id, customer_id: row.customer_id, name: row.name }
    }
}

impl From<DbSubscription> for Subscription {
    fn from(row: DbSubscription) -> Self {
        Subscription { id: row.id, customer_id: row.customer_id }
    }
}

impl From<DbSchedule> for InstructorSchedule {
    fn from(row: DbSchedule) -> Self {
        InstructorSchedule {
            id: row.id,
            instructor_id: row.instructor_id,
            effective_from: row.effective_from,
            effective_to: row.effective_to,
        }
    }
}

impl TryFrom<DbScheduleSlot> for ScheduleSlot {
    type Error = eyre::Report;

    fn try_from(row: DbScheduleSlot) -> Result<Self> {
        Ok(ScheduleSlot {
            schedule_id: row.schedule_id,
            weekday: weekday(row.weekday)?,
            start_time: row.start_time.into(),
        })
    }
}

impl DbClass {
    pub fn from_class(class: &Class) -> Self {
        DbClass {
            id: class.id,
            recurring_class_id: class.recurring_class_id,
            instructor_id: class.instructor_id,
            customer_id: class.customer_id,
            date_time: class.date_time,
            status: class.status.as_str().to_string(),
            is_rebookable: class.is_rebookable,
            rebookable_until: class.rebookable_until,
            class_code: class.class_code.clone(),
            is_free_trial: class.is_free_trial,
            canceled_at: class.canceled_at,
            rebooked_class_id: class.rebooked_class_id,
        }
    }

    pub fn into_class(self, child_ids: Vec<Uuid>) -> Result<Class> {
        let status: ClassStatus = self.status.parse().map_err(|e: String| eyre!(e))?;
        Ok(Class {
            id: self.id,
            recurring_class_id: self.recurring_class_id,
            instructor_id: self.instructor_id,
            customer_id: self.customer_id,
            date_time: self.date_time,
            status,
            is_rebookable: self.is_rebookable,
            rebookable_until: self.rebookable_until,
            class_code: self.class_code,
            is_free_trial: self.is_free_trial,
            canceled_at: self.canceled_at,
            rebooked_class_id: self.rebooked_class_id,
            child_ids,
        })
    }
}

impl DbRecurringClass {
    pub fn from_recurring_class(rc: &RecurringClass) -> Self {
        DbRecurringClass {
            id: rc.id,
            subscription_id: rc.subscription_id,
            instructor_id: rc.instructor_id,
            weekday: i16::from(rc.weekday),
            start_time: rc.start_time.as_naive(),
            start_at: rc.start_at,
            end_at: rc.end_at,
        }
    }

    pub fn into_recurring_class(self, child_ids: Vec<Uuid>) -> Result<RecurringClass> {
        Ok(RecurringClass {
            id: self.id,
            subscription_id: self.subscription_id,
            instructor_id: self.instructor_id,
            weekday: weekday(self.weekday)?,
            start_time: self.start_time.into(),
            start_at: self.start_at,
            end_at: self.end_at,
            child_ids,
        })
    }
}
