//! Postgres implementation of the engine's persistence port.
//!
//! Every unit of work is one `SERIALIZABLE` transaction. Serialization
//! failures and unique-index violations surface as the concurrent-update
//! conflict, except on class inserts where they mean the instructor's slot was
//! taken first.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use classbook_core::{
    errors::{messages, BookingError, BookingResult},
    models::{
        class::{Class, RecurringClass},
        people::{Child, Customer, Instructor, Subscription},
        schedule::{ScheduleSlot, ScheduleWithSlots},
    },
    store::{Store, UnitOfWork},
};
use eyre::Result;
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{DbAttendance, DbClass, DbRecurringClass, DbSchedule};
use crate::repositories::availability::{self, InstantTable};
use crate::repositories::{class, people, recurring_class, schedule};
use crate::DbPool;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Whether the error means another transaction won a race for the same rows.
fn is_contention(report: &eyre::Report) -> bool {
    report
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| {
            db.is_unique_violation()
                || matches!(db.code().as_deref(), Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED))
        })
}

fn storage(report: eyre::Report) -> BookingError {
    if is_contention(&report) {
        tracing::warn!("Transaction lost a write race: {report}");
        return BookingError::Conflict(messages::CONCURRENT_UPDATE.to_string());
    }
    BookingError::Database(report)
}

fn group_attendances(rows: Vec<DbAttendance>) -> HashMap<Uuid, Vec<Uuid>> {
    let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        grouped.entry(row.owner_id).or_default().push(row.child_id);
    }
    for children in grouped.values_mut() {
        children.sort();
    }
    grouped
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> BookingResult<Box<dyn UnitOfWork>> {
        let mut tx = self.pool.begin().await.map_err(|e| storage(e.into()))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| storage(e.into()))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    async fn hydrate_classes(&mut self, rows: Vec<DbClass>) -> Result<Vec<Class>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut children = group_attendances(class::get_attendances(&mut self.tx, &ids).await?);
        rows.into_iter()
            .map(|row| {
                let child_ids = children.remove(&row.id).unwrap_or_default();
                row.into_class(child_ids)
            })
            .collect()
    }

    async fn hydrate_recurring(&mut self, rows: Vec<DbRecurringClass>) -> Result<Vec<RecurringClass>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut children = group_attendances(recurring_class::get_attendances(&mut self.tx, &ids).await?);
        rows.into_iter()
            .map(|row| {
                let child_ids = children.remove(&row.id).unwrap_or_default();
                row.into_recurring_class(child_ids)
            })
            .collect()
    }

    async fn load_schedules(&mut self, instructor_id: Uuid) -> Result<Vec<ScheduleWithSlots>> {
        let schedules = schedule::get_schedules_by_instructor_id(&mut self.tx, instructor_id).await?;
        let ids: Vec<Uuid> = schedules.iter().map(|s| s.id).collect();
        let mut slots: HashMap<Uuid, Vec<ScheduleSlot>> = HashMap::new();
        for row in schedule::get_slots_by_schedule_ids(&mut self.tx, &ids).await? {
            slots.entry(row.schedule_id).or_default().push(row.try_into()?);
        }
        Ok(schedules
            .into_iter()
            .map(|s| {
                let slots = slots.remove(&s.id).unwrap_or_default();
                ScheduleWithSlots { schedule: s.into(), slots }
            })
            .collect())
    }

    async fn store_schedule(&mut self, version: &ScheduleWithSlots) -> Result<()> {
        let row = DbSchedule {
            id: version.schedule.id,
            instructor_id: version.schedule.instructor_id,
            effective_from: version.schedule.effective_from,
            effective_to: version.schedule.effective_to,
        };
        schedule::create_schedule(&mut self.tx, &row).await?;
        for slot in &version.slots {
            schedule::create_schedule_slot(
                &mut self.tx,
                row.id,
                i16::from(slot.weekday),
                slot.start_time.as_naive(),
            )
            .await?;
        }
        Ok(())
    }

    async fn store_class(&mut self, class: &Class) -> Result<()> {
        class::create_class(&mut self.tx, &DbClass::from_class(class)).await?;
        for child_id in &class.child_ids {
            class::create_attendance(&mut self.tx, class.id, *child_id).await?;
        }
        Ok(())
    }

    async fn store_recurring(&mut self, rc: &RecurringClass) -> Result<()> {
        recurring_class::create_recurring_class(&mut self.tx, &DbRecurringClass::from_recurring_class(rc)).await?;
        for child_id in &rc.child_ids {
            recurring_class::create_attendance(&mut self.tx, rc.id, *child_id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_instructor(&mut self, id: Uuid) -> BookingResult<Option<Instructor>> {
        let row = people::get_instructor_by_id(&mut self.tx, id).await.map_err(storage)?;
        Ok(row.map(Into::into))
    }

    async fn find_customer(&mut self, id: Uuid) -> BookingResult<Option<Customer>> {
        let row = people::get_customer_by_id(&mut self.tx, id).await.map_err(storage)?;
        Ok(row.map(Into::into))
    }

    async fn find_children(&mut self, ids: &[Uuid]) -> BookingResult<Vec<Child>> {
        let rows = people::get_children_by_ids(&mut self.tx, ids).await.map_err(storage)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_subscription(&mut self, id: Uuid) -> BookingResult<Option<Subscription>> {
        let row = people::get_subscription_by_id(&mut self.tx, id).await.map_err(storage)?;
        Ok(row.map(Into::into))
    }

    async fn schedules_for_instructor(&mut self, instructor_id: Uuid) -> BookingResult<Vec<ScheduleWithSlots>> {
        self.load_schedules(instructor_id).await.map_err(storage)
    }

    async fn insert_schedule(&mut self, schedule: &ScheduleWithSlots) -> BookingResult<()> {
        self.store_schedule(schedule).await.map_err(storage)
    }

    async fn close_schedule(&mut self, schedule_id: Uuid, effective_to: NaiveDate) -> BookingResult<()> {
        let updated = schedule::close_schedule(&mut self.tx, schedule_id, effective_to)
            .await
            .map_err(storage)?;
        if updated == 0 {
            return Err(BookingError::not_found(format!("Schedule {schedule_id} not found")));
        }
        Ok(())
    }

    async fn availabilities_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<DateTime<Utc>>> {
        availability::get_instants_between(&mut self.tx, InstantTable::Availabilities, instructor_id, start, end)
            .await
            .map_err(storage)
    }

    async fn insert_availability(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
        availability::create_instant(&mut self.tx, InstantTable::Availabilities, instructor_id, at)
            .await
            .map_err(storage)
    }

    async fn delete_availability(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
        availability::delete_instant(&mut self.tx, InstantTable::Availabilities, instructor_id, at)
            .await
            .map_err(storage)
    }

    async fn absences_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<DateTime<Utc>>> {
        availability::get_instants_between(&mut self.tx, InstantTable::Unavailabilities, instructor_id, start, end)
            .await
            .map_err(storage)
    }

    async fn insert_absence(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
        availability::create_instant(&mut self.tx, InstantTable::Unavailabilities, instructor_id, at)
            .await
            .map_err(storage)
    }

    async fn delete_absence(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
        availability::delete_instant(&mut self.tx, InstantTable::Unavailabilities, instructor_id, at)
            .await
            .map_err(storage)
    }

    async fn find_class(&mut self, id: Uuid) -> BookingResult<Option<Class>> {
        let Some(row) = class::get_class_by_id(&mut self.tx, id).await.map_err(storage)? else {
            return Ok(None);
        };
        let mut classes = self.hydrate_classes(vec![row]).await.map_err(storage)?;
        Ok(classes.pop())
    }

    async fn instructor_classes_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<Class>> {
        let rows = class::get_classes_by_instructor_between(&mut self.tx, instructor_id, start, end)
            .await
            .map_err(storage)?;
        self.hydrate_classes(rows).await.map_err(storage)
    }

    async fn classes_at(&mut self, at: DateTime<Utc>) -> BookingResult<Vec<Class>> {
        let rows = class::get_classes_at(&mut self.tx, at).await.map_err(storage)?;
        self.hydrate_classes(rows).await.map_err(storage)
    }

    async fn recurring_instances_from(
        &mut self,
        recurring_class_id: Uuid,
        from: DateTime<Utc>,
    ) -> BookingResult<Vec<Class>> {
        let rows = class::get_classes_by_recurring_class_from(&mut self.tx, recurring_class_id, from)
            .await
            .map_err(storage)?;
        self.hydrate_classes(rows).await.map_err(storage)
    }

    async fn insert_class(&mut self, class: &Class) -> BookingResult<()> {
        self.store_class(class).await.map_err(|report| {
            if is_contention(&report) {
                BookingError::rule(messages::INSTRUCTOR_UNAVAILABLE)
            } else {
                BookingError::Database(report)
            }
        })
    }

    async fn update_class(&mut self, class: &Class) -> BookingResult<()> {
        let updated = class::update_class(&mut self.tx, &DbClass::from_class(class))
            .await
            .map_err(storage)?;
        if updated == 0 {
            return Err(BookingError::not_found(format!("Class {} not found", class.id)));
        }
        Ok(())
    }

    async fn delete_class(&mut self, id: Uuid) -> BookingResult<()> {
        class::delete_class(&mut self.tx, id).await.map_err(storage)
    }

    async fn find_recurring_class(&mut self, id: Uuid) -> BookingResult<Option<RecurringClass>> {
        let Some(row) = recurring_class::get_recurring_class_by_id(&mut self.tx, id)
            .await
            .map_err(storage)?
        else {
            return Ok(None);
        };
        let mut classes = self.hydrate_recurring(vec![row]).await.map_err(storage)?;
        Ok(classes.pop())
    }

    async fn recurring_classes_for_instructor(&mut self, instructor_id: Uuid) -> BookingResult<Vec<RecurringClass>> {
        let rows = recurring_class::get_recurring_classes_by_instructor_id(&mut self.tx, instructor_id)
            .await
            .map_err(storage)?;
        self.hydrate_recurring(rows).await.map_err(storage)
    }

    async fn recurring_classes_for_customer(&mut self, customer_id: Uuid) -> BookingResult<Vec<RecurringClass>> {
        let rows = recurring_class::get_recurring_classes_by_customer_id(&mut self.tx, customer_id)
            .await
            .map_err(storage)?;
        self.hydrate_recurring(rows).await.map_err(storage)
    }

    async fn insert_recurring_class(&mut self, recurring_class: &RecurringClass) -> BookingResult<()> {
        self.store_recurring(recurring_class).await.map_err(storage)
    }

    async fn end_recurring_class(&mut self, id: Uuid, end_at: NaiveDate) -> BookingResult<()> {
        let updated = recurring_class::end_recurring_class(&mut self.tx, id, end_at)
            .await
            .map_err(storage)?;
        if updated == 0 {
            return Err(BookingError::not_found(format!("Recurring class {id} not found")));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BookingResult<()> {
        self.tx.commit().await.map_err(|e| storage(e.into()))
    }
}
