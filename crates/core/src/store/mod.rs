//! Persistence port.
//!
//! Every operation of [`crate::service::SchedulingService`] runs inside one
//! [`UnitOfWork`]. Dropping a unit of work without calling
//! [`UnitOfWork::commit`] discards all of its writes. Implementations must make
//! units of work serializable with respect to each other, or at least enforce
//! one active class per `(instructor_id, date_time)` at write time.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::BookingResult;
use crate::models::class::{Class, RecurringClass};
use crate::models::people::{Child, Customer, Instructor, Subscription};
use crate::models::schedule::ScheduleWithSlots;

pub use memory::MemoryStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> BookingResult<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_instructor(&mut self, id: Uuid) -> BookingResult<Option<Instructor>>;
    async fn find_customer(&mut self, id: Uuid) -> BookingResult<Option<Customer>>;
    async fn find_children(&mut self, ids: &[Uuid]) -> BookingResult<Vec<Child>>;
    async fn find_subscription(&mut self, id: Uuid) -> BookingResult<Option<Subscription>>;

    /// Every version for the instructor, ordered by `effective_from`.
    async fn schedules_for_instructor(
        &mut self,
        instructor_id: Uuid,
    ) -> BookingResult<Vec<ScheduleWithSlots>>;
    async fn insert_schedule(&mut self, schedule: &ScheduleWithSlots) -> BookingResult<()>;
    async fn close_schedule(&mut self, schedule_id: Uuid, effective_to: NaiveDate) -> BookingResult<()>;

    /// Materialised instants in `[start, end)`, ascending.
    async fn availabilities_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<DateTime<Utc>>>;
    /// Returns `false` when the row already existed.
    async fn insert_availability(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool>;
    async fn delete_availability(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool>;

    async fn absences_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<DateTime<Utc>>>;
    async fn insert_absence(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool>;
    async fn delete_absence(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool>;

    async fn find_class(&mut self, id: Uuid) -> BookingResult<Option<Class>>;
    /// Classes of any status taught by the instructor in `[start, end)`.
    async fn instructor_classes_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<Class>>;
    /// Classes of any status and any instructor starting exactly at `at`.
    async fn classes_at(&mut self, at: DateTime<Utc>) -> BookingResult<Vec<Class>>;
    async fn recurring_instances_from(
        &mut self,
        recurring_class_id: Uuid,
        from: DateTime<Utc>,
    ) -> BookingResult<Vec<Class>>;
    /// Fails with the instructor-unavailable business rule when another active
    /// class already holds the instructor's instant.
    async fn insert_class(&mut self, class: &Class) -> BookingResult<()>;
    async fn update_class(&mut self, class: &Class) -> BookingResult<()>;
    async fn delete_class(&mut self, id: Uuid) -> BookingResult<()>;

    async fn find_recurring_class(&mut self, id: Uuid) -> BookingResult<Option<RecurringClass>>;
    async fn recurring_classes_for_instructor(
        &mut self,
        instructor_id: Uuid,
    ) -> BookingResult<Vec<RecurringClass>>;
    async fn recurring_classes_for_customer(
        &mut self,
        customer_id: Uuid,
    ) -> BookingResult<Vec<RecurringClass>>;
    async fn insert_recurring_class(&mut self, recurring_class: &RecurringClass) -> BookingResult<()>;
    async fn end_recurring_class(&mut self, id: Uuid, end_at: NaiveDate) -> BookingResult<()>;

    async fn commit(self: Box<Self>) -> BookingResult<()>;
}
