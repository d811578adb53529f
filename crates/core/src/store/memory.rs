//! In-process [`Store`] for development and tests.
//!
//! A unit of work holds the store's lock from `begin` until it is committed or
//! dropped and edits a private copy of the state, which gives serializable
//! isolation and all-or-nothing commits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, UnitOfWork};
use crate::errors::{messages, BookingError, BookingResult};
use crate::models::class::{Class, RecurringClass};
use crate::models::people::{Child, Customer, Instructor, Subscription};
use crate::models::schedule::ScheduleWithSlots;

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub instructors: HashMap<Uuid, Instructor>,
    pub customers: HashMap<Uuid, Customer>,
    pub children: HashMap<Uuid, Child>,
    pub subscriptions: HashMap<Uuid, Subscription>,
    pub schedules: Vec<ScheduleWithSlots>,
    pub availabilities: BTreeSet<(Uuid, DateTime<Utc>)>,
    pub absences: BTreeSet<(Uuid, DateTime<Utc>)>,
    pub classes: HashMap<Uuid, Class>,
    pub recurring_classes: HashMap<Uuid, RecurringClass>,
}

impl MemoryState {
    fn instants_between(
        set: &BTreeSet<(Uuid, DateTime<Utc>)>,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        if start >= end {
            return Vec::new();
        }
        set.range((instructor_id, start)..(instructor_id, end))
            .map(|(_, at)| *at)
            .collect()
    }

    fn sorted(mut classes: Vec<Class>) -> Vec<Class> {
        classes.sort_by_key(|c| (c.date_time, c.id));
        classes
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn add_instructor(&self, name: &str) -> Instructor {
        let instructor = Instructor { id: Uuid::new_v4(), name: name.to_string() };
        self.state
            .lock()
            .await
            .instructors
            .insert(instructor.id, instructor.clone());
        instructor
    }

    pub async fn add_customer(&self, name: &str) -> Customer {
        let customer = Customer { id: Uuid::new_v4(), name: name.to_string() };
        self.state
            .lock()
            .await
            .customers
            .insert(customer.id, customer.clone());
        customer
    }

    pub async fn add_child(&self, customer_id: Uuid, name: &str) -> Child {
        let child = Child { id: Uuid::new_v4(), customer_id, name: name.to_string() };
        self.state.lock().await.children.insert(child.id, child.clone());
        child
    }

    pub async fn add_subscription(&self, customer_id: Uuid) -> Subscription {
        let subscription = Subscription { id: Uuid::new_v4(), customer_id };
        self.state
            .lock()
            .await
            .subscriptions
            .insert(subscription.id, subscription.clone());
        subscription
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> BookingResult<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_instructor(&mut self, id: Uuid) -> BookingResult<Option<Instructor>> {
        Ok(self.working.instructors.get(&id).cloned())
    }

    async fn find_customer(&mut self, id: Uuid) -> BookingResult<Option<Customer>> {
        Ok(self.working.customers.get(&id).cloned())
    }

    async fn find_children(&mut self, ids: &[Uuid]) -> BookingResult<Vec<Child>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.children.get(id).cloned())
            .collect())
    }

    async fn find_subscription(&mut self, id: Uuid) -> BookingResult<Option<Subscription>> {
        Ok(self.working.subscriptions.get(&id).cloned())
    }

    async fn schedules_for_instructor(
        &mut self,
        instructor_id: Uuid,
    ) -> BookingResult<Vec<ScheduleWithSlots>> {
        let mut versions: Vec<ScheduleWithSlots> = self
            .working
            .schedules
            .iter()
            .filter(|v| v.schedule.instructor_id == instructor_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.schedule.effective_from);
        Ok(versions)
    }

    async fn insert_schedule(&mut self, schedule: &ScheduleWithSlots) -> BookingResult<()> {
        let instructor_id = schedule.schedule.instructor_id;
        if schedule.schedule.is_open()
            && self
                .working
                .schedules
                .iter()
                .any(|v| v.schedule.instructor_id == instructor_id && v.schedule.is_open())
        {
            return Err(BookingError::Conflict(format!(
                "Instructor {instructor_id} already has an open schedule"
            )));
        }
        self.working.schedules.push(schedule.clone());
        Ok(())
    }

    async fn close_schedule(&mut self, schedule_id: Uuid, effective_to: NaiveDate) -> BookingResult<()> {
        let version = self
            .working
            .schedules
            .iter_mut()
            .find(|v| v.schedule.id == schedule_id)
            .ok_or_else(|| BookingError::not_found(format!("Schedule {schedule_id} not found")))?;
        version.schedule.effective_to = Some(effective_to);
        Ok(())
    }

    async fn availabilities_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<DateTime<Utc>>> {
        Ok(MemoryState::instants_between(&self.working.availabilities, instructor_id, start, end))
    }

    async fn insert_availability(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
        Ok(self.working.availabilities.insert((instructor_id, at)))
    }

    async fn delete_availability(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
        Ok(self.working.availabilities.remove(&(instructor_id, at)))
    }

    async fn absences_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<DateTime<Utc>>> {
        Ok(MemoryState::instants_between(&self.working.absences, instructor_id, start, end))
    }

    async fn insert_absence(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
        Ok(self.working.absences.insert((instructor_id, at)))
    }

    async fn delete_absence(&mut self, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
        Ok(self.working.absences.remove(&(instructor_id, at)))
    }

    async fn find_class(&mut self, id: Uuid) -> BookingResult<Option<Class>> {
        Ok(self.working.classes.get(&id).cloned())
    }

    async fn instructor_classes_between(
        &mut self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<Class>> {
        Ok(MemoryState::sorted(
            self.working
                .classes
                .values()
                .filter(|c| c.instructor_id == instructor_id && c.date_time >= start && c.date_time < end)
                .cloned()
                .collect(),
        ))
    }

    async fn classes_at(&mut self, at: DateTime<Utc>) -> BookingResult<Vec<Class>> {
        Ok(MemoryState::sorted(
            self.working
                .classes
                .values()
                .filter(|c| c.date_time == at)
                .cloned()
                .collect(),
        ))
    }

    async fn recurring_instances_from(
        &mut self,
        recurring_class_id: Uuid,
        from: DateTime<Utc>,
    ) -> BookingResult<Vec<Class>> {
        Ok(MemoryState::sorted(
            self.working
                .classes
                .values()
                .filter(|c| c.recurring_class_id == Some(recurring_class_id) && c.date_time >= from)
                .cloned()
                .collect(),
        ))
    }

    async fn insert_class(&mut self, class: &Class) -> BookingResult<()> {
        let taken = class.status.is_active()
            && self.working.classes.values().any(|c| {
                c.instructor_id == class.instructor_id
                    && c.date_time == class.date_time
                    && c.status.is_active()
            });
        if taken {
            return Err(BookingError::rule(messages::INSTRUCTOR_UNAVAILABLE));
        }
        self.working.classes.insert(class.id, class.clone());
        Ok(())
    }

    async fn update_class(&mut self, class: &Class) -> BookingResult<()> {
        match self.working.classes.get_mut(&class.id) {
            Some(existing) => {
                *existing = class.clone();
                Ok(())
            }
            None => Err(BookingError::not_found(format!("Class {} not found", class.id))),
        }
    }

    async fn delete_class(&mut self, id: Uuid) -> BookingResult<()> {
        self.working.classes.remove(&id);
        Ok(())
    }

    async fn find_recurring_class(&mut self, id: Uuid) -> BookingResult<Option<RecurringClass>> {
        Ok(self.working.recurring_classes.get(&id).cloned())
    }

    async fn recurring_classes_for_instructor(
        &mut self,
        instructor_id: Uuid,
    ) -> BookingResult<Vec<RecurringClass>> {
        Ok(self
            .working
            .recurring_classes
            .values()
            .filter(|rc| rc.instructor_id == instructor_id)
            .cloned()
            .collect())
    }

    async fn recurring_classes_for_customer(
        &mut self,
        customer_id: Uuid,
    ) -> BookingResult<Vec<RecurringClass>> {
        let subscriptions = &self.working.subscriptions;
        Ok(self
            .working
            .recurring_classes
            .values()
            .filter(|rc| {
                subscriptions
                    .get(&rc.subscription_id)
                    .is_some_and(|s| s.customer_id == customer_id)
            })
            .cloned()
            .collect())
    }

    async fn insert_recurring_class(&mut self, recurring_class: &RecurringClass) -> BookingResult<()> {
        self.working
            .recurring_classes
            .insert(recurring_class.id, recurring_class.clone());
        Ok(())
    }

    async fn end_recurring_class(&mut self, id: Uuid, end_at: NaiveDate) -> BookingResult<()> {
        let rc = self
            .working
            .recurring_classes
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found(format!("Recurring class {id} not found")))?;
        rc.end_at = Some(end_at);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BookingResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
