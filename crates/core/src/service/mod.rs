//! # Scheduling Service
//!
//! Entry point for every engine operation. Each public method opens one
//! [`UnitOfWork`], runs the relevant checks against it and commits only when
//! everything succeeded. The one exception is the absence batch, which commits
//! item by item.

mod availability;
mod booking;
mod recurring;
mod schedule;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::clock::Clock;
use crate::conflict::{self, BookingTarget};
use crate::errors::{BookingError, BookingResult};
use crate::models::class::{Class, ClassStatus, ConflictCheck, RecurringClass};
use crate::models::people::{Child, Identity, Instructor, UserType};
use crate::models::schedule::ScheduleWithSlots;
use crate::notify::{Notification, Notifier};
use crate::policy::SchedulingPolicy;
use crate::recurring as resolver;
use crate::slots;
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct SchedulingService {
    store: Arc<dyn Store>,
    policy: SchedulingPolicy,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl SchedulingService {
    pub fn new(
        store: Arc<dyn Store>,
        policy: SchedulingPolicy,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { store, policy, clock, notifier }
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Delivery problems never undo a committed operation.
    async fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(notification).await {
            warn!(error = %e, "failed to hand off notification");
        }
    }
}

fn offset(at: DateTime<Utc>, by: Duration) -> BookingResult<DateTime<Utc>> {
    at.checked_add_signed(by)
        .ok_or_else(|| BookingError::validation(format!("Date-time {at} is out of the supported range")))
}

/// Upper bound for range queries that should reach every materialised row.
fn open_end(start: DateTime<Utc>) -> BookingResult<DateTime<Utc>> {
    offset(start, Duration::weeks(520))
}

fn single_instant(at: DateTime<Utc>) -> BookingResult<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((at, offset(at, Duration::seconds(1))?))
}

fn authorize_instructor(identity: &Identity, instructor_id: Uuid) -> BookingResult<()> {
    match identity.user_type {
        UserType::Admin => Ok(()),
        UserType::Instructor if identity.user_id == instructor_id => Ok(()),
        _ => Err(BookingError::Authorization(format!(
            "{} {} cannot manage instructor {instructor_id}",
            identity.user_type, identity.user_id
        ))),
    }
}

fn authorize_customer(identity: &Identity, customer_id: Uuid) -> BookingResult<()> {
    match identity.user_type {
        UserType::Admin => Ok(()),
        UserType::Customer if identity.user_id == customer_id => Ok(()),
        _ => Err(BookingError::Authorization(format!(
            "{} {} cannot act for customer {customer_id}",
            identity.user_type, identity.user_id
        ))),
    }
}

async fn require_instructor(uow: &mut dyn UnitOfWork, id: Uuid) -> BookingResult<Instructor> {
    uow.find_instructor(id)
        .await?
        .ok_or_else(|| BookingError::not_found(format!("Instructor with ID {id} not found")))
}

/// Children must exist, be non-empty and belong to the customer.
async fn require_children(
    uow: &mut dyn UnitOfWork,
    customer_id: Uuid,
    children_ids: &[Uuid],
) -> BookingResult<Vec<Child>> {
    if children_ids.is_empty() {
        return Err(BookingError::validation("At least one child must attend the class"));
    }
    let unique: HashSet<&Uuid> = children_ids.iter().collect();
    if unique.len() != children_ids.len() {
        return Err(BookingError::validation("Duplicate child in attendance list"));
    }
    let children = uow.find_children(children_ids).await?;
    for id in children_ids {
        match children.iter().find(|c| c.id == *id) {
            None => return Err(BookingError::not_found(format!("Child with ID {id} not found"))),
            Some(child) if child.customer_id != customer_id => {
                return Err(BookingError::validation(format!(
                    "Child {id} does not belong to customer {customer_id}"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(children)
}

/// Whether the instructor's materialised availability holds `at`.
async fn is_materialized(uow: &mut dyn UnitOfWork, instructor_id: Uuid, at: DateTime<Utc>) -> BookingResult<bool> {
    let (start, end) = single_instant(at)?;
    Ok(uow
        .availabilities_between(instructor_id, start, end)
        .await?
        .contains(&at))
}

async fn evaluate_booking(
    uow: &mut dyn UnitOfWork,
    target: &BookingTarget<'_>,
    at: DateTime<Utc>,
    children: &[Child],
) -> BookingResult<ConflictCheck> {
    let is_available = is_materialized(uow, target.instructor_id, at).await?;
    let classes_at = uow.classes_at(at).await?;
    Ok(conflict::evaluate(target, is_available, &classes_at, children))
}

/// Inserts availability rows for every instant the versions offer in
/// `[start, end)`, skipping instants on the absence list.
async fn materialize_availability(
    uow: &mut dyn UnitOfWork,
    instructor_id: Uuid,
    versions: &[ScheduleWithSlots],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<usize> {
    if start >= end {
        return Ok(0);
    }
    let offered = slots::expand(versions, start, end, policy)?;
    let absences = uow.absences_between(instructor_id, start, end).await?;
    let mut created = 0;
    for at in slots::without(offered, absences) {
        if uow.insert_availability(instructor_id, at).await? {
            created += 1;
        }
    }
    Ok(created)
}

/// Creates the booked class rows a recurring interval owes in `[from, until)`.
/// Instants the instructor no longer offers, or that someone else holds, are skipped.
async fn materialize_recurring(
    uow: &mut dyn UnitOfWork,
    rc: &RecurringClass,
    customer_id: Uuid,
    from: DateTime<Utc>,
    until: NaiveDate,
    policy: &SchedulingPolicy,
) -> BookingResult<(usize, usize)> {
    if rc.child_ids.is_empty() {
        warn!(recurring_class_id = %rc.id, "recurring class has no attendees; nothing to materialize");
        return Ok((0, 0));
    }
    let instants: Vec<DateTime<Utc>> =
        resolver::occurrences(rc, policy.local_date(from), until, policy)?
            .into_iter()
            .filter(|at| *at >= from)
            .collect();
    let existing: HashSet<DateTime<Utc>> = uow
        .recurring_instances_from(rc.id, from)
        .await?
        .into_iter()
        .map(|c| c.date_time)
        .collect();

    let (mut created, mut skipped) = (0, 0);
    for at in instants.into_iter().filter(|at| !existing.contains(at)) {
        let held = uow
            .classes_at(at)
            .await?
            .iter()
            .any(|c| c.instructor_id == rc.instructor_id && c.status.is_active());
        if held || !is_materialized(uow, rc.instructor_id, at).await? {
            warn!(recurring_class_id = %rc.id, %at, "skipping recurring class instance: instructor unavailable");
            skipped += 1;
            continue;
        }
        let mut class = Class::new(
            rc.instructor_id,
            customer_id,
            at,
            ClassStatus::Booked,
            rc.child_ids.clone(),
        );
        class.recurring_class_id = Some(rc.id);
        uow.insert_class(&class).await?;
        created += 1;
    }
    Ok((created, skipped))
}
