use tracing::{debug, info};
use uuid::Uuid;

use super::{
    authorize_customer, materialize_recurring, require_children, require_instructor, SchedulingService,
};
use crate::errors::{messages, BookingError, BookingResult};
use crate::models::class::{
    ClassStatus, CreateRecurringClassRequest, EditRecurringClassRequest, EditRecurringClassResponse,
    RecurringClass,
};
use crate::models::people::{Identity, Subscription};
use crate::models::schedule::ScheduleWithSlots;
use crate::policy;
use crate::recurring::{self as resolver, WeeklySlot};
use crate::store::UnitOfWork;

async fn require_subscription(uow: &mut dyn UnitOfWork, id: Uuid) -> BookingResult<Subscription> {
    uow.find_subscription(id)
        .await?
        .ok_or_else(|| BookingError::not_found(format!("Subscription with ID {id} not found")))
}

/// At least one version must still be in force on `slot.start_date` or later.
fn ensure_schedule_defined(versions: &[ScheduleWithSlots], slot: &WeeklySlot) -> BookingResult<()> {
    let defined = versions
        .iter()
        .any(|v| v.schedule.effective_to.is_none_or(|to| to > slot.start_date));
    if !defined {
        return Err(BookingError::not_found(messages::INSTRUCTOR_SCHEDULE_NOT_FOUND));
    }
    Ok(())
}

impl SchedulingService {
    pub async fn create_recurring_class(
        &self,
        identity: &Identity,
        request: &CreateRecurringClassRequest,
    ) -> BookingResult<RecurringClass> {
        resolver::ensure_weekday(request.weekday)?;
        policy::validate_date(request.start_date)?;
        let now = self.now();
        let today = self.policy.local_date(now);
        if request.start_date < today {
            return Err(BookingError::validation(format!(
                "Start date {} is in the past",
                request.start_date
            )));
        }

        let mut uow = self.store.begin().await?;
        let subscription = require_subscription(uow.as_mut(), request.subscription_id).await?;
        authorize_customer(identity, subscription.customer_id)?;
        require_instructor(uow.as_mut(), request.instructor_id).await?;

        let slot = WeeklySlot {
            instructor_id: request.instructor_id,
            weekday: request.weekday,
            start_time: request.start_time,
            start_date: request.start_date,
        };
        let versions = uow.schedules_for_instructor(request.instructor_id).await?;
        ensure_schedule_defined(&versions, &slot)?;
        resolver::ensure_supported_timezone(&request.timezone, &self.policy)?;
        require_children(uow.as_mut(), subscription.customer_id, &request.children_ids).await?;

        let instructor_classes = uow.recurring_classes_for_instructor(request.instructor_id).await?;
        let family_classes = uow.recurring_classes_for_customer(subscription.customer_id).await?;
        resolver::ensure_no_collisions(&instructor_classes, &family_classes, &slot, None)?;
        resolver::ensure_slot_offered(&versions, &slot, &self.policy)?;

        let rc = RecurringClass {
            id: Uuid::new_v4(),
            subscription_id: subscription.id,
            instructor_id: request.instructor_id,
            weekday: request.weekday,
            start_time: request.start_time,
            start_at: request.start_date,
            end_at: None,
            child_ids: request.children_ids.clone(),
        };
        uow.insert_recurring_class(&rc).await?;

        let from = self.policy.start_of_day(request.start_date)?.max(now);
        let horizon = self.policy.horizon_end(now);
        let (created, skipped) =
            materialize_recurring(uow.as_mut(), &rc, subscription.customer_id, from, horizon, &self.policy)
                .await?;
        uow.commit().await?;

        info!(recurring_class_id = %rc.id, created, skipped, "recurring class created");
        Ok(rc)
    }

    /// Moves a recurring class to a new weekly slot from `start_date` on. The old
    /// interval ends at that date, its not yet held instances from then on are
    /// removed, and the new interval starts producing classes.
    pub async fn edit_recurring_class(
        &self,
        identity: &Identity,
        recurring_class_id: Uuid,
        request: &EditRecurringClassRequest,
    ) -> BookingResult<EditRecurringClassResponse> {
        resolver::ensure_weekday(request.weekday)?;
        policy::validate_date(request.start_date)?;
        let now = self.now();
        resolver::ensure_start_date_lead(request.start_date, now, &self.policy)?;

        let mut uow = self.store.begin().await?;
        let old = uow.find_recurring_class(recurring_class_id).await?.ok_or_else(|| {
            BookingError::not_found(format!("Recurring class with ID {recurring_class_id} not found"))
        })?;
        let subscription = require_subscription(uow.as_mut(), old.subscription_id).await?;
        authorize_customer(identity, subscription.customer_id)?;
        require_instructor(uow.as_mut(), request.instructor_id).await?;

        let slot = WeeklySlot {
            instructor_id: request.instructor_id,
            weekday: request.weekday,
            start_time: request.start_time,
            start_date: request.start_date,
        };
        let versions = uow.schedules_for_instructor(request.instructor_id).await?;
        ensure_schedule_defined(&versions, &slot)?;
        resolver::ensure_supported_timezone(&request.timezone, &self.policy)?;

        let instructor_classes = uow.recurring_classes_for_instructor(request.instructor_id).await?;
        let family_classes = uow.recurring_classes_for_customer(subscription.customer_id).await?;
        resolver::ensure_no_collisions(&instructor_classes, &family_classes, &slot, Some(old.id))?;
        resolver::ensure_slot_offered(&versions, &slot, &self.policy)?;

        let child_ids = request
            .children_ids
            .clone()
            .unwrap_or_else(|| old.child_ids.clone());
        require_children(uow.as_mut(), subscription.customer_id, &child_ids).await?;

        let (closed, opened) = resolver::split(&old, &slot, child_ids)?;
        uow.end_recurring_class(old.id, request.start_date).await?;
        uow.insert_recurring_class(&opened).await?;

        let from = self.policy.start_of_day(request.start_date)?;
        let mut removed = 0;
        for class in uow.recurring_instances_from(old.id, from).await? {
            if matches!(class.status, ClassStatus::Booked | ClassStatus::Pending) {
                uow.delete_class(class.id).await?;
                removed += 1;
            }
        }
        debug!(recurring_class_id = %old.id, removed, "removed superseded class instances");

        let horizon = self.policy.horizon_end(now);
        let (created, skipped) = materialize_recurring(
            uow.as_mut(),
            &opened,
            subscription.customer_id,
            from.max(now),
            horizon,
            &self.policy,
        )
        .await?;
        uow.commit().await.map_err(BookingError::into_slot_taken)?;

        info!(
            old_recurring_class_id = %closed.id,
            new_recurring_class_id = %opened.id,
            start_date = %request.start_date,
            created,
            skipped,
            "recurring class edited"
        );
        Ok(EditRecurringClassResponse {
            old_recurring_class: closed,
            new_recurring_class: opened,
        })
    }
}
