use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    authorize_instructor, is_materialized, materialize_availability, materialize_recurring,
    require_instructor, single_instant, SchedulingService,
};
use crate::absence::{self, AbsenceFacts, AbsenceStep};
use crate::errors::{BookingError, BookingResult};
use crate::models::availability::{AbsenceChange, BatchAbsenceResult, HorizonReport};
use crate::models::people::Identity;
use crate::slots;

impl SchedulingService {
    /// Bookable instants for an instructor in `[start, end)`: the governing
    /// schedule expanded over the range, minus absences and, if asked, minus
    /// instants an active class already holds.
    ///
    /// The part of the range between now and the generation horizon is
    /// materialised first. Future instants are only listed once a stored
    /// availability row backs them, so everything listed can be booked or
    /// marked absent. Past instants come straight from the schedule.
    pub async fn generate_available_slots(
        &self,
        instructor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_booked: bool,
    ) -> BookingResult<Vec<DateTime<Utc>>> {
        slots::validate_range(start, end)?;
        let now = self.now();
        let mut uow = self.store.begin().await?;
        require_instructor(uow.as_mut(), instructor_id).await?;

        let versions = uow.schedules_for_instructor(instructor_id).await?;
        let horizon = self.policy.start_of_day(self.policy.horizon_end(now))?;
        let created = materialize_availability(
            uow.as_mut(),
            instructor_id,
            &versions,
            start.max(now),
            end.min(horizon),
            &self.policy,
        )
        .await?;

        let offered = slots::expand(&versions, start, end, &self.policy)?;
        let absences = uow.absences_between(instructor_id, start, end).await?;
        let mut available = slots::without(offered, absences);

        if end > now {
            let stored: HashSet<DateTime<Utc>> = uow
                .availabilities_between(instructor_id, start.max(now), end)
                .await?
                .into_iter()
                .collect();
            available.retain(|at| *at < now || stored.contains(at));
        }

        if exclude_booked {
            let held = uow
                .instructor_classes_between(instructor_id, start, end)
                .await?
                .into_iter()
                .filter(|c| c.status.is_active())
                .map(|c| c.date_time)
                .collect::<Vec<_>>();
            available = slots::without(available, held);
        }

        if created > 0 {
            uow.commit().await?;
        }
        debug!(%instructor_id, %start, %end, created, count = available.len(), "generated available slots");
        Ok(available)
    }

    /// Applies each change in its own unit of work. A failing item is reported
    /// and never undoes the ones before it.
    pub async fn batch_update_absences(
        &self,
        identity: &Identity,
        instructor_id: Uuid,
        changes: &[AbsenceChange],
    ) -> BookingResult<BatchAbsenceResult> {
        authorize_instructor(identity, instructor_id)?;
        {
            let mut uow = self.store.begin().await?;
            require_instructor(uow.as_mut(), instructor_id).await?;
        }

        let mut result = BatchAbsenceResult::default();
        for change in changes {
            let outcome = self
                .apply_absence_change(instructor_id, change)
                .await
                .map_err(|e| match e {
                    BookingError::BusinessRule(msg) => msg,
                    other => other.to_string(),
                });
            if let Err(message) = &outcome {
                warn!(%instructor_id, at = %change.date_time, %message, "absence change rejected");
            }
            result.record(change, outcome);
        }

        info!(
            %instructor_id,
            added = result.success_count.add,
            removed = result.success_count.remove,
            failed = result.errors.len(),
            "absence batch applied"
        );
        Ok(result)
    }

    async fn apply_absence_change(&self, instructor_id: Uuid, change: &AbsenceChange) -> BookingResult<()> {
        let at = change.date_time;
        slots::validate_instant(at)?;
        let (start, end) = single_instant(at)?;
        let mut uow = self.store.begin().await?;

        let versions = uow.schedules_for_instructor(instructor_id).await?;
        let facts = AbsenceFacts {
            is_past: at <= self.now(),
            is_absent: uow.absences_between(instructor_id, start, end).await?.contains(&at),
            is_available: is_materialized(uow.as_mut(), instructor_id, at).await?,
            booked_class: uow
                .classes_at(at)
                .await?
                .into_iter()
                .find(|c| c.instructor_id == instructor_id && c.status.is_active())
                .map(|c| c.id),
            offered_by_schedule: slots::offers_instant(&versions, at, &self.policy),
        };

        match absence::plan(change, &facts).map_err(BookingError::rule)? {
            AbsenceStep::MarkAbsent => {
                uow.delete_availability(instructor_id, at).await?;
                uow.insert_absence(instructor_id, at).await?;
            }
            AbsenceStep::ClearAbsence { restore_availability } => {
                uow.delete_absence(instructor_id, at).await?;
                if restore_availability {
                    uow.insert_availability(instructor_id, at).await?;
                }
            }
            AbsenceStep::Noop => return Ok(()),
        }
        uow.commit().await
    }

    /// Materialises availability up to the rolling horizon and creates the class
    /// instances recurring classes owe inside it. Safe to run repeatedly.
    pub async fn extend_availability_horizon(&self, instructor_id: Uuid) -> BookingResult<HorizonReport> {
        let now = self.now();
        let horizon = self.policy.horizon_end(now);
        let mut uow = self.store.begin().await?;
        require_instructor(uow.as_mut(), instructor_id).await?;

        let versions = uow.schedules_for_instructor(instructor_id).await?;
        let end = self.policy.start_of_day(horizon)?;
        let availabilities_created =
            materialize_availability(uow.as_mut(), instructor_id, &versions, now, end, &self.policy).await?;

        let today = self.policy.local_date(now);
        let mut report = HorizonReport { availabilities_created, classes_created: 0, classes_skipped: 0 };
        let recurring = uow.recurring_classes_for_instructor(instructor_id).await?;
        for rc in recurring.iter().filter(|rc| rc.active_on_or_after(today)) {
            let Some(subscription) = uow.find_subscription(rc.subscription_id).await? else {
                warn!(recurring_class_id = %rc.id, "recurring class has no subscription");
                continue;
            };
            let (created, skipped) =
                materialize_recurring(uow.as_mut(), rc, subscription.customer_id, now, horizon, &self.policy)
                    .await?;
            report.classes_created += created;
            report.classes_skipped += skipped;
        }

        uow.commit().await?;
        info!(
            %instructor_id,
            availabilities = report.availabilities_created,
            classes = report.classes_created,
            skipped = report.classes_skipped,
            "availability horizon extended to {horizon}"
        );
        Ok(report)
    }
}
