use chrono::{NaiveDate, SecondsFormat};
use tracing::{debug, info};
use uuid::Uuid;

use super::{authorize_instructor, materialize_availability, open_end, require_instructor, SchedulingService};
use crate::errors::{BookingError, BookingResult};
use crate::models::people::Identity;
use crate::models::schedule::{CreateScheduleRequest, ScheduleWithSlots, TerminateAvailabilityResponse};
use crate::versioning;

impl SchedulingService {
    /// Opens a new schedule version and closes the current one at the same date.
    /// Stored availability from that date on is brought in line with the new
    /// history: stale unbooked rows go, newly offered instants are added.
    pub async fn create_instructor_schedule(
        &self,
        identity: &Identity,
        instructor_id: Uuid,
        request: &CreateScheduleRequest,
    ) -> BookingResult<ScheduleWithSlots> {
        authorize_instructor(identity, instructor_id)?;
        versioning::validate_slots(&request.slots)?;
        let now = self.now();
        let mut uow = self.store.begin().await?;
        require_instructor(uow.as_mut(), instructor_id).await?;

        let mut versions = uow.schedules_for_instructor(instructor_id).await?;
        if let Some(current) = versioning::version_to_close(&versions, request.effective_from)? {
            uow.close_schedule(current.id, request.effective_from).await?;
        }
        let version = versioning::build_version(instructor_id, request.effective_from, &request.slots);
        uow.insert_schedule(&version).await?;
        versioning::supersede(&mut versions, version.clone());

        let from = self.policy.start_of_day(request.effective_from)?.max(now);
        let until = open_end(from)?;
        let materialized = uow.availabilities_between(instructor_id, from, until).await?;
        let held = uow.instructor_classes_between(instructor_id, from, until).await?;
        let stale = versioning::stale_instants(&materialized, &versions, &held, &self.policy);
        for at in &stale {
            uow.delete_availability(instructor_id, *at).await?;
        }

        let created = match versioning::materialization_window(request.effective_from, now, &self.policy)? {
            Some((start, end)) => {
                materialize_availability(uow.as_mut(), instructor_id, &versions, start, end, &self.policy)
                    .await?
            }
            None => 0,
        };

        uow.commit().await?;
        info!(
            %instructor_id,
            schedule_id = %version.schedule.id,
            effective_from = %request.effective_from,
            removed = stale.len(),
            created,
            "schedule version created"
        );
        Ok(version)
    }

    pub async fn list_schedules(&self, instructor_id: Uuid) -> BookingResult<Vec<ScheduleWithSlots>> {
        let mut uow = self.store.begin().await?;
        require_instructor(uow.as_mut(), instructor_id).await?;
        let versions = uow.schedules_for_instructor(instructor_id).await?;
        debug!(%instructor_id, count = versions.len(), "listed schedules");
        Ok(versions)
    }

    /// Ends a schedule version at `end_at`. Refused while an active class sits on
    /// one of its slots on or after that date.
    pub async fn terminate_recurring_availability(
        &self,
        identity: &Identity,
        instructor_id: Uuid,
        schedule_id: Uuid,
        end_at: NaiveDate,
    ) -> BookingResult<TerminateAvailabilityResponse> {
        authorize_instructor(identity, instructor_id)?;
        let now = self.now();
        let mut uow = self.store.begin().await?;
        require_instructor(uow.as_mut(), instructor_id).await?;

        let mut versions = uow.schedules_for_instructor(instructor_id).await?;
        let position = versions
            .iter()
            .position(|v| v.schedule.id == schedule_id)
            .ok_or_else(|| {
                BookingError::not_found(format!(
                    "Schedule {schedule_id} not found for instructor {instructor_id}"
                ))
            })?;
        versioning::validate_termination(&versions[position].schedule, end_at)?;

        let from = self.policy.start_of_day(end_at)?;
        let until = open_end(from.max(now))?;
        let classes = uow.instructor_classes_between(instructor_id, from, until).await?;
        if let Some(class) = versioning::termination_conflict(&versions[position], end_at, &classes, &self.policy) {
            return Err(BookingError::Conflict(format!(
                "Cannot terminate availability: class {} is booked at {}",
                class.id,
                class.date_time.to_rfc3339_opts(SecondsFormat::Secs, true)
            )));
        }

        uow.close_schedule(schedule_id, end_at).await?;
        versions[position].schedule.effective_to = Some(end_at);

        let materialized = uow.availabilities_between(instructor_id, from.max(now), until).await?;
        let stale = versioning::stale_instants(&materialized, &versions, &classes, &self.policy);
        for at in &stale {
            uow.delete_availability(instructor_id, *at).await?;
        }
        uow.commit().await?;

        info!(%instructor_id, %schedule_id, %end_at, removed = stale.len(), "schedule terminated");
        Ok(TerminateAvailabilityResponse {
            schedule: versions[position].schedule.clone(),
            removed_availabilities: stale.len(),
        })
    }
}
