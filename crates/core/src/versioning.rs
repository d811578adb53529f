//! # Recurring Schedule Versioner
//!
//! An instructor's weekly pattern is never edited in place. A new version opens
//! at its `effective_from` date and the previously open version is closed at
//! that same date, so at most one version per instructor has no `effective_to`.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult};
use crate::models::class::Class;
use crate::models::schedule::{InstructorSchedule, ScheduleSlot, ScheduleWithSlots, SlotRequest};
use crate::policy::SchedulingPolicy;
use crate::slots;

pub fn validate_slots(slots: &[SlotRequest]) -> BookingResult<()> {
    let mut seen = HashSet::new();
    for slot in slots {
        if slot.weekday > 6 {
            return Err(BookingError::validation(format!(
                "Invalid weekday {}: must be between 0 and 6",
                slot.weekday
            )));
        }
        if !seen.insert((slot.weekday, slot.start_time)) {
            return Err(BookingError::validation(format!(
                "Duplicate slot: weekday {} at {}",
                slot.weekday, slot.start_time
            )));
        }
    }
    Ok(())
}

pub fn build_version(
    instructor_id: Uuid,
    effective_from: NaiveDate,
    slots: &[SlotRequest],
) -> ScheduleWithSlots {
    let id = Uuid::new_v4();
    ScheduleWithSlots {
        schedule: InstructorSchedule {
            id,
            instructor_id,
            effective_from,
            effective_to: None,
        },
        slots: slots
            .iter()
            .map(|s| ScheduleSlot {
                schedule_id: id,
                weekday: s.weekday,
                start_time: s.start_time,
            })
            .collect(),
    }
}

/// The open version that `effective_from` supersedes, if any.
pub fn version_to_close(
    versions: &[ScheduleWithSlots],
    effective_from: NaiveDate,
) -> BookingResult<Option<&InstructorSchedule>> {
    let Some(current) = versions.iter().map(|v| &v.schedule).find(|s| s.is_open()) else {
        return Ok(None);
    };
    if effective_from <= current.effective_from {
        return Err(BookingError::validation(format!(
            "effectiveFrom {effective_from} must be after the current schedule's effectiveFrom {}",
            current.effective_from
        )));
    }
    Ok(Some(current))
}

/// Applies the close-then-open step to an in-memory copy of the history.
pub fn supersede(versions: &mut Vec<ScheduleWithSlots>, new_version: ScheduleWithSlots) {
    let effective_from = new_version.schedule.effective_from;
    for version in versions.iter_mut().filter(|v| v.schedule.is_open()) {
        version.schedule.effective_to = Some(effective_from);
    }
    versions.push(new_version);
}

/// Instant range materialisation should cover for a version starting at
/// `effective_from`, or `None` when it lies beyond the horizon.
pub fn materialization_window(
    effective_from: NaiveDate,
    now: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
    let start = policy.start_of_day(effective_from)?.max(now);
    let end = policy.start_of_day(policy.horizon_end(now))?;
    Ok((start < end).then_some((start, end)))
}

/// Materialised instants the history no longer offers and no class holds.
pub fn stale_instants(
    materialized: &[DateTime<Utc>],
    versions: &[ScheduleWithSlots],
    held: &[Class],
    policy: &SchedulingPolicy,
) -> Vec<DateTime<Utc>> {
    let held: HashSet<DateTime<Utc>> = held
        .iter()
        .filter(|c| c.status.is_active())
        .map(|c| c.date_time)
        .collect();
    materialized
        .iter()
        .copied()
        .filter(|at| !held.contains(at) && !slots::offers_instant(versions, *at, policy))
        .collect()
}

pub fn validate_termination(schedule: &InstructorSchedule, end_at: NaiveDate) -> BookingResult<()> {
    if end_at < schedule.effective_from {
        return Err(BookingError::validation(format!(
            "endAt {end_at} is before the schedule's effectiveFrom {}",
            schedule.effective_from
        )));
    }
    if schedule.effective_to.is_some_and(|to| end_at >= to) {
        return Err(BookingError::validation(format!(
            "Schedule {} already ends before {end_at}",
            schedule.id
        )));
    }
    Ok(())
}

/// First active class at or after `end_at` that sits on one of the version's slots.
pub fn termination_conflict<'a>(
    version: &ScheduleWithSlots,
    end_at: NaiveDate,
    classes: &'a [Class],
    policy: &SchedulingPolicy,
) -> Option<&'a Class> {
    let mut ordered: Vec<&Class> = classes.iter().filter(|c| c.status.is_active()).collect();
    ordered.sort_by_key(|c| c.date_time);
    ordered.into_iter().find(|class| {
        let date = policy.local_date(class.date_time);
        let (weekday, start_time) = policy.local_slot(class.date_time);
        date >= end_at && version.schedule.covers(date) && version.has_slot(weekday, start_time)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::class::ClassStatus;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn slot(weekday: u8, time: &str) -> SlotRequest {
        SlotRequest { weekday, start_time: time.parse().unwrap() }
    }

    #[test]
    fn rejects_bad_weekday_and_duplicates() {
        assert!(validate_slots(&[slot(7, "10:00")]).is_err());
        assert!(validate_slots(&[slot(1, "10:00"), slot(1, "10:00")]).is_err());
        assert!(validate_slots(&[slot(1, "10:00"), slot(2, "10:00")]).is_ok());
    }

    #[test]
    fn supersede_keeps_a_single_open_version() {
        let instructor = Uuid::new_v4();
        let mut versions = vec![build_version(instructor, date(2026, 10, 1), &[slot(1, "17:00")])];

        for from in [date(2026, 11, 2), date(2026, 12, 7)] {
            assert!(version_to_close(&versions, from).unwrap().is_some());
            supersede(&mut versions, build_version(instructor, from, &[slot(2, "17:00")]));
        }

        let open: Vec<_> = versions.iter().filter(|v| v.schedule.is_open()).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].schedule.effective_from, date(2026, 12, 7));
        assert_eq!(versions[0].schedule.effective_to, Some(date(2026, 11, 2)));
        assert_eq!(versions[1].schedule.effective_to, Some(date(2026, 12, 7)));
    }

    #[test]
    fn new_version_must_start_after_current() {
        let versions = vec![build_version(Uuid::new_v4(), date(2026, 11, 2), &[])];
        assert!(version_to_close(&versions, date(2026, 11, 2)).is_err());
        assert!(version_to_close(&versions, date(2026, 10, 1)).is_err());
    }

    #[test]
    fn stale_instants_spare_held_slots() {
        let policy = SchedulingPolicy::default();
        let instructor = Uuid::new_v4();
        let mut versions = vec![build_version(instructor, date(2026, 10, 1), &[slot(1, "17:00")])];
        supersede(&mut versions, build_version(instructor, date(2026, 11, 1), &[slot(1, "18:00")]));

        let held_at = policy.to_utc(date(2026, 11, 2), "17:00".parse().unwrap()).unwrap();
        let free_at = policy.to_utc(date(2026, 11, 9), "17:00".parse().unwrap()).unwrap();
        let kept_at = policy.to_utc(date(2026, 11, 9), "18:00".parse().unwrap()).unwrap();
        let held = Class::new(instructor, Uuid::new_v4(), held_at, ClassStatus::Booked, vec![Uuid::new_v4()]);

        let stale = stale_instants(&[held_at, free_at, kept_at], &versions, &[held], &policy);
        assert_eq!(stale, vec![free_at]);
    }

    #[test]
    fn termination_conflict_finds_booked_slot() {
        let policy = SchedulingPolicy::default();
        let instructor = Uuid::new_v4();
        let version = build_version(instructor, date(2026, 10, 1), &[slot(1, "17:00")]);
        let before = policy.to_utc(date(2026, 11, 2), "17:00".parse().unwrap()).unwrap();
        let after = policy.to_utc(date(2026, 11, 16), "17:00".parse().unwrap()).unwrap();
        let classes = vec![
            Class::new(instructor, Uuid::new_v4(), before, ClassStatus::Booked, vec![]),
            Class::new(instructor, Uuid::new_v4(), after, ClassStatus::Rebooked, vec![]),
        ];

        let conflict = termination_conflict(&version, date(2026, 11, 9), &classes, &policy);
        assert_eq!(conflict.map(|c| c.date_time), Some(after));
        assert!(termination_conflict(&version, date(2026, 11, 17), &classes, &policy).is_none());
    }
}
