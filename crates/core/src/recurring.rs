//! # Schedule Conflict Resolver
//!
//! Validation for opening or moving a weekly recurring class. A move never
//! rewrites the existing interval: the old one ends at the new start date and a
//! fresh interval begins there.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::{messages, BookingError, BookingResult};
use crate::models::class::RecurringClass;
use crate::models::schedule::{weekday_of, ScheduleWithSlots, SlotTime};
use crate::policy::SchedulingPolicy;
use crate::slots;

/// Requested weekly slot, before it becomes a [`RecurringClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySlot {
    pub instructor_id: Uuid,
    pub weekday: u8,
    pub start_time: SlotTime,
    pub start_date: NaiveDate,
}

pub fn ensure_start_date_lead(
    start_date: NaiveDate,
    now: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<()> {
    let earliest = policy.local_date(now) + policy.recurring_edit_lead;
    if start_date < earliest {
        return Err(BookingError::rule(messages::START_DATE_TOO_SOON));
    }
    Ok(())
}

pub fn ensure_supported_timezone(timezone: &str, policy: &SchedulingPolicy) -> BookingResult<()> {
    if timezone != policy.timezone_name() {
        return Err(BookingError::rule(messages::unsupported_timezone(
            policy.timezone_name(),
        )));
    }
    Ok(())
}

pub fn ensure_weekday(weekday: u8) -> BookingResult<()> {
    if weekday > 6 {
        return Err(BookingError::validation(format!(
            "Invalid weekday {weekday}: must be between 0 and 6"
        )));
    }
    Ok(())
}

/// First date on or after `from` that falls on `weekday`.
pub fn first_occurrence(from: NaiveDate, weekday: u8) -> NaiveDate {
    let offset = (i64::from(weekday) - i64::from(weekday_of(from))).rem_euclid(7);
    from + Duration::days(offset)
}

/// The instructor's schedule must offer the slot on the interval's first class.
pub fn ensure_slot_offered(
    versions: &[ScheduleWithSlots],
    slot: &WeeklySlot,
    policy: &SchedulingPolicy,
) -> BookingResult<()> {
    let first = first_occurrence(slot.start_date, slot.weekday);
    let at = policy.to_utc(first, slot.start_time)?;
    if !slots::offers_instant(versions, at, policy) {
        return Err(BookingError::rule(messages::INSTRUCTOR_UNAVAILABLE));
    }
    Ok(())
}

fn same_slot_from(rc: &RecurringClass, slot: &WeeklySlot, ignore: Option<Uuid>) -> bool {
    Some(rc.id) != ignore
        && rc.weekday == slot.weekday
        && rc.start_time == slot.start_time
        && rc.active_on_or_after(slot.start_date)
}

/// Another interval already holding the instructor's weekly slot.
pub fn find_duplicate<'a>(
    instructor_classes: &'a [RecurringClass],
    slot: &WeeklySlot,
    ignore: Option<Uuid>,
) -> Option<&'a RecurringClass> {
    instructor_classes
        .iter()
        .find(|rc| rc.instructor_id == slot.instructor_id && same_slot_from(rc, slot, ignore))
}

/// Another interval of the same family at the same weekly time, with any instructor.
pub fn find_family_collision<'a>(
    family_classes: &'a [RecurringClass],
    slot: &WeeklySlot,
    ignore: Option<Uuid>,
) -> Option<&'a RecurringClass> {
    family_classes.iter().find(|rc| same_slot_from(rc, slot, ignore))
}

pub fn ensure_no_collisions(
    instructor_classes: &[RecurringClass],
    family_classes: &[RecurringClass],
    slot: &WeeklySlot,
    ignore: Option<Uuid>,
) -> BookingResult<()> {
    if find_duplicate(instructor_classes, slot, ignore).is_some() {
        return Err(BookingError::rule(messages::DUPLICATE_RECURRING_CLASS));
    }
    if find_family_collision(family_classes, slot, ignore).is_some() {
        return Err(BookingError::rule(messages::FAMILY_RECURRING_CLASS));
    }
    Ok(())
}

/// Closes `old` at the slot's start date and returns the interval that replaces it.
pub fn split(
    old: &RecurringClass,
    slot: &WeeklySlot,
    child_ids: Vec<Uuid>,
) -> BookingResult<(RecurringClass, RecurringClass)> {
    if !old.active_on_or_after(slot.start_date) {
        return Err(BookingError::validation(format!(
            "Recurring class {} has already ended",
            old.id
        )));
    }
    if slot.start_date <= old.start_at {
        return Err(BookingError::validation(format!(
            "Start date {} must be after the current interval's start {}",
            slot.start_date, old.start_at
        )));
    }
    let mut closed = old.clone();
    closed.end_at = Some(slot.start_date);
    let opened = RecurringClass {
        id: Uuid::new_v4(),
        subscription_id: old.subscription_id,
        instructor_id: slot.instructor_id,
        weekday: slot.weekday,
        start_time: slot.start_time,
        start_at: slot.start_date,
        end_at: None,
        child_ids,
    };
    Ok((closed, opened))
}

/// Class instants the interval produces on local dates in `[from, until)`.
pub fn occurrences(
    rc: &RecurringClass,
    from: NaiveDate,
    until: NaiveDate,
    policy: &SchedulingPolicy,
) -> BookingResult<Vec<DateTime<Utc>>> {
    let mut date = first_occurrence(from.max(rc.start_at), rc.weekday);
    let mut instants = Vec::new();
    while date < until && rc.covers(date) {
        instants.push(policy.to_utc(date, rc.start_time)?);
        date += Duration::days(7);
    }
    Ok(instants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recurring(instructor: Uuid, weekday: u8, time: &str, start: NaiveDate, end: Option<NaiveDate>) -> RecurringClass {
        RecurringClass {
            id: Uuid::new_v4(),
            subscription_id: Uuid::new_v4(),
            instructor_id: instructor,
            weekday,
            start_time: time.parse().unwrap(),
            start_at: start,
            end_at: end,
            child_ids: vec![],
        }
    }

    #[rstest]
    #[case(date(2026, 10, 25), false)]
    #[case(date(2026, 10, 26), true)]
    #[case(date(2026, 12, 1), true)]
    fn start_date_needs_a_week(#[case] start: NaiveDate, #[case] ok: bool) {
        let policy = SchedulingPolicy::default();
        // 2026-10-19 10:00 in Tokyo.
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 1, 0, 0).unwrap();
        let result = ensure_start_date_lead(start, now, &policy);
        assert_eq!(result.is_ok(), ok);
        if let Err(err) = result {
            assert_eq!(err.to_string(), messages::START_DATE_TOO_SOON);
        }
    }

    #[test]
    fn only_business_timezone_is_supported() {
        let policy = SchedulingPolicy::default();
        assert!(ensure_supported_timezone("Asia/Tokyo", &policy).is_ok());
        let err = ensure_supported_timezone("America/New_York", &policy).unwrap_err();
        assert_eq!(err.to_string(), "Only Asia/Tokyo timezone is supported");
    }

    #[rstest]
    #[case(date(2026, 10, 19), 1, date(2026, 10, 19))]
    #[case(date(2026, 10, 19), 0, date(2026, 10, 25))]
    #[case(date(2026, 10, 21), 1, date(2026, 10, 26))]
    fn first_occurrence_rolls_forward(#[case] from: NaiveDate, #[case] weekday: u8, #[case] expected: NaiveDate) {
        assert_eq!(first_occurrence(from, weekday), expected);
    }

    #[test]
    fn duplicate_requires_overlapping_interval() {
        let instructor = Uuid::new_v4();
        let ended = recurring(instructor, 2, "16:00", date(2026, 1, 6), Some(date(2026, 11, 3)));
        let ongoing = recurring(instructor, 3, "16:00", date(2026, 1, 7), None);
        let existing = vec![ended, ongoing.clone()];

        let mut slot = WeeklySlot {
            instructor_id: instructor,
            weekday: 2,
            start_time: "16:00".parse().unwrap(),
            start_date: date(2026, 11, 3),
        };
        assert!(find_duplicate(&existing, &slot, None).is_none());

        slot.weekday = 3;
        assert_eq!(find_duplicate(&existing, &slot, None).map(|rc| rc.id), Some(ongoing.id));
        assert!(find_duplicate(&existing, &slot, Some(ongoing.id)).is_none());
        assert_eq!(
            ensure_no_collisions(&existing, &[], &slot, None).unwrap_err().to_string(),
            messages::DUPLICATE_RECURRING_CLASS
        );
    }

    #[test]
    fn split_closes_old_interval_at_start_date() {
        let old = recurring(Uuid::new_v4(), 1, "17:00", date(2026, 4, 6), None);
        let slot = WeeklySlot {
            instructor_id: Uuid::new_v4(),
            weekday: 4,
            start_time: "18:00".parse().unwrap(),
            start_date: date(2026, 11, 2),
        };
        let (closed, opened) = split(&old, &slot, vec![]).unwrap();
        assert_eq!(closed.end_at, Some(date(2026, 11, 2)));
        assert_eq!(closed.start_at, old.start_at);
        assert_eq!(opened.start_at, date(2026, 11, 2));
        assert_eq!(opened.subscription_id, old.subscription_id);
        assert_eq!(opened.end_at, None);
    }

    #[test]
    fn occurrences_stop_at_interval_end() {
        let policy = SchedulingPolicy::default();
        let rc = recurring(Uuid::new_v4(), 1, "17:00", date(2026, 10, 19), Some(date(2026, 11, 2)));
        let instants = occurrences(&rc, date(2026, 10, 1), date(2026, 12, 1), &policy).unwrap();
        assert_eq!(
            instants,
            vec![
                policy.to_utc(date(2026, 10, 19), "17:00".parse().unwrap()).unwrap(),
                policy.to_utc(date(2026, 10, 26), "17:00".parse().unwrap()).unwrap(),
            ]
        );
    }
}
