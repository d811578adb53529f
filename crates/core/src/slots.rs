//! # Time-Slot Generator
//!
//! Expands versioned weekly schedules into concrete UTC instants.
//!
//! A schedule version governs the business-local dates in its
//! `[effective_from, effective_to)` window. When two windows cover the same date
//! the version with the later `effective_from` wins, so a date never yields slots
//! from two versions.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::HashSet;

use crate::errors::{BookingError, BookingResult};
use crate::models::schedule::{weekday_of, ScheduleWithSlots};
use crate::policy::{SchedulingPolicy, SUPPORTED_YEARS};

pub fn validate_instant(at: DateTime<Utc>) -> BookingResult<()> {
    if !SUPPORTED_YEARS.contains(&at.year()) {
        return Err(BookingError::validation(format!("Date-time {at} is out of the supported range")));
    }
    Ok(())
}

pub fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> BookingResult<()> {
    validate_instant(start)?;
    validate_instant(end)?;
    if start >= end {
        return Err(BookingError::validation(format!(
            "Invalid date range: start {start} must be before end {end}"
        )));
    }
    Ok(())
}

/// The version in force on a business-local date.
pub fn governing_version(versions: &[ScheduleWithSlots], date: NaiveDate) -> Option<&ScheduleWithSlots> {
    versions
        .iter()
        .filter(|v| v.schedule.covers(date))
        .max_by_key(|v| v.schedule.effective_from)
}

/// Every instant in `[start, end)` produced by the governing versions, ascending
/// and deduplicated. Times closed by the business-hours table are skipped.
pub fn expand(
    versions: &[ScheduleWithSlots],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<Vec<DateTime<Utc>>> {
    validate_range(start, end)?;

    let first = policy.local_date(start);
    let last = policy.local_date(end);
    let relevant: Vec<ScheduleWithSlots> = versions
        .iter()
        .filter(|v| v.schedule.overlaps(first, last.succ_opt().unwrap_or(last)))
        .cloned()
        .collect();
    if relevant.is_empty() {
        return Ok(Vec::new());
    }

    let mut instants = Vec::new();
    for date in first.iter_days().take_while(|d| *d <= last) {
        let Some(version) = governing_version(&relevant, date) else {
            continue;
        };
        let weekday = weekday_of(date);
        for slot in version.slots.iter().filter(|s| s.weekday == weekday) {
            if !policy.business_hours.allows(weekday, slot.start_time) {
                continue;
            }
            let at = policy.to_utc(date, slot.start_time)?;
            if at >= start && at < end {
                instants.push(at);
            }
        }
    }

    instants.sort();
    instants.dedup();
    Ok(instants)
}

/// Whether the schedule history offers exactly this instant.
pub fn offers_instant(
    versions: &[ScheduleWithSlots],
    at: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> bool {
    let date = policy.local_date(at);
    let (weekday, start_time) = policy.local_slot(at);
    governing_version(versions, date).is_some_and(|v| v.has_slot(weekday, start_time))
        && policy.business_hours.allows(weekday, start_time)
        && policy.to_utc(date, start_time).is_ok_and(|exact| exact == at)
}

pub fn without(
    instants: Vec<DateTime<Utc>>,
    taken: impl IntoIterator<Item = DateTime<Utc>>,
) -> Vec<DateTime<Utc>> {
    let taken: HashSet<DateTime<Utc>> = taken.into_iter().collect();
    if taken.is_empty() {
        return instants;
    }
    instants.into_iter().filter(|at| !taken.contains(at)).collect()
}
