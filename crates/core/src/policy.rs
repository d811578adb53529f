//! Business constants and business-timezone arithmetic.
//!
//! Every weekly slot is defined in one fixed business timezone. All conversions
//! between local wall-clock times and UTC instants go through [`SchedulingPolicy`]
//! so the zone is configured in exactly one place.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::ops::RangeInclusive;
use chrono_tz::Tz;

use crate::errors::{BookingError, BookingResult};
use crate::models::schedule::{weekday_of, SlotTime};

pub const DEFAULT_BUSINESS_TIMEZONE: Tz = Tz::Asia__Tokyo;

/// Calendar years the engine converts and offsets. Caller input outside them
/// is refused before any arithmetic runs on it.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1970..=9999;

pub fn validate_date(date: NaiveDate) -> BookingResult<()> {
    if !SUPPORTED_YEARS.contains(&date.year()) {
        return Err(BookingError::validation(format!("Date {date} is out of the supported range")));
    }
    Ok(())
}

/// Start times the business offers at all, independent of any instructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessHours {
    pub earliest_start: SlotTime,
    pub latest_start: SlotTime,
    /// Individual (weekday, start time) pairs that are closed.
    pub disabled: Vec<(u8, SlotTime)>,
}

impl BusinessHours {
    pub fn allows(&self, weekday: u8, start_time: SlotTime) -> bool {
        start_time >= self.earliest_start
            && start_time <= self.latest_start
            && !self
                .disabled
                .iter()
                .any(|&(day, time)| day == weekday && time == start_time)
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            earliest_start: SlotTime::new(9, 0).unwrap_or_default(),
            latest_start: SlotTime::new(21, 0).unwrap_or_default(),
            disabled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulingPolicy {
    pub timezone: Tz,
    /// Credit window granted by customer and instructor cancellations.
    pub rebook_window: Duration,
    pub free_trial_rebook_window: Duration,
    /// How long before `rebookable_until` an ordinary credit must be spent. Also the
    /// minimum gap between now and the start of any newly booked class.
    pub rebook_lead: Duration,
    pub free_trial_rebook_lead: Duration,
    pub recurring_edit_lead: Duration,
    pub generation_horizon: Duration,
    pub business_hours: BusinessHours,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_BUSINESS_TIMEZONE,
            rebook_window: Duration::days(180),
            free_trial_rebook_window: Duration::days(30),
            rebook_lead: Duration::hours(3),
            free_trial_rebook_lead: Duration::hours(1),
            recurring_edit_lead: Duration::days(7),
            generation_horizon: Duration::weeks(12),
            business_hours: BusinessHours::default(),
        }
    }
}

impl SchedulingPolicy {
    pub fn timezone_name(&self) -> &'static str {
        self.timezone.name()
    }

    /// Business-local calendar date of an instant.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    /// Business-local weekday and wall-clock time of an instant.
    pub fn local_slot(&self, at: DateTime<Utc>) -> (u8, SlotTime) {
        let local = at.with_timezone(&self.timezone);
        (weekday_of(local.date_naive()), SlotTime::from(local.time()))
    }

    pub fn to_utc(&self, date: NaiveDate, time: SlotTime) -> BookingResult<DateTime<Utc>> {
        validate_date(date)?;
        let naive = date.and_time(time.as_naive());
        self.timezone
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| {
                BookingError::validation(format!(
                    "{naive} does not exist in {}",
                    self.timezone_name()
                ))
            })
    }

    /// UTC instant of local midnight starting `date`.
    pub fn start_of_day(&self, date: NaiveDate) -> BookingResult<DateTime<Utc>> {
        self.to_utc(date, SlotTime::from(chrono::NaiveTime::MIN))
    }

    /// Last local date (exclusive) that materialisation reaches from `now`.
    pub fn horizon_end(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_date(now) + self.generation_horizon
    }
}
