//! # Rebooking Ledger
//!
//! Status transitions that create and spend rebooking credits.
//!
//! | from                 | action               | to                     | credit window          |
//! |----------------------|----------------------|------------------------|------------------------|
//! | booked / rebooked    | customer cancels     | canceledByCustomer     | `rebook_window`        |
//! | booked / rebooked    | instructor cancels   | canceledByInstructor   | `rebook_window`        |
//! | freeTrial            | customer declines    | canceledByCustomer     | `free_trial_rebook_window` |
//!
//! Customers may only cancel strictly before the business-local day preceding
//! the class. Later cancellations are rejected and create no credit.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::errors::{messages, BookingError, BookingResult};
use crate::models::class::{Class, ClassStatus};
use crate::policy::SchedulingPolicy;

/// First instant at which a customer can no longer cancel: local midnight of
/// the day before the class.
pub fn customer_cancellation_cutoff(
    class: &Class,
    policy: &SchedulingPolicy,
) -> BookingResult<DateTime<Utc>> {
    let class_date = policy.local_date(class.date_time);
    let previous_day = class_date.pred_opt().ok_or_else(|| {
        BookingError::validation(format!("Class date {class_date} is out of range"))
    })?;
    policy.start_of_day(previous_day)
}

fn grant_credit(class: &mut Class, status: ClassStatus, now: DateTime<Utc>, window: Duration) {
    class.status = status;
    class.canceled_at = Some(now);
    class.is_rebookable = true;
    class.rebookable_until = Some(now + window);
}

fn not_cancelable(class: &Class) -> BookingError {
    BookingError::rule(format!("A class with status {} cannot be canceled", class.status))
}

pub fn cancel_by_customer(
    class: &mut Class,
    now: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<()> {
    if class.status == ClassStatus::FreeTrial {
        return decline_free_trial(class, now, policy);
    }
    if !matches!(class.status, ClassStatus::Booked | ClassStatus::Rebooked) {
        return Err(not_cancelable(class));
    }
    if now >= customer_cancellation_cutoff(class, policy)? {
        return Err(BookingError::rule(messages::CANCELLATION_TOO_LATE));
    }
    grant_credit(class, ClassStatus::CanceledByCustomer, now, policy.rebook_window);
    Ok(())
}

pub fn cancel_by_instructor(
    class: &mut Class,
    now: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<()> {
    if !matches!(class.status, ClassStatus::Booked | ClassStatus::Rebooked) {
        return Err(not_cancelable(class));
    }
    grant_credit(class, ClassStatus::CanceledByInstructor, now, policy.rebook_window);
    Ok(())
}

pub fn decline_free_trial(
    class: &mut Class,
    now: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<()> {
    if class.status != ClassStatus::FreeTrial {
        return Err(not_cancelable(class));
    }
    if now >= customer_cancellation_cutoff(class, policy)? {
        return Err(BookingError::rule(messages::CANCELLATION_TOO_LATE));
    }
    grant_credit(
        class,
        ClassStatus::CanceledByCustomer,
        now,
        policy.free_trial_rebook_window,
    );
    Ok(())
}

/// Latest request time at which the class's credit can still be spent.
pub fn spend_deadline(class: &Class, policy: &SchedulingPolicy) -> Option<DateTime<Utc>> {
    let lead = if class.is_free_trial {
        policy.free_trial_rebook_lead
    } else {
        policy.rebook_lead
    };
    class.rebookable_until.map(|until| until - lead)
}

pub fn ensure_spendable(
    class: &Class,
    now: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<()> {
    if !class.status.is_canceled() || !class.is_rebookable {
        return Err(BookingError::validation(format!(
            "Class {} has no rebooking credit",
            class.id
        )));
    }
    let deadline = spend_deadline(class, policy).ok_or_else(|| {
        BookingError::validation(format!("Class {} has no rebooking deadline", class.id))
    })?;
    if now > deadline {
        return Err(BookingError::validation(messages::REBOOK_DEADLINE_PASSED));
    }
    Ok(())
}

/// Marks the credit as used by `rebooked_class_id`.
pub fn spend(class: &mut Class, rebooked_class_id: Uuid) {
    class.is_rebookable = false;
    class.rebookable_until = None;
    class.rebooked_class_id = Some(rebooked_class_id);
}

/// New classes must start at least `rebook_lead` after the request.
pub fn ensure_booking_lead(
    at: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> BookingResult<()> {
    if at < now + policy.rebook_lead {
        return Err(BookingError::validation(format!(
            "Classes must be booked at least {} hours in advance",
            policy.rebook_lead.num_hours()
        )));
    }
    Ok(())
}
