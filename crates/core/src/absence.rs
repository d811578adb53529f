//! # Absence Overlay
//!
//! Decides, one change at a time, how an instructor's absence request affects
//! the stored availability. Batches are never rolled back as a whole: the
//! service applies each planned step in its own unit of work and reports the
//! per-item outcome through [`BatchAbsenceResult`].

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::models::availability::{AbsenceAction, AbsenceChange, AbsenceChangeError, BatchAbsenceResult};

/// What the store currently says about one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsenceFacts {
    pub is_past: bool,
    pub is_absent: bool,
    pub is_available: bool,
    pub booked_class: Option<Uuid>,
    pub offered_by_schedule: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsenceStep {
    /// Drop the materialised availability row and record the absence.
    MarkAbsent,
    /// Delete the absence, restoring the availability row when the schedule still offers it.
    ClearAbsence { restore_availability: bool },
    Noop,
}

fn instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn plan(change: &AbsenceChange, facts: &AbsenceFacts) -> Result<AbsenceStep, String> {
    if facts.is_past {
        return Err(format!(
            "Cannot change absence for {}: the time slot is in the past",
            instant(change.date_time)
        ));
    }

    match change.action {
        AbsenceAction::Add => {
            if let Some(class_id) = facts.booked_class {
                return Err(format!(
                    "Cannot mark {} as absent: class {class_id} is booked at this time",
                    instant(change.date_time)
                ));
            }
            if facts.is_absent {
                return Ok(AbsenceStep::Noop);
            }
            if !facts.is_available {
                return Err(format!(
                    "Cannot mark {} as absent: it is not an available time slot",
                    instant(change.date_time)
                ));
            }
            Ok(AbsenceStep::MarkAbsent)
        }
        // Removing a missing absence counts as a success with no effect.
        AbsenceAction::Remove if !facts.is_absent => Ok(AbsenceStep::Noop),
        AbsenceAction::Remove => Ok(AbsenceStep::ClearAbsence {
            restore_availability: facts.offered_by_schedule,
        }),
    }
}

impl BatchAbsenceResult {
    pub fn record(&mut self, change: &AbsenceChange, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => match change.action {
                AbsenceAction::Add => self.success_count.add += 1,
                AbsenceAction::Remove => self.success_count.remove += 1,
            },
            Err(message) => self.errors.push(AbsenceChangeError {
                date_time: change.date_time,
                action: change.action,
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn change(action: AbsenceAction) -> AbsenceChange {
        AbsenceChange {
            date_time: Utc.with_ymd_and_hms(2026, 11, 2, 8, 0, 0).unwrap(),
            action,
        }
    }

    #[rstest]
    #[case::available(AbsenceFacts { is_available: true, ..Default::default() }, Ok(AbsenceStep::MarkAbsent))]
    #[case::already_absent(AbsenceFacts { is_absent: true, ..Default::default() }, Ok(AbsenceStep::Noop))]
    fn add_plans(#[case] facts: AbsenceFacts, #[case] expected: Result<AbsenceStep, String>) {
        assert_eq!(plan(&change(AbsenceAction::Add), &facts), expected);
    }

    #[test]
    fn add_on_booked_instant_names_the_instant() {
        let facts = AbsenceFacts {
            is_available: true,
            booked_class: Some(Uuid::nil()),
            ..Default::default()
        };
        let err = plan(&change(AbsenceAction::Add), &facts).unwrap_err();
        assert!(err.contains("2026-11-02T08:00:00Z"));
    }

    #[test]
    fn add_on_unoffered_instant_fails() {
        assert!(plan(&change(AbsenceAction::Add), &AbsenceFacts::default()).is_err());
    }

    #[rstest]
    #[case(AbsenceFacts::default(), AbsenceStep::Noop)]
    #[case(
        AbsenceFacts { is_absent: true, offered_by_schedule: true, ..Default::default() },
        AbsenceStep::ClearAbsence { restore_availability: true }
    )]
    #[case(
        AbsenceFacts { is_absent: true, ..Default::default() },
        AbsenceStep::ClearAbsence { restore_availability: false }
    )]
    fn remove_plans(#[case] facts: AbsenceFacts, #[case] expected: AbsenceStep) {
        assert_eq!(plan(&change(AbsenceAction::Remove), &facts), Ok(expected));
    }

    #[test]
    fn past_instants_are_rejected_for_both_actions() {
        let facts = AbsenceFacts { is_past: true, is_absent: true, ..Default::default() };
        assert!(plan(&change(AbsenceAction::Add), &facts).is_err());
        assert!(plan(&change(AbsenceAction::Remove), &facts).is_err());
    }

    #[test]
    fn record_counts_successes_per_action() {
        let mut result = BatchAbsenceResult::default();
        result.record(&change(AbsenceAction::Add), Ok(()));
        result.record(&change(AbsenceAction::Remove), Ok(()));
        result.record(&change(AbsenceAction::Add), Err("nope".to_string()));
        assert_eq!(result.success_count.add, 1);
        assert_eq!(result.success_count.remove, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "nope");
    }
}
