//! # Conflict Detector
//!
//! Three independent checks guard every booking:
//!
//! 1. the instructor must offer the instant and not already teach then (hard block)
//! 2. no target child may attend another instructor's class then (soft)
//! 3. the customer must not already hold a class then (soft)
//!
//! Soft conflicts never fail an operation on their own. They are returned as
//! [`SoftConflicts`] so the caller can ask for confirmation and retry.

use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::messages;
use crate::models::class::{ChildConflict, Class, ConflictCheck, SoftConflicts};
use crate::models::people::Child;

#[derive(Debug, Clone, Copy)]
pub struct BookingTarget<'a> {
    pub instructor_id: Uuid,
    pub customer_id: Uuid,
    pub children_ids: &'a [Uuid],
    /// Class being moved by a rebooking; it never conflicts with itself.
    pub exclude_class_id: Option<Uuid>,
}

impl BookingTarget<'_> {
    fn considers(&self, class: &Class) -> bool {
        class.status.is_active() && Some(class.id) != self.exclude_class_id
    }
}

/// Hard check: the instant is materialised for the instructor and nobody holds it.
pub fn check_instructor(
    target: &BookingTarget<'_>,
    is_available: bool,
    classes_at: &[Class],
) -> Result<(), String> {
    let occupied = classes_at
        .iter()
        .any(|c| c.instructor_id == target.instructor_id && target.considers(c));
    if !is_available || occupied {
        return Err(messages::INSTRUCTOR_UNAVAILABLE.to_string());
    }
    Ok(())
}

/// Target children already attending a different instructor's class at the instant.
pub fn child_conflicts(
    target: &BookingTarget<'_>,
    classes_at: &[Class],
    children: &[Child],
) -> Vec<ChildConflict> {
    let names: HashMap<Uuid, &str> = children.iter().map(|c| (c.id, c.name.as_str())).collect();
    let mut conflicts = Vec::new();
    for class in classes_at
        .iter()
        .filter(|c| target.considers(c) && c.instructor_id != target.instructor_id)
    {
        for child_id in class
            .child_ids
            .iter()
            .filter(|id| target.children_ids.contains(id))
        {
            conflicts.push(ChildConflict {
                child_id: *child_id,
                child_name: names.get(child_id).copied().unwrap_or_default().to_string(),
                class_id: class.id,
                instructor_id: class.instructor_id,
            });
        }
    }
    conflicts
}

/// Classes the customer already holds at the instant, whoever teaches them.
pub fn double_bookings(target: &BookingTarget<'_>, classes_at: &[Class]) -> Vec<Uuid> {
    classes_at
        .iter()
        .filter(|c| target.considers(c) && c.customer_id == target.customer_id)
        .map(|c| c.id)
        .collect()
}

pub fn evaluate(
    target: &BookingTarget<'_>,
    is_available: bool,
    classes_at: &[Class],
    children: &[Child],
) -> ConflictCheck {
    if let Err(reason) = check_instructor(target, is_available, classes_at) {
        return ConflictCheck::Blocked { reason };
    }
    let conflicts = SoftConflicts {
        child_conflicts: child_conflicts(target, classes_at, children),
        double_bookings: double_bookings(target, classes_at),
    };
    if conflicts.is_empty() {
        ConflictCheck::Clear
    } else {
        ConflictCheck::Warning { conflicts }
    }
}
