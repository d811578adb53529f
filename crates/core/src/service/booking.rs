use tracing::{debug, info};
use uuid::Uuid;

use super::{
    authorize_customer, evaluate_booking, require_children, require_instructor, SchedulingService,
};
use crate::conflict::BookingTarget;
use crate::errors::{BookingError, BookingResult};
use crate::models::class::{
    BookClassRequest, BookingOutcome, Class, ClassStatus, ConflictCheck, ConflictCheckRequest,
    RebookClassRequest, RebookOutcome,
};
use crate::models::people::{Identity, UserType};
use crate::notify::Notification;
use crate::rebooking;
use crate::slots;

impl SchedulingService {
    /// Dry run of the checks a booking at the requested instant would face.
    pub async fn check_conflicts(&self, request: &ConflictCheckRequest) -> BookingResult<ConflictCheck> {
        slots::validate_instant(request.date_time)?;
        let mut uow = self.store.begin().await?;
        require_instructor(uow.as_mut(), request.instructor_id).await?;
        let children = uow.find_children(&request.children_ids).await?;

        let target = BookingTarget {
            instructor_id: request.instructor_id,
            customer_id: request.customer_id,
            children_ids: &request.children_ids,
            exclude_class_id: request.exclude_class_id,
        };
        let check = evaluate_booking(uow.as_mut(), &target, request.date_time, &children).await?;
        debug!(instructor_id = %request.instructor_id, at = %request.date_time, ?check, "conflict check");
        Ok(check)
    }

    pub async fn book_class(&self, identity: &Identity, request: &BookClassRequest) -> BookingResult<BookingOutcome> {
        authorize_customer(identity, request.customer_id)?;
        slots::validate_instant(request.date_time)?;
        let now = self.now();
        let mut uow = self.store.begin().await?;

        require_instructor(uow.as_mut(), request.instructor_id).await?;
        if uow.find_customer(request.customer_id).await?.is_none() {
            return Err(BookingError::not_found(format!(
                "Customer with ID {} not found",
                request.customer_id
            )));
        }
        let children = require_children(uow.as_mut(), request.customer_id, &request.children_ids).await?;
        rebooking::ensure_booking_lead(request.date_time, now, &self.policy)?;

        let target = BookingTarget {
            instructor_id: request.instructor_id,
            customer_id: request.customer_id,
            children_ids: &request.children_ids,
            exclude_class_id: None,
        };
        match evaluate_booking(uow.as_mut(), &target, request.date_time, &children).await? {
            ConflictCheck::Blocked { reason } => return Err(BookingError::rule(reason)),
            ConflictCheck::Warning { conflicts } if !request.confirmed => {
                debug!(customer_id = %request.customer_id, "booking needs confirmation");
                return Ok(BookingOutcome::NeedsConfirmation { conflicts });
            }
            _ => {}
        }

        let status = if request.free_trial {
            ClassStatus::FreeTrial
        } else {
            ClassStatus::Booked
        };
        let class = Class::new(
            request.instructor_id,
            request.customer_id,
            request.date_time,
            status,
            request.children_ids.clone(),
        );
        uow.insert_class(&class).await.map_err(BookingError::into_slot_taken)?;
        uow.commit().await.map_err(BookingError::into_slot_taken)?;

        info!(class_id = %class.id, code = %class.class_code, status = %class.status, "class booked");
        self.dispatch(Notification::ClassBooked {
            class_id: class.id,
            customer_id: class.customer_id,
            instructor_id: class.instructor_id,
            date_time: class.date_time,
        })
        .await;
        Ok(BookingOutcome::Booked { class })
    }

    /// Customers cancel their own classes under the previous-day cutoff.
    /// Instructors cancel their own classes at any time. Both create a credit.
    pub async fn cancel_class(&self, identity: &Identity, class_id: Uuid) -> BookingResult<Class> {
        let now = self.now();
        let mut uow = self.store.begin().await?;
        let mut class = uow
            .find_class(class_id)
            .await?
            .ok_or_else(|| BookingError::not_found(format!("Class with ID {class_id} not found")))?;

        match identity.user_type {
            UserType::Customer if class.customer_id == identity.user_id => {
                rebooking::cancel_by_customer(&mut class, now, &self.policy)?
            }
            UserType::Instructor if class.instructor_id == identity.user_id => {
                rebooking::cancel_by_instructor(&mut class, now, &self.policy)?
            }
            UserType::Admin => rebooking::cancel_by_instructor(&mut class, now, &self.policy)?,
            _ => {
                return Err(BookingError::Authorization(format!(
                    "{} {} cannot cancel class {class_id}",
                    identity.user_type, identity.user_id
                )));
            }
        }

        uow.update_class(&class).await?;
        uow.commit().await?;

        info!(%class_id, status = %class.status, rebookable_until = ?class.rebookable_until, "class canceled");
        self.dispatch(Notification::ClassCanceled {
            class_id: class.id,
            customer_id: class.customer_id,
            instructor_id: class.instructor_id,
            date_time: class.date_time,
            rebookable_until: class.rebookable_until,
        })
        .await;
        Ok(class)
    }

    /// Spends the credit of a canceled class on a new one. The new class and the
    /// consumed credit commit together or not at all.
    pub async fn rebook_class(
        &self,
        identity: &Identity,
        class_id: Uuid,
        request: &RebookClassRequest,
    ) -> BookingResult<RebookOutcome> {
        slots::validate_instant(request.date_time)?;
        let now = self.now();
        let mut uow = self.store.begin().await?;
        let mut original = uow
            .find_class(class_id)
            .await?
            .ok_or_else(|| BookingError::not_found(format!("Class with ID {class_id} not found")))?;

        authorize_customer(identity, original.customer_id)?;
        if request.customer_id != original.customer_id {
            return Err(BookingError::validation(format!(
                "Class {class_id} does not belong to customer {}",
                request.customer_id
            )));
        }
        rebooking::ensure_spendable(&original, now, &self.policy)?;

        require_instructor(uow.as_mut(), request.instructor_id).await?;
        let children = require_children(uow.as_mut(), request.customer_id, &request.children_ids).await?;
        rebooking::ensure_booking_lead(request.date_time, now, &self.policy)?;

        let target = BookingTarget {
            instructor_id: request.instructor_id,
            customer_id: request.customer_id,
            children_ids: &request.children_ids,
            exclude_class_id: Some(original.id),
        };
        match evaluate_booking(uow.as_mut(), &target, request.date_time, &children).await? {
            ConflictCheck::Blocked { reason } => return Err(BookingError::rule(reason)),
            ConflictCheck::Warning { conflicts } if !request.confirmed => {
                return Ok(RebookOutcome::NeedsConfirmation { conflicts });
            }
            _ => {}
        }

        let class = Class::new(
            request.instructor_id,
            request.customer_id,
            request.date_time,
            ClassStatus::Rebooked,
            request.children_ids.clone(),
        );
        uow.insert_class(&class).await.map_err(BookingError::into_slot_taken)?;
        rebooking::spend(&mut original, class.id);
        uow.update_class(&original).await?;
        uow.commit().await.map_err(BookingError::into_slot_taken)?;

        info!(original_class_id = %original.id, class_id = %class.id, "class rebooked");
        self.dispatch(Notification::ClassRebooked {
            original_class_id: original.id,
            class_id: class.id,
            customer_id: class.customer_id,
            instructor_id: class.instructor_id,
            date_time: class.date_time,
        })
        .await;
        Ok(RebookOutcome::Rebooked { original, class })
    }
}
