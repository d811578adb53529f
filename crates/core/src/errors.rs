use thiserror::Error;

/// Contract messages. Callers match on these strings to pick localized UI text,
/// so they must not change.
pub mod messages {
    pub const INSTRUCTOR_UNAVAILABLE: &str = "Instructor is not available at the requested time slot";
    pub const DUPLICATE_RECURRING_CLASS: &str = "Regular class already exists at this time slot";
    pub const FAMILY_RECURRING_CLASS: &str = "The family already has a regular class at this time slot";
    pub const START_DATE_TOO_SOON: &str = "Start date must be at least one week from today";
    pub const INSTRUCTOR_SCHEDULE_NOT_FOUND: &str = "Instructor schedule not found";
    pub const CANCELLATION_TOO_LATE: &str =
        "Classes can only be canceled until two days before the class date";
    pub const REBOOK_DEADLINE_PASSED: &str = "The rebooking deadline for this class has passed";
    pub const CONCURRENT_UPDATE: &str = "The record was modified by another request";

    pub fn unsupported_timezone(supported: &str) -> String {
        format!("Only {supported} timezone is supported")
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl BookingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        BookingError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        BookingError::NotFound(msg.into())
    }

    pub fn rule(msg: impl Into<String>) -> Self {
        BookingError::BusinessRule(msg.into())
    }

    /// A lost race on an instructor slot surfaces as the same business rule the
    /// availability check produces.
    pub fn into_slot_taken(self) -> Self {
        match self {
            BookingError::Conflict(msg) if msg == messages::CONCURRENT_UPDATE => {
                BookingError::rule(messages::INSTRUCTOR_UNAVAILABLE)
            }
            other => other,
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
