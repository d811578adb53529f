use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::BookingResult;

/// Outbound message the engine decided is warranted. Delivery belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    ClassBooked {
        class_id: Uuid,
        customer_id: Uuid,
        instructor_id: Uuid,
        date_time: DateTime<Utc>,
    },
    ClassCanceled {
        class_id: Uuid,
        customer_id: Uuid,
        instructor_id: Uuid,
        date_time: DateTime<Utc>,
        rebookable_until: Option<DateTime<Utc>>,
    },
    ClassRebooked {
        original_class_id: Uuid,
        class_id: Uuid,
        customer_id: Uuid,
        instructor_id: Uuid,
        date_time: DateTime<Utc>,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> BookingResult<()>;
}

/// Records notifications in the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> BookingResult<()> {
        info!(?notification, "notification queued");
        Ok(())
    }
}
