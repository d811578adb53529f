use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use classbook_api::{app, ApiState};
use classbook_core::{
    clock::FixedClock,
    models::{
        class::{BookClassRequest, BookingOutcome, Class},
        people::{Child, Customer, Identity, Instructor},
        schedule::{CreateScheduleRequest, ScheduleWithSlots, SlotRequest},
    },
    notify::{LogNotifier, Notifier},
    policy::SchedulingPolicy,
    service::SchedulingService,
    store::MemoryStore,
};
use uuid::Uuid;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Tokyo wall clock time in 2026 as a UTC instant.
pub fn tokyo(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    chrono_tz::Asia::Tokyo
        .with_ymd_and_hms(2026, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub trait WithIdentity {
    fn as_user(self, identity: Identity) -> Self;
}

impl WithIdentity for TestRequest {
    fn as_user(self, identity: Identity) -> Self {
        self.add_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_str(&identity.user_id.to_string()).unwrap(),
        )
        .add_header(
            HeaderName::from_static("x-user-type"),
            HeaderValue::from_static(identity.user_type.as_str()),
        )
    }
}

/// Server over an in-memory store, frozen at Monday 2026-10-19 10:00 Tokyo.
pub struct TestContext {
    pub store: MemoryStore,
    pub clock: Arc<FixedClock>,
    pub server: TestServer,
    pub instructor: Instructor,
    pub customer: Customer,
    pub child: Child,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_notifier(Arc::new(LogNotifier)).await
    }

    pub async fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(FixedClock::new(tokyo(10, 19, 10, 0)));
        let service = SchedulingService::new(
            Arc::new(store.clone()),
            SchedulingPolicy::default(),
            clock.clone(),
            notifier,
        );
        let server = TestServer::new(app(Arc::new(ApiState { service }))).unwrap();

        let instructor = store.add_instructor("Aiko").await;
        let customer = store.add_customer("Tanaka").await;
        let child = store.add_child(customer.id, "Hana").await;

        Self { store, clock, server, instructor, customer, child }
    }

    pub fn admin(&self) -> Identity {
        Identity::admin(Uuid::new_v4())
    }

    pub fn as_instructor(&self) -> Identity {
        Identity::instructor(self.instructor.id)
    }

    pub fn as_customer(&self) -> Identity {
        Identity::customer(self.customer.id)
    }

    pub async fn schedule(&self, from: NaiveDate, slots: &[(u8, &str)]) -> ScheduleWithSlots {
        let request = CreateScheduleRequest {
            effective_from: from,
            slots: slots
                .iter()
                .map(|(weekday, time)| SlotRequest { weekday: *weekday, start_time: time.parse().unwrap() })
                .collect(),
        };
        let response = self
            .server
            .post(&format!("/api/instructors/{}/schedules", self.instructor.id))
            .as_user(self.as_instructor())
            .json(&request)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }

    pub fn booking(&self, at: DateTime<Utc>) -> BookClassRequest {
        BookClassRequest {
            instructor_id: self.instructor.id,
            customer_id: self.customer.id,
            date_time: at,
            children_ids: vec![self.child.id],
            free_trial: false,
            confirmed: false,
        }
    }

    pub async fn book(&self, at: DateTime<Utc>) -> Class {
        let response = self
            .server
            .post("/api/classes")
            .as_user(self.as_customer())
            .json(&self.booking(at))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        match response.json::<BookingOutcome>() {
            BookingOutcome::Booked { class } => class,
            other => panic!("expected a booking, got {other:?}"),
        }
    }
}
