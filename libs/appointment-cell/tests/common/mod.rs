#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveTime;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::services::InMemoryDirectory;
use appointment_cell::AppointmentCellState;
use appointment_cell::store::SlotStore;
use shared_database::MemoryDatabase;
use shared_models::{AppointmentId, PaymentStatus, Slot};
use shared_utils::test_utils::{test_clock, TestConfig, TestRecords};
use shared_utils::ManualClock;

pub const DOCTOR_ID: i64 = 7;
pub const DOCTOR_FEE: f64 = 2500.0;
pub const PHYSICAL_TYPE_ID: i64 = 1;
pub const ONLINE_TYPE_ID: i64 = 2;

/// Appointment cell wired to an in-memory database, a seeded directory and a
/// manual clock.
pub struct Harness {
    pub db: Arc<MemoryDatabase>,
    pub directory: Arc<InMemoryDirectory>,
    pub clock: Arc<ManualClock>,
    pub state: Arc<AppointmentCellState>,
}

impl Harness {
    pub fn new() -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.add_appointment_type(TestRecords::physical_type());
        directory.add_appointment_type(TestRecords::online_type());
        Self::with_directory(directory)
    }

    /// Harness over `directory`, which gains the test doctor.
    pub fn with_directory(directory: Arc<InMemoryDirectory>) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        directory.add_doctor(TestRecords::doctor(DOCTOR_ID, Some(DOCTOR_FEE)));
        let clock = test_clock();

        let state = Arc::new(AppointmentCellState::new(
            TestConfig::default().to_arc(),
            directory.clone(),
            db.clone(),
            db.clone(),
            clock.clone(),
        ));

        Self { db, directory, clock, state }
    }

    pub async fn add_slots(&self, times: &[NaiveTime]) -> Vec<Slot> {
        self.db
            .add_slots(DOCTOR_ID, TestRecords::booking_date(), times)
            .await
            .unwrap()
    }

    pub async fn slot(&self, slot_id: i64) -> Slot {
        self.db.get_slot(slot_id).await.unwrap().unwrap()
    }

    /// Simulates a reconciled payment: status SUCCESS and the lease cleared.
    pub async fn mark_paid(&self, appointment_id: AppointmentId) {
        self.db.transaction(|tables| {
            let appointment = tables.appointments.get_mut(&appointment_id).unwrap();
            appointment.payment_status = PaymentStatus::Success;
            if let Some(slot_id) = appointment.slot_id {
                tables.slots.get_mut(&slot_id).unwrap().reserved_until = None;
            }
        }).await;
    }
}

pub fn booking_request(type_id: i64, time: NaiveTime) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id: DOCTOR_ID,
        appointment_type_id: type_id,
        booking_date: TestRecords::booking_date(),
        booking_time: time,
        reason: Some("Routine checkup".to_string()),
    }
}

pub fn nine() -> NaiveTime {
    TestRecords::time(9, 0)
}

pub fn half_past_nine() -> NaiveTime {
    TestRecords::time(9, 30)
}
