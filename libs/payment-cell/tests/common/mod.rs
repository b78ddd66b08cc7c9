#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveTime;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::services::InMemoryDirectory;
use appointment_cell::store::SlotStore;
use appointment_cell::AppointmentCellState;
use payment_cell::signature::PayHereSigner;
use payment_cell::{PaymentCellState, PaymentNotification};
use shared_config::AppConfig;
use shared_database::MemoryDatabase;
use shared_models::{Appointment, Slot};
use shared_utils::test_utils::{test_clock, TestConfig, TestRecords, TEST_MERCHANT_ID, TEST_MERCHANT_SECRET};
use shared_utils::ManualClock;

pub const DOCTOR_ID: i64 = 7;
pub const DOCTOR_FEE: f64 = 2500.0;
pub const PHYSICAL_TYPE_ID: i64 = 1;

/// Both cells over one in-memory database with a manual clock.
pub struct Harness {
    pub config: Arc<AppConfig>,
    pub db: Arc<MemoryDatabase>,
    pub directory: Arc<InMemoryDirectory>,
    pub clock: Arc<ManualClock>,
    pub appointments: Arc<AppointmentCellState>,
    pub payments: Arc<PaymentCellState>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(TestConfig::default().to_arc())
    }

    pub fn with_config(config: Arc<AppConfig>) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let directory = Arc::new(InMemoryDirectory::new());
        directory.add_doctor(TestRecords::doctor(DOCTOR_ID, Some(DOCTOR_FEE)));
        directory.add_appointment_type(TestRecords::physical_type());
        directory.add_appointment_type(TestRecords::online_type());
        let clock = test_clock();

        let appointments = Arc::new(AppointmentCellState::new(
            Arc::clone(&config),
            directory.clone(),
            db.clone(),
            db.clone(),
            clock.clone(),
        ));
        let payments = Arc::new(PaymentCellState::new(
            Arc::clone(&config),
            directory.clone(),
            db.clone(),
            db.clone(),
            clock.clone(),
        ));

        Self { config, db, directory, clock, appointments, payments }
    }

    pub async fn add_slot(&self, time: NaiveTime) -> Slot {
        self.db
            .add_slots(DOCTOR_ID, TestRecords::booking_date(), &[time])
            .await
            .unwrap()
            .remove(0)
    }

    pub async fn slot(&self, slot_id: i64) -> Slot {
        self.db.get_slot(slot_id).await.unwrap().unwrap()
    }

    pub async fn book(&self, time: NaiveTime) -> Appointment {
        self.appointments.booking.book(BookAppointmentRequest {
            doctor_id: DOCTOR_ID,
            appointment_type_id: PHYSICAL_TYPE_ID,
            booking_date: TestRecords::booking_date(),
            booking_time: time,
            reason: None,
        }).await.unwrap()
    }

    pub async fn appointment(&self, appointment_id: i64) -> Appointment {
        self.appointments.booking.get_appointment(appointment_id).await.unwrap()
    }
}

pub fn signer() -> PayHereSigner {
    PayHereSigner::new(TEST_MERCHANT_ID, TEST_MERCHANT_SECRET)
}

/// A notification signed the way the gateway signs it.
pub fn notification(order_id: &str, amount: &str, status_code: &str) -> PaymentNotification {
    PaymentNotification {
        merchant_id: TEST_MERCHANT_ID.to_string(),
        order_id: order_id.to_string(),
        payhere_amount: amount.to_string(),
        payhere_currency: Some("LKR".to_string()),
        status_code: status_code.to_string(),
        md5sig: signer().notification_hash(order_id, amount, "LKR", status_code),
        payment_id: "320025000001".to_string(),
        method: "VISA".to_string(),
    }
}

pub fn nine() -> NaiveTime {
    TestRecords::time(9, 0)
}
