//! In-process relational store for slots, appointments and payments.
//!
//! Every read-modify-write runs inside [`MemoryDatabase::transaction`], which
//! holds a single lock over all three tables. Closures must finish their
//! fallible checks before their first mutation so that an early return leaves
//! the tables untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use shared_models::{
    Appointment, AppointmentId, DoctorId, Payment, PaymentId, Slot, SlotId,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatabaseError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
}

#[derive(Debug, Default)]
pub struct Tables {
    pub slots: BTreeMap<SlotId, Slot>,
    pub appointments: BTreeMap<AppointmentId, Appointment>,
    pub payments: BTreeMap<PaymentId, Payment>,
    payments_by_order: HashMap<String, PaymentId>,
    last_slot_id: SlotId,
    last_appointment_id: AppointmentId,
    last_payment_id: PaymentId,
}

impl Tables {
    pub fn insert_slot(&mut self, doctor_id: DoctorId, date: NaiveDate, time: NaiveTime) -> Slot {
        self.last_slot_id += 1;
        let slot = Slot {
            id: self.last_slot_id,
            doctor_id,
            date,
            time,
            booked: false,
            reserved_until: None,
        };
        self.slots.insert(slot.id, slot.clone());
        slot
    }

    pub fn next_appointment_id(&mut self) -> AppointmentId {
        self.last_appointment_id += 1;
        self.last_appointment_id
    }

    pub fn insert_appointment(&mut self, appointment: Appointment) -> Appointment {
        self.last_appointment_id = self.last_appointment_id.max(appointment.id);
        self.appointments.insert(appointment.id, appointment.clone());
        appointment
    }

    pub fn order_exists(&self, order_id: &str) -> bool {
        self.payments_by_order.contains_key(order_id)
    }

    /// Inserts a payment, assigning its id. `order_id` is a unique key.
    pub fn insert_payment(&mut self, mut payment: Payment) -> Result<Payment, DatabaseError> {
        if self.order_exists(&payment.order_id) {
            return Err(DatabaseError::DuplicateKey(payment.order_id));
        }

        self.last_payment_id += 1;
        payment.id = self.last_payment_id;
        self.payments_by_order.insert(payment.order_id.clone(), payment.id);
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    pub fn payment_by_order(&self, order_id: &str) -> Option<&Payment> {
        self.payments_by_order
            .get(order_id)
            .and_then(|id| self.payments.get(id))
    }

    pub fn payment_by_order_mut(&mut self, order_id: &str) -> Option<&mut Payment> {
        let id = *self.payments_by_order.get(order_id)?;
        self.payments.get_mut(&id)
    }

    pub fn appointment_for_slot(&self, slot_id: SlotId) -> Option<&Appointment> {
        self.appointments
            .values()
            .find(|appointment| appointment.slot_id == Some(slot_id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to all tables.
    pub async fn transaction<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Tables) -> R,
    {
        let mut tables = self.tables.lock().await;
        debug!("Memory database transaction started");
        f(&mut tables)
    }
}
