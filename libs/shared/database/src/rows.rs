//! Snake-case row shapes of the PostgREST tables backing slots, appointments
//! and payments. The API records stay camelCase; these only cross the wire to
//! the database.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use shared_models::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentTypeId, ConsultationMode, DoctorId,
    Payment, PaymentId, PaymentStatus, Slot, SlotId,
};

/// Formats a timestamp for a PostgREST filter value (`reserved_until=lte.<ts>`).
pub fn filter_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRow {
    pub id: SlotId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub booked: bool,
    #[serde(default)]
    pub reserved_until: Option<DateTime<Utc>>,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Slot {
            id: row.id,
            doctor_id: row.doctor_id,
            date: row.date,
            time: row.time,
            booked: row.booked,
            reserved_until: row.reserved_until,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRow {
    pub id: AppointmentId,
    #[serde(default)]
    pub slot_id: Option<SlotId>,
    pub doctor_id: DoctorId,
    pub appointment_type_id: AppointmentTypeId,
    pub consultation_mode: ConsultationMode,
    pub booking_date: NaiveDate,
    pub booking_time: NaiveTime,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub physical_location: Option<String>,
    #[serde(default)]
    pub online_link: Option<String>,
    pub payment_status: PaymentStatus,
    pub appointment_status: AppointmentStatus,
    #[serde(default)]
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            slot_id: row.slot_id,
            doctor_id: row.doctor_id,
            appointment_type_id: row.appointment_type_id,
            consultation_mode: row.consultation_mode,
            booking_date: row.booking_date,
            booking_time: row.booking_time,
            reason: row.reason,
            physical_location: row.physical_location,
            online_link: row.online_link,
            payment_status: row.payment_status,
            appointment_status: row.appointment_status,
            order_id: row.order_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRow {
    pub id: PaymentId,
    pub appointment_id: AppointmentId,
    pub order_id: String,
    pub amount: f64,
    #[serde(default)]
    pub expected_amount: Option<f64>,
    pub gateway_name: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            appointment_id: row.appointment_id,
            order_id: row.order_id,
            amount: row.amount,
            expected_amount: row.expected_amount,
            gateway_name: row.gateway_name,
            transaction_id: row.transaction_id,
            method: row.method,
            payment_status: row.payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
