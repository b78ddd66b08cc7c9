use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type SlotId = i64;
pub type AppointmentId = i64;
pub type PaymentId = i64;
pub type DoctorId = i64;
pub type AppointmentTypeId = i64;

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// A bookable doctor time slot. `reserved_until` is the lease on an unpaid
/// booking; `None` on a booked slot means the booking is permanent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub booked: bool,
    pub reserved_until: Option<DateTime<Utc>>,
}

impl Slot {
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.booked && matches!(self.reserved_until, Some(until) if until <= now)
    }
}

// ==============================================================================
// STATUS ENUMS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Success)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Success => write!(f, "SUCCESS"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationMode {
    Physical,
    Online,
}

impl ConsultationMode {
    /// Appointment types are free-text in the directory; only "Physical"
    /// (any case) is an in-person visit.
    pub fn from_type_name(type_name: &str) -> Self {
        if type_name.trim().eq_ignore_ascii_case("physical") {
            ConsultationMode::Physical
        } else {
            ConsultationMode::Online
        }
    }
}

// ==============================================================================
// APPOINTMENTS & PAYMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub slot_id: Option<SlotId>,
    pub doctor_id: DoctorId,
    pub appointment_type_id: AppointmentTypeId,
    pub consultation_mode: ConsultationMode,
    pub booking_date: NaiveDate,
    pub booking_time: NaiveTime,
    pub reason: Option<String>,
    pub physical_location: Option<String>,
    pub online_link: Option<String>,
    pub payment_status: PaymentStatus,
    pub appointment_status: AppointmentStatus,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn location_or_link(&self) -> Option<&str> {
        match self.consultation_mode {
            ConsultationMode::Physical => self.physical_location.as_deref(),
            ConsultationMode::Online => self.online_link.as_deref(),
        }
    }

    pub fn is_current_order(&self, order_id: &str) -> bool {
        self.order_id.as_deref() == Some(order_id)
    }
}

/// Fields of an appointment decided by the booking path; the store assigns
/// id, slot and initial statuses.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub doctor_id: DoctorId,
    pub appointment_type_id: AppointmentTypeId,
    pub consultation_mode: ConsultationMode,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub appointment_id: AppointmentId,
    pub order_id: String,
    pub amount: f64,
    /// Doctor's fee when checkout was opened. Differs from `amount` only when
    /// the caller overrode the charge.
    #[serde(default)]
    pub expected_amount: Option<f64>,
    pub gateway_name: String,
    pub transaction_id: Option<String>,
    pub method: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// True when the charged amount is below the doctor's fee.
    pub fn is_underpaid(&self) -> bool {
        matches!(self.expected_amount, Some(expected) if self.amount + 0.005 < expected)
    }
}

// ==============================================================================
// DIRECTORY RECORDS (read-only collaborators)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default, alias = "consultation_fee")]
    pub consultation_fee: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentType {
    pub id: AppointmentTypeId,
    #[serde(alias = "type_name")]
    pub type_name: String,
    #[serde(default, alias = "physical_location")]
    pub physical_location: Option<String>,
    #[serde(default, alias = "online_link")]
    pub online_link: Option<String>,
}

impl AppointmentType {
    pub fn mode(&self) -> ConsultationMode {
        ConsultationMode::from_type_name(&self.type_name)
    }
}
