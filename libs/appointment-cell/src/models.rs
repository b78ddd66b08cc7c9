// libs/appointment-cell/src/models.rs
use chrono::NaiveDate;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use shared_models::{
    time_format, Appointment, AppointmentId, AppointmentType, AppointmentTypeId, Doctor, DoctorId,
    SlotId,
};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: DoctorId,
    pub appointment_type_id: AppointmentTypeId,
    pub booking_date: NaiveDate,
    #[serde(deserialize_with = "time_format::deserialize")]
    pub booking_time: NaiveTime,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAvailabilityRequest {
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    #[serde(deserialize_with = "time_format::deserialize_many")]
    pub times: Vec<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSlotRequest {
    pub available_date: NaiveDate,
    #[serde(deserialize_with = "time_format::deserialize")]
    pub available_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: NaiveDate,
}

/// Admin confirmation parameters. `zoomLink` is the historical name of the
/// online meeting link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAppointmentRequest {
    #[serde(default)]
    pub physical_location: Option<String>,
    #[serde(default, alias = "onlineLink")]
    pub zoom_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentTypeRequest {
    pub type_name: String,
    #[serde(default)]
    pub physical_location: Option<String>,
    #[serde(default, alias = "zoomLink")]
    pub online_link: Option<String>,
}

impl CreateAppointmentTypeRequest {
    pub fn named(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Self::default()
        }
    }
}

// ==============================================================================
// SERVICE RESULTS
// ==============================================================================

/// An appointment as listed to patients and staff, with the doctor and
/// appointment type resolved from the directory.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor_name: Option<String>,
    pub specialty: Option<String>,
    pub consultation_fee: Option<f64>,
    pub appointment_type: Option<String>,
    pub location_or_link: Option<String>,
}

impl AppointmentView {
    pub fn new(
        appointment: Appointment,
        doctor: Option<&Doctor>,
        appointment_type: Option<&AppointmentType>,
    ) -> Self {
        Self {
            location_or_link: appointment.location_or_link().map(str::to_string),
            doctor_name: doctor.map(|d| d.name.clone()),
            specialty: doctor.and_then(|d| d.specialty.clone()),
            consultation_fee: doctor.and_then(|d| d.consultation_fee),
            appointment_type: appointment_type.map(|t| t.type_name.clone()),
            appointment,
        }
    }
}

/// Where a confirmed appointment takes place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    PhysicalLocation(String),
    OnlineLink(String),
}

/// A slot whose unpaid reservation lease ran out and was returned to the pool.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleasedReservation {
    pub slot_id: SlotId,
    pub appointment_id: Option<AppointmentId>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Selected time slot not available")]
    SlotUnavailable,

    #[error("Slot {0} is already booked")]
    SlotAlreadyBooked(SlotId),

    #[error("Slot {0} is booked and cannot be changed")]
    SlotInUse(SlotId),

    #[error("Doctor {0} already has a slot at {1} {2}")]
    DuplicateSlot(DoctorId, NaiveDate, NaiveTime),

    #[error("Appointment {0} no longer holds a slot")]
    SlotNotHeld(AppointmentId),

    #[error("Appointment {0} has no successful payment")]
    PaymentNotCompleted(AppointmentId),

    #[error("Appointment {0} is already confirmed")]
    AlreadyConfirmed(AppointmentId),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),
}

impl AppointmentError {
    pub fn doctor_not_found(id: DoctorId) -> Self {
        AppointmentError::NotFound(format!("Doctor {}", id))
    }

    pub fn appointment_type_not_found(id: AppointmentTypeId) -> Self {
        AppointmentError::NotFound(format!("Appointment type {}", id))
    }

    pub fn appointment_not_found(id: AppointmentId) -> Self {
        AppointmentError::NotFound(format!("Appointment {}", id))
    }

    pub fn slot_not_found(id: SlotId) -> Self {
        AppointmentError::NotFound(format!("Slot {}", id))
    }
}
