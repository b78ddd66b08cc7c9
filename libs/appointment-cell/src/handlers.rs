// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use shared_models::error::AppError;
use shared_models::{Appointment, AppointmentId, AppointmentType, DoctorId, Slot, SlotId};

use crate::models::{
    AppointmentError, AppointmentView, AvailableSlotsQuery, BookAppointmentRequest,
    ConfirmAppointmentRequest, CreateAppointmentTypeRequest, SaveAvailabilityRequest,
    UpdateSlotRequest,
};
use crate::router::AppointmentCellState;

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound(_) => AppError::NotFound(e.to_string()),
            AppointmentError::SlotUnavailable => AppError::BadRequest(e.to_string()),
            AppointmentError::SlotAlreadyBooked(_)
            | AppointmentError::SlotInUse(_)
            | AppointmentError::DuplicateSlot(..)
            | AppointmentError::SlotNotHeld(_)
            | AppointmentError::PaymentNotCompleted(_)
            | AppointmentError::AlreadyConfirmed(_) => AppError::Conflict(e.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            AppointmentError::ExternalServiceError(msg) => AppError::ExternalService(msg),
        }
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.booking.book(request).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<AppointmentId>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.booking.get_appointment(appointment_id).await?))
}

pub async fn get_successful_appointments(
    State(state): State<Arc<AppointmentCellState>>,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    Ok(Json(state.booking.successful_appointments().await?))
}

pub async fn get_all_appointments(
    State(state): State<Arc<AppointmentCellState>>,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    Ok(Json(state.booking.all_appointments().await?))
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn add_availability(
    State(state): State<Arc<AppointmentCellState>>,
    Json(request): Json<SaveAvailabilityRequest>,
) -> Result<(StatusCode, Json<Vec<Slot>>), AppError> {
    let slots = state.availability.add_availability(request).await?;
    Ok((StatusCode::CREATED, Json(slots)))
}

pub async fn get_available_slots(
    State(state): State<Arc<AppointmentCellState>>,
    Path(doctor_id): Path<DoctorId>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Vec<Slot>>, AppError> {
    Ok(Json(state.availability.available_slots(doctor_id, query.date).await?))
}

pub async fn update_slot(
    State(state): State<Arc<AppointmentCellState>>,
    Path(slot_id): Path<SlotId>,
    Json(request): Json<UpdateSlotRequest>,
) -> Result<Json<Slot>, AppError> {
    Ok(Json(state.availability.update_slot(slot_id, request).await?))
}

pub async fn delete_slot(
    State(state): State<Arc<AppointmentCellState>>,
    Path(slot_id): Path<SlotId>,
) -> Result<StatusCode, AppError> {
    state.availability.delete_slot(slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// ADMIN
// ==============================================================================

pub async fn get_paid_appointments(
    State(state): State<Arc<AppointmentCellState>>,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    Ok(Json(state.confirmation.paid_appointments().await?))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<AppointmentId>,
    Query(request): Query<ConfirmAppointmentRequest>,
) -> Result<&'static str, AppError> {
    state.confirmation.confirm(appointment_id, request).await?;
    Ok("Confirmed")
}

pub async fn get_appointment_types(
    State(state): State<Arc<AppointmentCellState>>,
) -> Result<Json<Vec<AppointmentType>>, AppError> {
    Ok(Json(state.directory.appointment_types_or_defaults().await?))
}

#[axum::debug_handler]
pub async fn create_appointment_type(
    State(state): State<Arc<AppointmentCellState>>,
    Json(request): Json<CreateAppointmentTypeRequest>,
) -> Result<(StatusCode, Json<AppointmentType>), AppError> {
    let created = state.directory.create_appointment_type(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
