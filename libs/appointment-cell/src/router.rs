// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use chrono::Duration;

use shared_config::AppConfig;
use shared_utils::Clock;

use crate::handlers;
use crate::services::{AdminConfirmationService, AvailabilityService, BookingService, Directory};
use crate::store::{AppointmentStore, SlotStore};

pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn Directory>,
    pub booking: Arc<BookingService>,
    pub availability: Arc<AvailabilityService>,
    pub confirmation: Arc<AdminConfirmationService>,
}

impl AppointmentCellState {
    pub fn new(
        config: Arc<AppConfig>,
        directory: Arc<dyn Directory>,
        slots: Arc<dyn SlotStore>,
        appointments: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reservation_ttl = Duration::minutes(config.reservation_ttl_minutes.max(1));

        Self {
            booking: Arc::new(BookingService::new(
                Arc::clone(&directory),
                Arc::clone(&slots),
                Arc::clone(&appointments),
                clock,
                reservation_ttl,
            )),
            availability: Arc::new(AvailabilityService::new(Arc::clone(&directory), slots)),
            confirmation: Arc::new(AdminConfirmationService::new(Arc::clone(&directory), appointments)),
            directory,
            config,
        }
    }
}

pub fn appointment_routes(state: Arc<AppointmentCellState>) -> Router {
    Router::new()
        .route("/book", post(handlers::book_appointment))
        .route("/user/success", get(handlers::get_successful_appointments))
        .route("/admin/all", get(handlers::get_all_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .with_state(state)
}

pub fn availability_routes(state: Arc<AppointmentCellState>) -> Router {
    Router::new()
        .route("/", post(handlers::add_availability))
        .route("/doctor/{doctor_id}", get(handlers::get_available_slots))
        .route("/{slot_id}", put(handlers::update_slot).delete(handlers::delete_slot))
        .with_state(state)
}

pub fn admin_appointment_routes(state: Arc<AppointmentCellState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_paid_appointments))
        .route("/confirm/{appointment_id}", post(handlers::confirm_appointment))
        .with_state(state)
}

pub fn appointment_type_routes(state: Arc<AppointmentCellState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_appointment_types).post(handlers::create_appointment_type))
        .with_state(state)
}
