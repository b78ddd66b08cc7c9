use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{
    admin_appointment_routes, appointment_routes, appointment_type_routes, availability_routes,
};
use payment_cell::router::payment_routes;

use crate::state::AppState;

pub fn create_router(state: &AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/appointments", appointment_routes(Arc::clone(&state.appointments)))
        .nest("/availability", availability_routes(Arc::clone(&state.appointments)))
        .nest("/admin/appointments", admin_appointment_routes(Arc::clone(&state.appointments)))
        .nest("/appointment-types", appointment_type_routes(Arc::clone(&state.appointments)))
        .nest("/payments", payment_routes(Arc::clone(&state.payments)))
}
