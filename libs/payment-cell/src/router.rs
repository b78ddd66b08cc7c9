// libs/payment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::Duration;

use appointment_cell::services::Directory;
use appointment_cell::store::AppointmentStore;
use shared_config::AppConfig;
use shared_utils::Clock;

use crate::handlers;
use crate::services::{PaymentGatewayAdapter, PaymentWebhookHandler};
use crate::store::PaymentStore;

pub struct PaymentCellState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<PaymentGatewayAdapter>,
    pub webhook: Arc<PaymentWebhookHandler>,
    pub payments: Arc<dyn PaymentStore>,
}

impl PaymentCellState {
    pub fn new(
        config: Arc<AppConfig>,
        directory: Arc<dyn Directory>,
        appointments: Arc<dyn AppointmentStore>,
        payments: Arc<dyn PaymentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reservation_ttl = Duration::minutes(config.reservation_ttl_minutes.max(1));

        Self {
            gateway: Arc::new(PaymentGatewayAdapter::new(
                Arc::clone(&config),
                directory,
                appointments,
                Arc::clone(&payments),
                Arc::clone(&clock),
                reservation_ttl,
            )),
            webhook: Arc::new(PaymentWebhookHandler::new(Arc::clone(&config), Arc::clone(&payments), clock)),
            payments,
            config,
        }
    }
}

pub fn payment_routes(state: Arc<PaymentCellState>) -> Router {
    Router::new()
        .route("/pay/{appointment_id}", get(handlers::pay))
        .route("/checkout/{appointment_id}", get(handlers::checkout))
        .route("/notify", post(handlers::notify))
        .route("/appointment/{appointment_id}", get(handlers::get_appointment_payments))
        .with_state(state)
}
