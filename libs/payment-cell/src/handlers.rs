// libs/payment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    response::Html,
    Form, Json,
};
use tracing::warn;

use shared_models::error::AppError;
use shared_models::{AppointmentId, Payment};

use crate::models::{CheckoutPayload, CheckoutQuery, PaymentError, PaymentNotification};
use crate::router::PaymentCellState;
use crate::services::ACKNOWLEDGEMENT;

impl From<PaymentError> for AppError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::AppointmentNotFound(_) => AppError::NotFound(e.to_string()),
            PaymentError::InvalidOrderId(_)
            | PaymentError::InvalidSignature(_)
            | PaymentError::UnknownMerchant(_)
            | PaymentError::GatewayAmountInvalid(_) => AppError::BadRequest(e.to_string()),
            PaymentError::AlreadyPaid(_)
            | PaymentError::ReservationExpired(_)
            | PaymentError::DuplicateOrderId(_)
            | PaymentError::DuplicateNotification(_)
            | PaymentError::StaleNotification(_) => AppError::Conflict(e.to_string()),
            PaymentError::GatewayNotConfigured => AppError::Internal(e.to_string()),
            PaymentError::DatabaseError(msg) => AppError::Database(msg),
            PaymentError::Appointment(inner) => inner.into(),
        }
    }
}

#[axum::debug_handler]
pub async fn pay(
    State(state): State<Arc<PaymentCellState>>,
    Path(appointment_id): Path<AppointmentId>,
    Query(query): Query<CheckoutQuery>,
) -> Result<Html<String>, AppError> {
    let payload = state.gateway.build_checkout(appointment_id, query.amount).await?;
    Ok(Html(payload.render_html()))
}

pub async fn checkout(
    State(state): State<Arc<PaymentCellState>>,
    Path(appointment_id): Path<AppointmentId>,
    Query(query): Query<CheckoutQuery>,
) -> Result<Json<CheckoutPayload>, AppError> {
    Ok(Json(state.gateway.build_checkout(appointment_id, query.amount).await?))
}

/// The gateway only ever sees `ok`, even for bodies that fail to parse.
pub async fn notify(
    State(state): State<Arc<PaymentCellState>>,
    form: Result<Form<PaymentNotification>, FormRejection>,
) -> &'static str {
    match form {
        Ok(Form(notification)) => state.webhook.handle_notification(notification).await,
        Err(rejection) => {
            warn!("Unreadable payment notification: {}", rejection);
            ACKNOWLEDGEMENT
        }
    }
}

pub async fn get_appointment_payments(
    State(state): State<Arc<PaymentCellState>>,
    Path(appointment_id): Path<AppointmentId>,
) -> Result<Json<Vec<Payment>>, AppError> {
    Ok(Json(state.payments.payments_for_appointment(appointment_id).await?))
}
