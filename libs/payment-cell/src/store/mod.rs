//! Persistence seam for payments. Checkout and notification writes touch the
//! payment, appointment and slot tables together.
//!
//! The in-memory store commits each write as one unit. The PostgREST store
//! guards every step with a conditional update instead.

mod memory;
mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shared_database::DatabaseError;
use shared_models::{AppointmentId, Payment, PaymentStatus};

use crate::models::{PaymentError, Reconciliation};

pub const GATEWAY_NAME: &str = "PAYHERE";

#[derive(Debug, Clone)]
pub struct CheckoutDraft {
    pub appointment_id: AppointmentId,
    pub order_id: String,
    pub amount: f64,
    /// Price before any caller override.
    pub expected_amount: f64,
    pub now: DateTime<Utc>,
    pub lease_until: DateTime<Utc>,
}

/// A verified gateway notification, ready to apply.
#[derive(Debug, Clone)]
pub struct NotificationUpdate {
    pub appointment_id: AppointmentId,
    pub order_id: String,
    pub amount: f64,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub method: Option<String>,
    pub now: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Records a PENDING payment under a fresh order id, points the
    /// appointment at that order and renews its slot lease.
    async fn open_checkout(&self, draft: CheckoutDraft) -> Result<Payment, PaymentError>;

    /// Applies a notification to the payment row for its order (creating the
    /// row if checkout never recorded one) and, when the order is the
    /// appointment's latest, to the appointment and its slot.
    async fn apply_notification(&self, update: NotificationUpdate) -> Result<Reconciliation, PaymentError>;

    async fn find_by_order(&self, order_id: &str) -> Result<Option<Payment>, PaymentError>;

    async fn payments_for_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Vec<Payment>, PaymentError>;
}

impl From<DatabaseError> for PaymentError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::DuplicateKey(order_id) => PaymentError::DuplicateOrderId(order_id),
        }
    }
}

/// Decides whether a notification may still change the payment row for its
/// order. A row belonging to another appointment means a forged order id.
pub fn check_notification(existing: Option<&Payment>, update: &NotificationUpdate) -> Result<(), PaymentError> {
    match existing {
        Some(existing) if existing.appointment_id != update.appointment_id => {
            Err(PaymentError::InvalidOrderId(update.order_id.clone()))
        }
        Some(existing) if existing.payment_status == update.status => {
            Err(PaymentError::DuplicateNotification(update.order_id.clone()))
        }
        Some(existing) if existing.payment_status.is_terminal() => {
            Err(PaymentError::StaleNotification(update.order_id.clone()))
        }
        _ => Ok(()),
    }
}
