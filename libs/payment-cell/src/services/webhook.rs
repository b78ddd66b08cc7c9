// libs/payment-cell/src/services/webhook.rs
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;
use shared_models::PaymentStatus;
use shared_utils::Clock;

use crate::models::{AppointmentEffect, PaymentError, PaymentNotification, Reconciliation};
use crate::order_id::OrderId;
use crate::signature::PayHereSigner;
use crate::store::{NotificationUpdate, PaymentStore};

/// Body the gateway expects back for every delivery.
pub const ACKNOWLEDGEMENT: &str = "ok";

const SUCCESS_STATUS_CODE: &str = "2";

/// Reconciles server-to-server payment notifications. Deliveries are
/// at-least-once and may arrive out of order.
pub struct PaymentWebhookHandler {
    config: Arc<AppConfig>,
    payments: Arc<dyn PaymentStore>,
    clock: Arc<dyn Clock>,
    signer: PayHereSigner,
}

impl PaymentWebhookHandler {
    pub fn new(config: Arc<AppConfig>, payments: Arc<dyn PaymentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer: PayHereSigner::from_config(&config),
            config,
            payments,
            clock,
        }
    }

    /// Applies the notification and acknowledges it whatever the outcome.
    #[instrument(skip(self, notification), fields(order_id = %notification.order_id, status_code = %notification.status_code))]
    pub async fn handle_notification(&self, notification: PaymentNotification) -> &'static str {
        match self.reconcile(notification).await {
            Ok(reconciliation) => log_reconciliation(&reconciliation),
            Err(PaymentError::DuplicateNotification(order_id)) => {
                debug!("Duplicate notification for {} ignored", order_id);
            }
            Err(e @ (PaymentError::StaleNotification(_) | PaymentError::InvalidSignature(_)
                | PaymentError::UnknownMerchant(_) | PaymentError::InvalidOrderId(_)
                | PaymentError::AppointmentNotFound(_))) => {
                warn!("Payment notification rejected: {}", e);
            }
            Err(e) => error!("Failed to apply payment notification: {}", e),
        }

        ACKNOWLEDGEMENT
    }

    pub async fn reconcile(&self, notification: PaymentNotification) -> Result<Reconciliation, PaymentError> {
        let order = OrderId::parse(&notification.order_id)?;

        if notification.merchant_id.trim() != self.signer.merchant_id() {
            return Err(PaymentError::UnknownMerchant(notification.merchant_id));
        }

        let currency = notification.payhere_currency.as_deref()
            .map(str::trim)
            .filter(|currency| !currency.is_empty())
            .unwrap_or(self.config.payhere_currency.as_str());

        let verified = self.signer.verify_notification(
            &notification.order_id,
            &notification.payhere_amount,
            currency,
            &notification.status_code,
            &notification.md5sig,
        );
        if !verified {
            return Err(PaymentError::InvalidSignature(notification.order_id));
        }

        let amount: f64 = notification.payhere_amount.trim().parse()
            .ok()
            .filter(|amount: &f64| amount.is_finite())
            .ok_or_else(|| PaymentError::GatewayAmountInvalid(notification.payhere_amount.clone()))?;

        let status = if notification.status_code.trim() == SUCCESS_STATUS_CODE {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        };

        self.payments.apply_notification(NotificationUpdate {
            appointment_id: order.appointment_id,
            order_id: notification.order_id,
            amount,
            status,
            transaction_id: non_empty(notification.payment_id),
            method: non_empty(notification.method),
            now: self.clock.now(),
        }).await
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn log_reconciliation(reconciliation: &Reconciliation) {
    let payment = &reconciliation.payment;
    if payment.payment_status == PaymentStatus::Success && payment.is_underpaid() {
        warn!("Payment {} for appointment {} settled {:.2} below the expected {:.2}",
              payment.order_id, payment.appointment_id, payment.amount,
              payment.expected_amount.unwrap_or_default());
    }
    match &reconciliation.effect {
        AppointmentEffect::Updated(status) => {
            info!("Payment {} for appointment {} is now {}", payment.order_id, payment.appointment_id, status);
        }
        AppointmentEffect::SlotReacquired(slot_id) => {
            info!("Late payment {} re-acquired slot {}", payment.order_id, slot_id);
        }
        AppointmentEffect::SlotLost => {
            error!("Payment {} succeeded but appointment {} lost its slot", payment.order_id, payment.appointment_id);
        }
        AppointmentEffect::Stale { current_order_id } => {
            warn!("Payment {} recorded as {} but appointment {} now follows {:?}",
                  payment.order_id, payment.payment_status, payment.appointment_id, current_order_id);
        }
    }
}
