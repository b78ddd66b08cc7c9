// libs/payment-cell/src/services/checkout.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, instrument, warn};

use appointment_cell::services::Directory;
use appointment_cell::store::AppointmentStore;
use shared_config::AppConfig;
use shared_models::{AppointmentId, PaymentStatus};
use shared_utils::Clock;

use crate::amount::resolve_amount;
use crate::models::{CheckoutPayload, PaymentError};
use crate::order_id::OrderId;
use crate::signature::{format_amount, PayHereSigner};
use crate::store::{CheckoutDraft, PaymentStore};

const ORDER_ID_ATTEMPTS: i64 = 3;
const ITEM_DESCRIPTION: &str = "Doctor Appointment";

/// Builds signed hosted-checkout payloads. Talks to nobody over the network;
/// the browser carries the payload to the gateway.
pub struct PaymentGatewayAdapter {
    config: Arc<AppConfig>,
    directory: Arc<dyn Directory>,
    appointments: Arc<dyn AppointmentStore>,
    payments: Arc<dyn PaymentStore>,
    clock: Arc<dyn Clock>,
    signer: PayHereSigner,
    reservation_ttl: Duration,
}

impl PaymentGatewayAdapter {
    pub fn new(
        config: Arc<AppConfig>,
        directory: Arc<dyn Directory>,
        appointments: Arc<dyn AppointmentStore>,
        payments: Arc<dyn PaymentStore>,
        clock: Arc<dyn Clock>,
        reservation_ttl: Duration,
    ) -> Self {
        Self {
            signer: PayHereSigner::from_config(&config),
            config,
            directory,
            appointments,
            payments,
            clock,
            reservation_ttl,
        }
    }

    #[instrument(skip(self))]
    pub async fn build_checkout(
        &self,
        appointment_id: AppointmentId,
        amount_override: Option<f64>,
    ) -> Result<CheckoutPayload, PaymentError> {
        if !self.config.is_payment_configured() {
            warn!("Checkout requested but PayHere merchant credentials are missing");
            return Err(PaymentError::GatewayNotConfigured);
        }

        self.appointments.release_expired_reservations(self.clock.now()).await?;

        let appointment = self.appointments.get_appointment(appointment_id).await?
            .ok_or(PaymentError::AppointmentNotFound(appointment_id))?;

        if appointment.payment_status == PaymentStatus::Success {
            return Err(PaymentError::AlreadyPaid(appointment_id));
        }
        if appointment.slot_id.is_none() {
            return Err(PaymentError::ReservationExpired(appointment_id));
        }

        let consultation_fee = match self.directory.find_doctor(appointment.doctor_id).await? {
            Some(doctor) => doctor.consultation_fee,
            None => {
                warn!("Doctor {} missing from directory; charging the minimum amount", appointment.doctor_id);
                None
            }
        };
        let expected_amount = resolve_amount(None, consultation_fee, self.config.payment_minimum_amount)?;
        let amount = resolve_amount(amount_override, consultation_fee, self.config.payment_minimum_amount)?;
        if amount + 0.005 < expected_amount {
            warn!("Checkout for appointment {} charges {} below the expected {}",
                  appointment_id, format_amount(amount), format_amount(expected_amount));
        }

        let order_id = self.open_checkout(appointment_id, amount, expected_amount).await?;
        let currency = self.config.payhere_currency.clone();
        let hash = self.signer.checkout_hash(&order_id, amount, &currency);

        info!("Checkout {} opened for appointment {} ({} {})",
              order_id, appointment_id, format_amount(amount), currency);

        Ok(CheckoutPayload {
            checkout_url: self.config.payhere_checkout_url.clone(),
            merchant_id: self.signer.merchant_id().to_string(),
            return_url: self.config.payhere_return_url.clone(),
            cancel_url: self.config.payhere_cancel_url.clone(),
            notify_url: self.config.payhere_notify_url.clone(),
            order_id,
            items: ITEM_DESCRIPTION.to_string(),
            currency,
            amount: format_amount(amount),
            hash,
            first_name: "Patient".to_string(),
            last_name: "User".to_string(),
            email: "test@test.com".to_string(),
            phone: "0770000000".to_string(),
            address: "Colombo".to_string(),
            city: "Colombo".to_string(),
            country: "Sri Lanka".to_string(),
        })
    }

    /// Persists the pending payment under a fresh order id. Two checkouts in
    /// the same millisecond would collide, so the timestamp is bumped.
    async fn open_checkout(
        &self,
        appointment_id: AppointmentId,
        amount: f64,
        expected_amount: f64,
    ) -> Result<String, PaymentError> {
        let now = self.clock.now();
        let issued_at = self.clock.epoch_millis();

        for attempt in 0..ORDER_ID_ATTEMPTS {
            let order_id = OrderId::new(appointment_id, issued_at + attempt).to_string();
            let draft = CheckoutDraft {
                appointment_id,
                order_id: order_id.clone(),
                amount,
                expected_amount,
                now,
                lease_until: now + self.reservation_ttl,
            };

            match self.payments.open_checkout(draft).await {
                Ok(_) => return Ok(order_id),
                Err(PaymentError::DuplicateOrderId(_)) => {
                    debug!("Order id {} taken, retrying", order_id);
                }
                Err(e) => return Err(e),
            }
        }

        Err(PaymentError::DuplicateOrderId(OrderId::new(appointment_id, issued_at).to_string()))
    }
}
