// libs/payment-cell/src/models.rs
use serde::{Deserialize, Serialize};

use appointment_cell::AppointmentError;
use shared_models::{AppointmentId, Payment, PaymentStatus, SlotId};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutQuery {
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Form body of the provider's server-to-server payment notification. Every
/// field is optional at parse time so that malformed deliveries can still be
/// logged and acknowledged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentNotification {
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub payhere_amount: String,
    #[serde(default)]
    pub payhere_currency: Option<String>,
    #[serde(default)]
    pub status_code: String,
    #[serde(default)]
    pub md5sig: String,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub method: String,
}

// ==============================================================================
// CHECKOUT
// ==============================================================================

/// Everything the browser posts to the hosted checkout page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutPayload {
    pub checkout_url: String,
    pub merchant_id: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    pub order_id: String,
    pub items: String,
    pub currency: String,
    pub amount: String,
    pub hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

impl CheckoutPayload {
    pub fn form_fields(&self) -> [(&'static str, &str); 16] {
        [
            ("merchant_id", self.merchant_id.as_str()),
            ("return_url", self.return_url.as_str()),
            ("cancel_url", self.cancel_url.as_str()),
            ("notify_url", self.notify_url.as_str()),
            ("order_id", self.order_id.as_str()),
            ("items", self.items.as_str()),
            ("currency", self.currency.as_str()),
            ("amount", self.amount.as_str()),
            ("hash", self.hash.as_str()),
            ("first_name", self.first_name.as_str()),
            ("last_name", self.last_name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("address", self.address.as_str()),
            ("city", self.city.as_str()),
            ("country", self.country.as_str()),
        ]
    }

    /// Self-submitting HTML form that redirects the browser to the gateway.
    pub fn render_html(&self) -> String {
        let inputs: String = self.form_fields()
            .iter()
            .map(|(name, value)| {
                format!("      <input type=\"hidden\" name=\"{}\" value=\"{}\"/>\n", name, escape_html(value))
            })
            .collect();

        format!(
            "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"UTF-8\">\n    <title>Redirecting to PayHere</title>\n  </head>\n  <body onload=\"document.forms[0].submit()\">\n    <form method=\"post\" action=\"{}\">\n{}    </form>\n  </body>\n</html>\n",
            escape_html(&self.checkout_url),
            inputs,
        )
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ==============================================================================
// RECONCILIATION RESULTS
// ==============================================================================

/// What a notification did to the appointment that owns the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentEffect {
    /// Payment status mirrored onto the appointment.
    Updated(PaymentStatus),
    /// Paid after the reservation lapsed; the slot was still free and was taken back.
    SlotReacquired(SlotId),
    /// Paid after the reservation lapsed and someone else holds the slot now.
    SlotLost,
    /// The order is no longer the appointment's latest; only its payment row changed.
    Stale { current_order_id: Option<String> },
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub payment: Payment,
    pub effect: AppointmentEffect,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum PaymentError {
    #[error("Appointment {0} not found")]
    AppointmentNotFound(AppointmentId),

    #[error("Invalid order_id format: {0}")]
    InvalidOrderId(String),

    #[error("Notification for {0} already applied")]
    DuplicateNotification(String),

    #[error("Notification for {0} is stale")]
    StaleNotification(String),

    #[error("Signature mismatch for {0}")]
    InvalidSignature(String),

    #[error("Unknown merchant {0}")]
    UnknownMerchant(String),

    #[error("Appointment {0} is already paid")]
    AlreadyPaid(AppointmentId),

    #[error("Reservation for appointment {0} has expired; please book again")]
    ReservationExpired(AppointmentId),

    #[error("Invalid payment amount: {0}")]
    GatewayAmountInvalid(String),

    #[error("Order {0} already exists")]
    DuplicateOrderId(String),

    #[error("Payment gateway is not configured")]
    GatewayNotConfigured,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),
}
