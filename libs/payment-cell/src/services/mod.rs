pub mod checkout;
pub mod webhook;

pub use checkout::PaymentGatewayAdapter;
pub use webhook::{PaymentWebhookHandler, ACKNOWLEDGEMENT};
