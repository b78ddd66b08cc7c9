//! PayHere request signing.
//!
//! Checkout hash: `UPPER(MD5(merchant_id + order_id + amount + currency + UPPER(MD5(secret))))`.
//! Notification `md5sig` adds the status code after the currency.

use md5::{Digest, Md5};

use shared_config::AppConfig;

pub fn md5_upper(input: &str) -> String {
    format!("{:X}", Md5::digest(input.as_bytes()))
}

/// Amounts are always signed with exactly two decimals.
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

#[derive(Clone)]
pub struct PayHereSigner {
    merchant_id: String,
    hashed_secret: String,
}

impl PayHereSigner {
    pub fn new(merchant_id: &str, merchant_secret: &str) -> Self {
        Self {
            merchant_id: merchant_id.to_string(),
            hashed_secret: md5_upper(merchant_secret),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.payhere_merchant_id, &config.payhere_merchant_secret)
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn checkout_hash(&self, order_id: &str, amount: f64, currency: &str) -> String {
        md5_upper(&format!(
            "{}{}{}{}{}",
            self.merchant_id, order_id, format_amount(amount), currency, self.hashed_secret
        ))
    }

    /// `amount` is the provider's `payhere_amount` exactly as received.
    pub fn notification_hash(&self, order_id: &str, amount: &str, currency: &str, status_code: &str) -> String {
        md5_upper(&format!(
            "{}{}{}{}{}{}",
            self.merchant_id, order_id, amount, currency, status_code, self.hashed_secret
        ))
    }

    pub fn verify_notification(
        &self,
        order_id: &str,
        amount: &str,
        currency: &str,
        status_code: &str,
        signature: &str,
    ) -> bool {
        let expected = self.notification_hash(order_id, amount, currency, status_code);
        expected.eq_ignore_ascii_case(signature.trim())
    }
}

impl std::fmt::Debug for PayHereSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayHereSigner")
            .field("merchant_id", &self.merchant_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_upper_known_vectors() {
        assert_eq!(md5_upper(""), "D41D8CD98F00B204E9800998ECF8427E");
        assert_eq!(md5_upper("abc"), "900150983CD24FB0D6963F7D28E17F72");
    }

    #[test]
    fn test_format_amount_two_decimals() {
        assert_eq!(format_amount(2500.0), "2500.00");
        assert_eq!(format_amount(1234.5), "1234.50");
        assert_eq!(format_amount(1234.567), "1234.57");
    }

    #[test]
    fn test_checkout_hash_composition() {
        let signer = PayHereSigner::new("1221149", "secret");
        let expected = md5_upper(&format!("1221149ORDER_1_52500.00LKR{}", md5_upper("secret")));

        assert_eq!(signer.checkout_hash("ORDER_1_5", 2500.0, "LKR"), expected);
        assert_eq!(signer.checkout_hash("ORDER_1_5", 2500.0, "LKR"), expected);
        assert_ne!(signer.checkout_hash("ORDER_1_5", 2500.01, "LKR"), expected);
    }

    #[test]
    fn test_notification_signature_includes_status() {
        let signer = PayHereSigner::new("1221149", "secret");
        let success = signer.notification_hash("ORDER_1_5", "2500.00", "LKR", "2");
        let failed = signer.notification_hash("ORDER_1_5", "2500.00", "LKR", "-2");

        assert_ne!(success, failed);
        assert!(signer.verify_notification("ORDER_1_5", "2500.00", "LKR", "2", &success.to_lowercase()));
        assert!(!signer.verify_notification("ORDER_1_5", "2500.00", "LKR", "2", &failed));
        assert!(!signer.verify_notification("ORDER_1_6", "2500.00", "LKR", "2", &success));
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = PayHereSigner::new("1221149", "secret");
        assert!(!format!("{:?}", signer).contains(&md5_upper("secret")));
    }
}
