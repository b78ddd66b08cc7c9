use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_CHECKOUT_URL: &str = "https://sandbox.payhere.lk/pay/checkout";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub payhere_merchant_id: String,
    pub payhere_merchant_secret: String,
    pub payhere_checkout_url: String,
    pub payhere_return_url: String,
    pub payhere_cancel_url: String,
    pub payhere_notify_url: String,
    pub payhere_currency: String,
    pub payment_minimum_amount: f64,
    pub reservation_ttl_minutes: i64,
    pub reservation_sweep_interval_seconds: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: string_var("SUPABASE_URL", ""),
            supabase_anon_key: string_var("SUPABASE_ANON_PUBLIC_KEY", ""),
            payhere_merchant_id: string_var("PAYHERE_MERCHANT_ID", ""),
            payhere_merchant_secret: string_var("PAYHERE_MERCHANT_SECRET", ""),
            payhere_checkout_url: string_var("PAYHERE_CHECKOUT_URL", DEFAULT_CHECKOUT_URL),
            payhere_return_url: string_var("PAYHERE_RETURN_URL", "http://localhost:5173/payment/success"),
            payhere_cancel_url: string_var("PAYHERE_CANCEL_URL", "http://localhost:5173/payment/cancel"),
            payhere_notify_url: string_var("PAYHERE_NOTIFY_URL", "http://localhost:3000/payments/notify"),
            payhere_currency: string_var("PAYHERE_CURRENCY", "LKR"),
            payment_minimum_amount: parsed_var("PAYMENT_MINIMUM_AMOUNT", 500.00),
            reservation_ttl_minutes: parsed_var("RESERVATION_TTL_MINUTES", 15),
            reservation_sweep_interval_seconds: parsed_var("RESERVATION_SWEEP_INTERVAL_SECONDS", 60),
            port: parsed_var("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - falling back to the in-memory directory and stores");
        }
        if !config.is_payment_configured() {
            warn!("PayHere merchant credentials missing - checkout is disabled");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.payhere_merchant_id.is_empty() && !self.payhere_merchant_secret.is_empty()
    }
}

fn string_var(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        if default.is_empty() {
            warn!("{} not set, using empty value", key);
        } else {
            warn!("{} not set, using default", key);
        }
        default.to_string()
    })
}

fn parsed_var<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
