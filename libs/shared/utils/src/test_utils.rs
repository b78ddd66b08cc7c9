use std::sync::Arc;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use shared_config::{AppConfig, DEFAULT_CHECKOUT_URL};
use shared_models::{AppointmentType, Doctor};

use crate::clock::ManualClock;

pub const TEST_MERCHANT_ID: &str = "1221149";
pub const TEST_MERCHANT_SECRET: &str = "test-merchant-secret";
pub const TEST_START_MILLIS: i64 = 1_700_000_000_000;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub merchant_id: String,
    pub merchant_secret: String,
    pub reservation_ttl_minutes: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            merchant_id: TEST_MERCHANT_ID.to_string(),
            merchant_secret: TEST_MERCHANT_SECRET.to_string(),
            reservation_ttl_minutes: 15,
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            payhere_merchant_id: self.merchant_id.clone(),
            payhere_merchant_secret: self.merchant_secret.clone(),
            payhere_checkout_url: DEFAULT_CHECKOUT_URL.to_string(),
            payhere_return_url: "http://localhost:5173/payment/success".to_string(),
            payhere_cancel_url: "http://localhost:5173/payment/cancel".to_string(),
            payhere_notify_url: "http://localhost:3000/payments/notify".to_string(),
            payhere_currency: "LKR".to_string(),
            payment_minimum_amount: 500.00,
            reservation_ttl_minutes: self.reservation_ttl_minutes,
            reservation_sweep_interval_seconds: 60,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub fn test_start() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(TEST_START_MILLIS)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(test_start()))
}

pub struct TestRecords;

impl TestRecords {
    pub fn doctor(id: i64, fee: Option<f64>) -> Doctor {
        Doctor {
            id,
            name: format!("Dr. Test {}", id),
            specialty: Some("General Practice".to_string()),
            consultation_fee: fee,
        }
    }

    pub fn physical_type() -> AppointmentType {
        AppointmentType {
            id: 1,
            type_name: "Physical".to_string(),
            physical_location: None,
            online_link: None,
        }
    }

    pub fn online_type() -> AppointmentType {
        AppointmentType {
            id: 2,
            type_name: "Online".to_string(),
            physical_location: None,
            online_link: Some("https://zoom.us/j/clinic-default".to_string()),
        }
    }

    pub fn booking_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default()
    }

    pub fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
    }
}
