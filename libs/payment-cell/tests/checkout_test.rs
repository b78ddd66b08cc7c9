use assert_matches::assert_matches;
use chrono::Duration;

use appointment_cell::store::AppointmentStore;
use payment_cell::{OrderId, PaymentError, PaymentStore};
use shared_models::PaymentStatus;
use shared_utils::test_utils::{TestConfig, TestRecords, TEST_MERCHANT_ID, TEST_START_MILLIS};
use shared_utils::Clock;

mod common;
use common::*;

#[tokio::test]
async fn test_checkout_charges_consultation_fee() {
    let harness = Harness::new();
    let slot = harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    let payload = harness.payments.gateway.build_checkout(appointment.id, None).await.unwrap();

    assert_eq!(payload.merchant_id, TEST_MERCHANT_ID);
    assert_eq!(payload.amount, "2500.00");
    assert_eq!(payload.currency, "LKR");
    assert_eq!(payload.order_id, OrderId::new(appointment.id, TEST_START_MILLIS).to_string());
    assert_eq!(payload.hash, signer().checkout_hash(&payload.order_id, 2500.0, "LKR"));
    assert_eq!(payload.items, "Doctor Appointment");

    let stored = harness.appointment(appointment.id).await;
    assert_eq!(stored.order_id.as_deref(), Some(payload.order_id.as_str()));
    assert_eq!(stored.payment_status, PaymentStatus::Pending);

    let payment = harness.db.find_by_order(&payload.order_id).await.unwrap().unwrap();
    assert_eq!(payment.amount, 2500.0);
    assert_eq!(payment.payment_status, PaymentStatus::Pending);
    assert_eq!(payment.gateway_name, "PAYHERE");
    assert_eq!(harness.slot(slot.id).await.reserved_until, Some(harness.clock.now() + Duration::minutes(15)));
}

#[tokio::test]
async fn test_checkout_override_and_floor() {
    let harness = Harness::new();
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    let payload = harness.payments.gateway.build_checkout(appointment.id, Some(1200.5)).await.unwrap();
    assert_eq!(payload.amount, "1200.50");

    harness.clock.advance(Duration::milliseconds(1));
    let payload = harness.payments.gateway.build_checkout(appointment.id, Some(-3.0)).await.unwrap();
    assert_eq!(payload.amount, "500.00");

    let result = harness.payments.gateway.build_checkout(appointment.id, Some(f64::NAN)).await;
    assert_matches!(result, Err(PaymentError::GatewayAmountInvalid(_)));
}

#[tokio::test]
async fn test_override_below_fee_is_flagged_on_payment() {
    let harness = Harness::new();
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    let payload = harness.payments.gateway.build_checkout(appointment.id, Some(1.0)).await.unwrap();
    assert_eq!(payload.amount, "1.00");

    let payment = harness.db.find_by_order(&payload.order_id).await.unwrap().unwrap();
    assert_eq!(payment.amount, 1.0);
    assert_eq!(payment.expected_amount, Some(DOCTOR_FEE));
    assert!(payment.is_underpaid());

    harness.payments.webhook.reconcile(notification(&payload.order_id, "1.00", "2")).await.unwrap();
    let settled = harness.db.find_by_order(&payload.order_id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Success);
    assert!(settled.is_underpaid());

    harness.clock.advance(Duration::milliseconds(1));
    let other = harness.add_slot(TestRecords::time(10, 0)).await;
    let second = harness.book(TestRecords::time(10, 0)).await;
    assert_eq!(second.slot_id, Some(other.id));
    let payload = harness.payments.gateway.build_checkout(second.id, None).await.unwrap();
    let full_price = harness.db.find_by_order(&payload.order_id).await.unwrap().unwrap();
    assert!(!full_price.is_underpaid());
}

#[tokio::test]
async fn test_doctor_without_fee_pays_floor() {
    let harness = Harness::new();
    harness.directory.add_doctor(TestRecords::doctor(DOCTOR_ID, None));
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    let payload = harness.payments.gateway.build_checkout(appointment.id, None).await.unwrap();
    assert_eq!(payload.amount, "500.00");
}

#[tokio::test]
async fn test_retry_checkout_moves_current_order() {
    let harness = Harness::new();
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    let first = harness.payments.gateway.build_checkout(appointment.id, None).await.unwrap();
    // Same millisecond: the second order id is bumped instead of colliding.
    let second = harness.payments.gateway.build_checkout(appointment.id, None).await.unwrap();

    assert_ne!(first.order_id, second.order_id);
    assert_eq!(second.order_id, OrderId::new(appointment.id, TEST_START_MILLIS + 1).to_string());

    let stored = harness.appointment(appointment.id).await;
    assert_eq!(stored.order_id.as_deref(), Some(second.order_id.as_str()));
    assert_eq!(harness.db.payments_for_appointment(appointment.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_checkout_unknown_appointment() {
    let harness = Harness::new();
    let result = harness.payments.gateway.build_checkout(404, None).await;
    assert_matches!(result, Err(PaymentError::AppointmentNotFound(404)));
}

#[tokio::test]
async fn test_checkout_after_lease_expired() {
    let harness = Harness::new();
    let slot = harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    harness.clock.advance(Duration::minutes(16));
    let result = harness.payments.gateway.build_checkout(appointment.id, None).await;

    assert_matches!(result, Err(PaymentError::ReservationExpired(id)) if id == appointment.id);
    assert!(!harness.slot(slot.id).await.booked);
    assert!(harness.db.payments_for_appointment(appointment.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_renews_lease() {
    let harness = Harness::new();
    let slot = harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    harness.clock.advance(Duration::minutes(10));
    harness.payments.gateway.build_checkout(appointment.id, None).await.unwrap();
    harness.clock.advance(Duration::minutes(10));

    assert!(harness.db.release_expired_reservations(harness.clock.now()).await.unwrap().is_empty());
    let held = harness.appointment(appointment.id).await;
    assert_eq!(held.slot_id, Some(slot.id));
    assert!(!harness.slot(slot.id).await.lease_expired(harness.clock.now()));
}

#[tokio::test]
async fn test_checkout_requires_merchant_credentials() {
    let mut config = TestConfig::default().to_app_config();
    config.payhere_merchant_secret = String::new();
    let harness = Harness::with_config(std::sync::Arc::new(config));
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    let result = harness.payments.gateway.build_checkout(appointment.id, None).await;
    assert_matches!(result, Err(PaymentError::GatewayNotConfigured));
}
