use assert_matches::assert_matches;
use chrono::Duration;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::store::{CheckoutDraft, NotificationUpdate};
use payment_cell::{AppointmentEffect, PaymentError, PaymentStore};
use shared_database::SupabaseClient;
use shared_models::PaymentStatus;
use shared_utils::test_utils::{test_start, TestConfig};

const FIRST_ORDER: &str = "ORDER_3_1748768400000";
const SECOND_ORDER: &str = "ORDER_3_1748768400001";

fn client(server: &MockServer) -> SupabaseClient {
    SupabaseClient::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config())
}

fn appointment_row(order_id: Option<&str>, payment_status: &str) -> Value {
    json!({
        "id": 3,
        "slot_id": 4,
        "doctor_id": 7,
        "appointment_type_id": 1,
        "consultation_mode": "PHYSICAL",
        "booking_date": "2025-06-01",
        "booking_time": "09:00:00",
        "payment_status": payment_status,
        "appointment_status": "PENDING",
        "order_id": order_id,
        "created_at": "2025-06-01T08:00:00+00:00"
    })
}

fn payment_row(order_id: &str, payment_status: &str) -> Value {
    json!({
        "id": 9,
        "appointment_id": 3,
        "order_id": order_id,
        "amount": 2500.0,
        "expected_amount": 2500.0,
        "gateway_name": "PAYHERE",
        "transaction_id": null,
        "method": null,
        "payment_status": payment_status,
        "created_at": "2025-06-01T08:00:00+00:00",
        "updated_at": "2025-06-01T08:00:00+00:00"
    })
}

fn draft(order_id: &str) -> CheckoutDraft {
    let now = test_start();
    CheckoutDraft {
        appointment_id: 3,
        order_id: order_id.to_string(),
        amount: 2500.0,
        expected_amount: 2500.0,
        now,
        lease_until: now + Duration::minutes(15),
    }
}

fn success(order_id: &str) -> NotificationUpdate {
    NotificationUpdate {
        appointment_id: 3,
        order_id: order_id.to_string(),
        amount: 2500.0,
        status: PaymentStatus::Success,
        transaction_id: Some("320025000001".to_string()),
        method: Some("VISA".to_string()),
        now: test_start(),
    }
}

async fn mount_appointment(server: &MockServer, row: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_checkout_records_payment_and_points_appointment() {
    let server = MockServer::start().await;
    mount_appointment(&server, appointment_row(None, "PENDING")).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .and(body_partial_json(json!({ "order_id": FIRST_ORDER, "payment_status": "PENDING" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([payment_row(FIRST_ORDER, "PENDING")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("payment_status", "neq.SUCCESS"))
        .and(query_param("slot_id", "not.is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(Some(FIRST_ORDER), "PENDING")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .and(query_param("id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let payment = client(&server).open_checkout(draft(FIRST_ORDER)).await.unwrap();

    assert_eq!(payment.order_id, FIRST_ORDER);
    assert_eq!(payment.expected_amount, Some(2500.0));
}

#[tokio::test]
async fn test_duplicate_order_id_is_reported() {
    let server = MockServer::start().await;
    mount_appointment(&server, appointment_row(None, "PENDING")).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key value violates unique constraint \"payments_order_id_key\""))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let result = client(&server).open_checkout(draft(FIRST_ORDER)).await;

    assert_matches!(result, Err(PaymentError::DuplicateOrderId(order)) if order == FIRST_ORDER);
}

#[tokio::test]
async fn test_superseded_order_leaves_appointment_alone() {
    let server = MockServer::start().await;
    mount_appointment(&server, appointment_row(Some(SECOND_ORDER), "PENDING")).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("order_id", format!("eq.{}", FIRST_ORDER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([payment_row(FIRST_ORDER, "PENDING")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(query_param("payment_status", "eq.PENDING"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([payment_row(FIRST_ORDER, "SUCCESS")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let reconciliation = client(&server).apply_notification(success(FIRST_ORDER)).await.unwrap();

    assert_eq!(reconciliation.payment.payment_status, PaymentStatus::Success);
    assert_eq!(
        reconciliation.effect,
        AppointmentEffect::Stale { current_order_id: Some(SECOND_ORDER.to_string()) }
    );
}

#[tokio::test]
async fn test_notification_losing_race_to_checkout_is_stale() {
    let server = MockServer::start().await;
    // First read sees the old order; the re-read after the guarded update
    // sees the order a concurrent checkout just opened.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(Some(FIRST_ORDER), "PENDING")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(Some(SECOND_ORDER), "PENDING")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([payment_row(FIRST_ORDER, "PENDING")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([payment_row(FIRST_ORDER, "SUCCESS")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("or", format!("(order_id.eq.{},order_id.is.null)", FIRST_ORDER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let reconciliation = client(&server).apply_notification(success(FIRST_ORDER)).await.unwrap();

    assert_eq!(reconciliation.payment.payment_status, PaymentStatus::Success);
    assert_eq!(
        reconciliation.effect,
        AppointmentEffect::Stale { current_order_id: Some(SECOND_ORDER.to_string()) }
    );
}

#[tokio::test]
async fn test_success_on_current_order_clears_lease() {
    let server = MockServer::start().await;
    mount_appointment(&server, appointment_row(Some(FIRST_ORDER), "PENDING")).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([payment_row(FIRST_ORDER, "PENDING")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([payment_row(FIRST_ORDER, "SUCCESS")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(Some(FIRST_ORDER), "SUCCESS")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .and(query_param("id", "eq.4"))
        .and(body_partial_json(json!({ "reserved_until": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let reconciliation = client(&server).apply_notification(success(FIRST_ORDER)).await.unwrap();

    assert_eq!(reconciliation.effect, AppointmentEffect::Updated(PaymentStatus::Success));
}
