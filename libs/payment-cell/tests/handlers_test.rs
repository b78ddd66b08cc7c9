use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use payment_cell::router::payment_routes;
use shared_models::PaymentStatus;

mod common;
use common::*;

fn app(harness: &Harness) -> Router {
    Router::new().nest("/payments", payment_routes(Arc::clone(&harness.payments)))
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn form_body(order_id: &str, status_code: &str) -> String {
    let n = notification(order_id, "2500.00", status_code);
    format!(
        "merchant_id={}&order_id={}&payhere_amount={}&payhere_currency=LKR&status_code={}&md5sig={}&payment_id={}&method={}",
        n.merchant_id, n.order_id, n.payhere_amount, n.status_code, n.md5sig, n.payment_id, n.method
    )
}

fn notify_request(body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/payments/notify")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_pay_renders_auto_submit_form() {
    let harness = Harness::new();
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    let response = app(&harness)
        .oneshot(
            Request::builder()
                .uri(format!("/payments/pay/{}", appointment.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let html = body_text(response).await;
    assert!(html.contains("https://sandbox.payhere.lk/pay/checkout"));
    assert!(html.contains("name=\"amount\" value=\"2500.00\""));
    assert!(html.contains(&format!("ORDER_{}_", appointment.id)));
}

#[tokio::test]
async fn test_checkout_json_with_amount_override() {
    let harness = Harness::new();
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;

    let response = app(&harness)
        .oneshot(
            Request::builder()
                .uri(format!("/payments/checkout/{}?amount=1800", appointment.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["amount"], "1800.00");
    assert_eq!(json["currency"], "LKR");
}

#[tokio::test]
async fn test_checkout_unknown_appointment_is_not_found() {
    let harness = Harness::new();

    let response = app(&harness)
        .oneshot(Request::builder().uri("/payments/checkout/404").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notify_form_acknowledges_and_applies() {
    let harness = Harness::new();
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;
    let order_id = harness.payments.gateway.build_checkout(appointment.id, None).await.unwrap().order_id;

    let response = app(&harness)
        .oneshot(notify_request(form_body(&order_id, "2")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
    assert_eq!(harness.appointment(appointment.id).await.payment_status, PaymentStatus::Success);
}

#[tokio::test]
async fn test_notify_acknowledges_garbage() {
    let harness = Harness::new();

    let response = app(&harness)
        .oneshot(notify_request("order_id=nonsense&status_code=2".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let response = app(&harness)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/payments/notify")
                .body(Body::from("not a form"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_payment_history_for_appointment() {
    let harness = Harness::new();
    harness.add_slot(nine()).await;
    let appointment = harness.book(nine()).await;
    harness.payments.gateway.build_checkout(appointment.id, None).await.unwrap();

    let response = app(&harness)
        .oneshot(
            Request::builder()
                .uri(format!("/payments/appointment/{}", appointment.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["paymentStatus"], "PENDING");
    assert_eq!(json[0]["gatewayName"], "PAYHERE");
}
