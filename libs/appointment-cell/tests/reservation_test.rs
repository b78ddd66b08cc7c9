use std::sync::Arc;

use chrono::Duration;

use appointment_cell::models::ReleasedReservation;
use appointment_cell::services::ReservationSweeper;
use appointment_cell::store::AppointmentStore;

mod common;
use common::*;

fn sweeper(harness: &Harness) -> Arc<ReservationSweeper> {
    Arc::new(ReservationSweeper::new(
        harness.db.clone(),
        harness.clock.clone(),
        tokio::time::Duration::from_millis(10),
    ))
}

#[tokio::test]
async fn test_sweep_releases_only_expired_leases() {
    let harness = Harness::new();
    let slots = harness.add_slots(&[nine(), half_past_nine()]).await;
    let sweeper = sweeper(&harness);

    let early = harness.state.booking.book(booking_request(PHYSICAL_TYPE_ID, nine())).await.unwrap();
    harness.clock.advance(Duration::minutes(10));
    let late = harness.state.booking.book(booking_request(PHYSICAL_TYPE_ID, half_past_nine())).await.unwrap();

    assert!(sweeper.sweep_once().await.unwrap().is_empty());

    harness.clock.advance(Duration::minutes(6));
    let released = sweeper.sweep_once().await.unwrap();

    assert_eq!(released, vec![ReleasedReservation {
        slot_id: slots[0].id,
        appointment_id: Some(early.id),
    }]);
    assert!(!harness.slot(slots[0].id).await.booked);
    assert_eq!(harness.slot(slots[0].id).await.reserved_until, None);
    assert!(harness.slot(slots[1].id).await.booked);

    let detached = harness.db.get_appointment(early.id).await.unwrap().unwrap();
    assert_eq!(detached.slot_id, None);
    let still_held = harness.db.get_appointment(late.id).await.unwrap().unwrap();
    assert_eq!(still_held.slot_id, Some(slots[1].id));
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let harness = Harness::new();
    harness.add_slots(&[nine()]).await;
    let sweeper = sweeper(&harness);

    harness.state.booking.book(booking_request(PHYSICAL_TYPE_ID, nine())).await.unwrap();
    harness.clock.advance(Duration::minutes(30));

    assert_eq!(sweeper.sweep_once().await.unwrap().len(), 1);
    assert!(sweeper.sweep_once().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_background_loop_releases_and_stops() {
    let harness = Harness::new();
    let slot = harness.add_slots(&[nine()]).await.remove(0);
    let sweeper = sweeper(&harness);

    harness.state.booking.book(booking_request(PHYSICAL_TYPE_ID, nine())).await.unwrap();
    harness.clock.advance(Duration::minutes(16));

    let handle = tokio::spawn(sweeper.clone().run());
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    assert!(!harness.slot(slot.id).await.booked);

    sweeper.shutdown().await;
    assert!(!sweeper.is_running().await);
    tokio::time::timeout(tokio::time::Duration::from_secs(1), handle)
        .await
        .expect("sweeper should stop after shutdown")
        .unwrap();
}
