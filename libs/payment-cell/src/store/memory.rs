use async_trait::async_trait;
use tracing::{debug, info, warn};

use shared_database::{MemoryDatabase, Tables};
use shared_models::{Appointment, AppointmentId, Payment, PaymentStatus};

use super::{check_notification, CheckoutDraft, NotificationUpdate, PaymentStore, GATEWAY_NAME};
use crate::models::{AppointmentEffect, PaymentError, Reconciliation};

#[async_trait]
impl PaymentStore for MemoryDatabase {
    async fn open_checkout(&self, draft: CheckoutDraft) -> Result<Payment, PaymentError> {
        self.transaction(|tables| {
            let appointment = tables.appointments.get(&draft.appointment_id)
                .ok_or(PaymentError::AppointmentNotFound(draft.appointment_id))?;

            if appointment.payment_status == PaymentStatus::Success {
                return Err(PaymentError::AlreadyPaid(draft.appointment_id));
            }
            let slot_id = appointment.slot_id
                .ok_or(PaymentError::ReservationExpired(draft.appointment_id))?;
            if tables.order_exists(&draft.order_id) {
                return Err(PaymentError::DuplicateOrderId(draft.order_id.clone()));
            }

            let payment = tables.insert_payment(Payment {
                id: 0,
                appointment_id: draft.appointment_id,
                order_id: draft.order_id.clone(),
                amount: draft.amount,
                expected_amount: Some(draft.expected_amount),
                gateway_name: GATEWAY_NAME.to_string(),
                transaction_id: None,
                method: None,
                payment_status: PaymentStatus::Pending,
                created_at: draft.now,
                updated_at: draft.now,
            })?;

            if let Some(appointment) = tables.appointments.get_mut(&draft.appointment_id) {
                appointment.order_id = Some(draft.order_id.clone());
                appointment.payment_status = PaymentStatus::Pending;
            }
            if let Some(slot) = tables.slots.get_mut(&slot_id) {
                slot.reserved_until = Some(draft.lease_until);
            }

            debug!("Opened checkout {} for appointment {}", draft.order_id, draft.appointment_id);
            Ok(payment)
        }).await
    }

    async fn apply_notification(&self, update: NotificationUpdate) -> Result<Reconciliation, PaymentError> {
        self.transaction(|tables| {
            let appointment = tables.appointments.get(&update.appointment_id)
                .ok_or(PaymentError::AppointmentNotFound(update.appointment_id))?;
            let is_current = appointment.order_id.is_none() || appointment.is_current_order(&update.order_id);
            let current_order_id = appointment.order_id.clone();

            check_notification(tables.payment_by_order(&update.order_id), &update)?;

            let payment = record_payment(tables, &update)?;

            if !is_current {
                return Ok(Reconciliation {
                    payment,
                    effect: AppointmentEffect::Stale { current_order_id },
                });
            }

            let effect = update_appointment(tables, &update);
            Ok(Reconciliation { payment, effect })
        }).await
    }

    async fn find_by_order(&self, order_id: &str) -> Result<Option<Payment>, PaymentError> {
        Ok(self.transaction(|tables| tables.payment_by_order(order_id).cloned()).await)
    }

    async fn payments_for_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Vec<Payment>, PaymentError> {
        Ok(self.transaction(|tables| {
            tables.payments.values()
                .filter(|payment| payment.appointment_id == appointment_id)
                .cloned()
                .collect()
        }).await)
    }
}

fn record_payment(tables: &mut Tables, update: &NotificationUpdate) -> Result<Payment, PaymentError> {
    if let Some(payment) = tables.payment_by_order_mut(&update.order_id) {
        if (payment.amount - update.amount).abs() >= 0.005 {
            warn!("Order {} notified {:.2} but checkout recorded {:.2}",
                  update.order_id, update.amount, payment.amount);
        }
        payment.payment_status = update.status;
        payment.transaction_id = update.transaction_id.clone().or(payment.transaction_id.take());
        payment.method = update.method.clone().or(payment.method.take());
        payment.updated_at = update.now;
        return Ok(payment.clone());
    }

    info!("No checkout row for order {}; recording notification as a new payment", update.order_id);
    Ok(tables.insert_payment(Payment {
        id: 0,
        appointment_id: update.appointment_id,
        order_id: update.order_id.clone(),
        amount: update.amount,
        expected_amount: None,
        gateway_name: GATEWAY_NAME.to_string(),
        transaction_id: update.transaction_id.clone(),
        method: update.method.clone(),
        payment_status: update.status,
        created_at: update.now,
        updated_at: update.now,
    })?)
}

fn update_appointment(tables: &mut Tables, update: &NotificationUpdate) -> AppointmentEffect {
    let Some(appointment) = tables.appointments.get_mut(&update.appointment_id) else {
        return AppointmentEffect::Updated(update.status);
    };
    appointment.payment_status = update.status;
    appointment.order_id.get_or_insert_with(|| update.order_id.clone());

    if update.status != PaymentStatus::Success {
        return AppointmentEffect::Updated(update.status);
    }

    if let Some(slot_id) = appointment.slot_id {
        if let Some(slot) = tables.slots.get_mut(&slot_id) {
            slot.reserved_until = None;
        }
        return AppointmentEffect::Updated(update.status);
    }

    let booking = appointment.clone();
    reacquire_slot(tables, &booking)
}

/// A payment landed after the sweeper released the reservation. Takes the
/// slot back if nobody else booked it in the meantime.
fn reacquire_slot(tables: &mut Tables, appointment: &Appointment) -> AppointmentEffect {
    let free_slot = tables.slots.values_mut().find(|slot| {
        slot.doctor_id == appointment.doctor_id
            && slot.date == appointment.booking_date
            && slot.time == appointment.booking_time
            && !slot.booked
    });

    match free_slot {
        Some(slot) => {
            slot.booked = true;
            slot.reserved_until = None;
            let slot_id = slot.id;
            if let Some(appointment) = tables.appointments.get_mut(&appointment.id) {
                appointment.slot_id = Some(slot_id);
            }
            info!("Re-acquired slot {} for late payment on appointment {}", slot_id, appointment.id);
            AppointmentEffect::SlotReacquired(slot_id)
        }
        None => {
            warn!("Appointment {} paid after its slot {} {} was rebooked; needs manual follow-up",
                  appointment.id, appointment.booking_date, appointment.booking_time);
            AppointmentEffect::SlotLost
        }
    }
}
