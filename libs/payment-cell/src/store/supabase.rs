//! PostgREST-backed payments. Each step re-checks its precondition in the
//! request filter, so a checkout racing a notification for the same
//! appointment cannot overwrite a newer order's state.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use shared_database::{
    AppointmentRow, DatabaseError, PaymentRow, SlotRow, SupabaseClient,
};
use shared_models::{Appointment, AppointmentId, Payment, PaymentStatus};

use super::{check_notification, CheckoutDraft, NotificationUpdate, PaymentStore, GATEWAY_NAME};
use crate::models::{AppointmentEffect, PaymentError, Reconciliation};

const PAYMENTS: &str = "payments";
const APPOINTMENTS: &str = "appointments";
const SLOTS: &str = "slots";

fn database_error(e: anyhow::Error) -> PaymentError {
    error!("Supabase payment request failed: {}", e);
    PaymentError::DatabaseError(e.to_string())
}

fn is_duplicate_key(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<DatabaseError>(), Some(DatabaseError::DuplicateKey(_)))
}

async fn load_appointment(
    supabase: &SupabaseClient,
    appointment_id: AppointmentId,
) -> Result<Appointment, PaymentError> {
    let rows: Vec<AppointmentRow> = supabase
        .select(APPOINTMENTS, &format!("id=eq.{}", appointment_id))
        .await
        .map_err(database_error)?;
    rows.into_iter()
        .next()
        .map(Appointment::from)
        .ok_or(PaymentError::AppointmentNotFound(appointment_id))
}

#[async_trait]
impl PaymentStore for SupabaseClient {
    async fn open_checkout(&self, draft: CheckoutDraft) -> Result<Payment, PaymentError> {
        let appointment = load_appointment(self, draft.appointment_id).await?;
        if appointment.payment_status == PaymentStatus::Success {
            return Err(PaymentError::AlreadyPaid(draft.appointment_id));
        }
        let slot_id = appointment.slot_id
            .ok_or(PaymentError::ReservationExpired(draft.appointment_id))?;

        let body = json!({
            "appointment_id": draft.appointment_id,
            "order_id": draft.order_id,
            "amount": draft.amount,
            "expected_amount": draft.expected_amount,
            "gateway_name": GATEWAY_NAME,
            "payment_status": PaymentStatus::Pending,
            "created_at": draft.now,
            "updated_at": draft.now,
        });
        let inserted: Vec<PaymentRow> = self.insert(PAYMENTS, body).await.map_err(|e| {
            if is_duplicate_key(&e) {
                PaymentError::DuplicateOrderId(draft.order_id.clone())
            } else {
                database_error(e)
            }
        })?;
        let payment = inserted.into_iter().next().map(Payment::from).ok_or_else(|| {
            PaymentError::DatabaseError(format!("Payment insert for {} returned no row", draft.order_id))
        })?;

        // The appointment only follows the new order while it is unpaid and
        // still holds its slot.
        let pointed: Vec<AppointmentRow> = self
            .update(
                APPOINTMENTS,
                &format!("id=eq.{}&payment_status=neq.SUCCESS&slot_id=not.is.null", draft.appointment_id),
                json!({ "order_id": draft.order_id, "payment_status": PaymentStatus::Pending }),
            )
            .await
            .map_err(database_error)?;

        if pointed.is_empty() {
            let _: Vec<PaymentRow> = self
                .delete(PAYMENTS, &format!("order_id=eq.{}&payment_status=eq.PENDING", draft.order_id))
                .await
                .map_err(database_error)?;

            let current = load_appointment(self, draft.appointment_id).await?;
            return Err(if current.payment_status == PaymentStatus::Success {
                PaymentError::AlreadyPaid(draft.appointment_id)
            } else {
                PaymentError::ReservationExpired(draft.appointment_id)
            });
        }

        let renewed: Vec<SlotRow> = self
            .update(
                SLOTS,
                &format!("id=eq.{}&booked=eq.true", slot_id),
                json!({ "reserved_until": draft.lease_until }),
            )
            .await
            .map_err(database_error)?;
        if renewed.is_empty() {
            warn!("Slot {} was released while checkout {} was opening", slot_id, draft.order_id);
        }

        debug!("Opened checkout {} for appointment {}", draft.order_id, draft.appointment_id);
        Ok(payment)
    }

    async fn apply_notification(&self, update: NotificationUpdate) -> Result<Reconciliation, PaymentError> {
        let appointment = load_appointment(self, update.appointment_id).await?;

        let existing = self.find_by_order(&update.order_id).await?;
        check_notification(existing.as_ref(), &update)?;

        let payment = match existing {
            Some(existing) => record_on_existing(self, &existing, &update).await?,
            None => record_new(self, &update).await?,
        };

        let is_current = appointment.order_id.is_none() || appointment.is_current_order(&update.order_id);
        if !is_current {
            return Ok(Reconciliation {
                payment,
                effect: AppointmentEffect::Stale { current_order_id: appointment.order_id },
            });
        }

        let updated: Vec<AppointmentRow> = self
            .update(
                APPOINTMENTS,
                &format!("id=eq.{}&or=(order_id.eq.{},order_id.is.null)", update.appointment_id, update.order_id),
                json!({ "payment_status": update.status, "order_id": update.order_id }),
            )
            .await
            .map_err(database_error)?;

        let Some(appointment) = updated.into_iter().next().map(Appointment::from) else {
            // A checkout moved the appointment to a newer order in between.
            let current = load_appointment(self, update.appointment_id).await?;
            return Ok(Reconciliation {
                payment,
                effect: AppointmentEffect::Stale { current_order_id: current.order_id },
            });
        };

        if update.status != PaymentStatus::Success {
            return Ok(Reconciliation { payment, effect: AppointmentEffect::Updated(update.status) });
        }

        let effect = match appointment.slot_id {
            Some(slot_id) => {
                let _: Vec<SlotRow> = self
                    .update(SLOTS, &format!("id=eq.{}", slot_id), json!({ "reserved_until": null }))
                    .await
                    .map_err(database_error)?;
                AppointmentEffect::Updated(update.status)
            }
            None => reacquire_slot(self, &appointment).await?,
        };

        Ok(Reconciliation { payment, effect })
    }

    async fn find_by_order(&self, order_id: &str) -> Result<Option<Payment>, PaymentError> {
        let rows: Vec<PaymentRow> = self
            .select(PAYMENTS, &format!("order_id=eq.{}", order_id))
            .await
            .map_err(database_error)?;
        Ok(rows.into_iter().next().map(Payment::from))
    }

    async fn payments_for_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Vec<Payment>, PaymentError> {
        let rows: Vec<PaymentRow> = self
            .select(PAYMENTS, &format!("appointment_id=eq.{}&order=id.asc", appointment_id))
            .await
            .map_err(database_error)?;
        Ok(rows.into_iter().map(Payment::from).collect())
    }
}

async fn record_on_existing(
    supabase: &SupabaseClient,
    existing: &Payment,
    update: &NotificationUpdate,
) -> Result<Payment, PaymentError> {
    if (existing.amount - update.amount).abs() >= 0.005 {
        warn!("Order {} notified {:.2} but checkout recorded {:.2}",
              update.order_id, update.amount, existing.amount);
    }

    let mut update_data = Map::new();
    update_data.insert("payment_status".to_string(), json!(update.status));
    update_data.insert("updated_at".to_string(), json!(update.now));
    if let Some(transaction_id) = &update.transaction_id {
        update_data.insert("transaction_id".to_string(), json!(transaction_id));
    }
    if let Some(method) = &update.method {
        update_data.insert("method".to_string(), json!(method));
    }

    // Filtering on the status we read turns concurrent deliveries into a
    // compare-and-set; the loser re-reads and is classified again.
    let rows: Vec<PaymentRow> = supabase
        .update(
            PAYMENTS,
            &format!("order_id=eq.{}&payment_status=eq.{}", update.order_id, existing.payment_status),
            Value::Object(update_data),
        )
        .await
        .map_err(database_error)?;

    match rows.into_iter().next() {
        Some(row) => Ok(Payment::from(row)),
        None => {
            let current = supabase.find_by_order(&update.order_id).await?;
            check_notification(current.as_ref(), update)?;
            Err(PaymentError::DatabaseError(format!(
                "Payment {} changed while applying notification", update.order_id
            )))
        }
    }
}

async fn record_new(supabase: &SupabaseClient, update: &NotificationUpdate) -> Result<Payment, PaymentError> {
    info!("No checkout row for order {}; recording notification as a new payment", update.order_id);

    let body = json!({
        "appointment_id": update.appointment_id,
        "order_id": update.order_id,
        "amount": update.amount,
        "gateway_name": GATEWAY_NAME,
        "transaction_id": update.transaction_id,
        "method": update.method,
        "payment_status": update.status,
        "created_at": update.now,
        "updated_at": update.now,
    });

    match supabase.insert::<PaymentRow>(PAYMENTS, body).await {
        Ok(rows) => rows.into_iter().next().map(Payment::from).ok_or_else(|| {
            PaymentError::DatabaseError(format!("Payment insert for {} returned no row", update.order_id))
        }),
        Err(e) if is_duplicate_key(&e) => {
            // Another delivery for the same order inserted first.
            let current = supabase.find_by_order(&update.order_id).await?;
            check_notification(current.as_ref(), update)?;
            match current {
                Some(existing) => record_on_existing(supabase, &existing, update).await,
                None => Err(PaymentError::DuplicateOrderId(update.order_id.clone())),
            }
        }
        Err(e) => Err(database_error(e)),
    }
}

/// A payment landed after the reservation was released. Takes the slot back
/// if nobody else booked it in the meantime.
async fn reacquire_slot(
    supabase: &SupabaseClient,
    appointment: &Appointment,
) -> Result<AppointmentEffect, PaymentError> {
    let candidates: Vec<SlotRow> = supabase
        .select(SLOTS, &format!(
            "doctor_id=eq.{}&date=eq.{}&time=eq.{}&booked=eq.false",
            appointment.doctor_id,
            appointment.booking_date,
            appointment.booking_time.format("%H:%M:%S"),
        ))
        .await
        .map_err(database_error)?;

    for candidate in candidates {
        let claimed: Vec<SlotRow> = supabase
            .update(
                SLOTS,
                &format!("id=eq.{}&booked=eq.false", candidate.id),
                json!({ "booked": true, "reserved_until": null }),
            )
            .await
            .map_err(database_error)?;
        if claimed.is_empty() {
            continue;
        }

        let _: Vec<AppointmentRow> = supabase
            .update(APPOINTMENTS, &format!("id=eq.{}", appointment.id), json!({ "slot_id": candidate.id }))
            .await
            .map_err(database_error)?;
        info!("Re-acquired slot {} for late payment on appointment {}", candidate.id, appointment.id);
        return Ok(AppointmentEffect::SlotReacquired(candidate.id));
    }

    warn!("Appointment {} paid after its slot {} {} was rebooked; needs manual follow-up",
          appointment.id, appointment.booking_date, appointment.booking_time);
    Ok(AppointmentEffect::SlotLost)
}
