//! PostgREST-backed slots and appointments.
//!
//! PostgREST offers no transaction spanning several requests, so every state
//! change is a conditional PATCH whose filter restates its precondition. An
//! empty representation means the precondition no longer held.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use shared_database::{filter_timestamp, AppointmentRow, DatabaseError, SlotRow, SupabaseClient};
use shared_models::{
    Appointment, AppointmentId, AppointmentStatus, DoctorId, NewAppointment, PaymentStatus, Slot,
    SlotId,
};

use super::{check_confirmable, AppointmentStore, SlotStore};
use crate::models::{AppointmentError, Placement, ReleasedReservation};

const SLOTS: &str = "slots";
const APPOINTMENTS: &str = "appointments";

fn database_error(e: anyhow::Error) -> AppointmentError {
    error!("Supabase store request failed: {}", e);
    AppointmentError::DatabaseError(e.to_string())
}

fn time_filter(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

async fn slot_rows(supabase: &SupabaseClient, query: &str) -> Result<Vec<Slot>, AppointmentError> {
    let rows: Vec<SlotRow> = supabase.select(SLOTS, query).await.map_err(database_error)?;
    Ok(rows.into_iter().map(Slot::from).collect())
}

async fn appointment_rows(
    supabase: &SupabaseClient,
    query: &str,
) -> Result<Vec<Appointment>, AppointmentError> {
    let rows: Vec<AppointmentRow> = supabase.select(APPOINTMENTS, query).await.map_err(database_error)?;
    Ok(rows.into_iter().map(Appointment::from).collect())
}

#[async_trait]
impl SlotStore for SupabaseClient {
    async fn add_slots(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
        times: &[NaiveTime],
    ) -> Result<Vec<Slot>, AppointmentError> {
        let existing = self.slots_for_day(doctor_id, date).await?;

        let mut fresh: Vec<NaiveTime> = Vec::with_capacity(times.len());
        for time in times {
            if existing.iter().any(|slot| slot.time == *time) || fresh.contains(time) {
                debug!("Skipping duplicate slot {} {} for doctor {}", date, time, doctor_id);
                continue;
            }
            fresh.push(*time);
        }

        if fresh.is_empty() {
            return Ok(Vec::new());
        }

        let body: Vec<Value> = fresh.iter()
            .map(|time| json!({
                "doctor_id": doctor_id,
                "date": date,
                "time": time,
                "booked": false,
            }))
            .collect();

        let rows: Vec<SlotRow> = self.insert(SLOTS, Value::Array(body)).await
            .map_err(database_error)?;
        Ok(rows.into_iter().map(Slot::from).collect())
    }

    async fn get_slot(&self, slot_id: SlotId) -> Result<Option<Slot>, AppointmentError> {
        Ok(slot_rows(self, &format!("id=eq.{}", slot_id)).await?.into_iter().next())
    }

    async fn slots_for_day(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, AppointmentError> {
        slot_rows(self, &format!("doctor_id=eq.{}&date=eq.{}&order=time.asc,id.asc", doctor_id, date)).await
    }

    async fn update_slot(
        &self,
        slot_id: SlotId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Slot, AppointmentError> {
        let slot = self.get_slot(slot_id).await?
            .ok_or_else(|| AppointmentError::slot_not_found(slot_id))?;
        if slot.booked {
            return Err(AppointmentError::SlotInUse(slot_id));
        }

        let clashes = slot_rows(self, &format!(
            "doctor_id=eq.{}&date=eq.{}&time=eq.{}&id=neq.{}",
            slot.doctor_id, date, time_filter(time), slot_id
        )).await?;
        if !clashes.is_empty() {
            return Err(AppointmentError::DuplicateSlot(slot.doctor_id, date, time));
        }

        let rows: Vec<SlotRow> = self
            .update(SLOTS, &format!("id=eq.{}&booked=eq.false", slot_id), json!({ "date": date, "time": time }))
            .await
            .map_err(|e| match e.downcast_ref::<DatabaseError>() {
                Some(DatabaseError::DuplicateKey(_)) => AppointmentError::DuplicateSlot(slot.doctor_id, date, time),
                None => database_error(e),
            })?;

        rows.into_iter().next()
            .map(Slot::from)
            .ok_or(AppointmentError::SlotInUse(slot_id))
    }

    async fn delete_slot(&self, slot_id: SlotId) -> Result<(), AppointmentError> {
        let slot = self.get_slot(slot_id).await?
            .ok_or_else(|| AppointmentError::slot_not_found(slot_id))?;
        if slot.booked {
            return Err(AppointmentError::SlotInUse(slot_id));
        }

        let holders = appointment_rows(self, &format!("slot_id=eq.{}", slot_id)).await?;
        if !holders.is_empty() {
            return Err(AppointmentError::SlotInUse(slot_id));
        }

        let deleted: Vec<SlotRow> = self.delete(SLOTS, &format!("id=eq.{}&booked=eq.false", slot_id)).await
            .map_err(database_error)?;
        if deleted.is_empty() {
            return Err(AppointmentError::SlotInUse(slot_id));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for SupabaseClient {
    async fn reserve_slot(
        &self,
        slot_id: SlotId,
        draft: NewAppointment,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let claimed: Vec<SlotRow> = self
            .update(
                SLOTS,
                &format!("id=eq.{}&booked=eq.false&doctor_id=eq.{}", slot_id, draft.doctor_id),
                json!({ "booked": true, "reserved_until": lease_until }),
            )
            .await
            .map_err(database_error)?;

        let slot = match claimed.into_iter().next() {
            Some(row) => Slot::from(row),
            None => {
                let current = self.get_slot(slot_id).await?
                    .ok_or_else(|| AppointmentError::slot_not_found(slot_id))?;
                return Err(if current.booked {
                    AppointmentError::SlotAlreadyBooked(slot_id)
                } else {
                    AppointmentError::ValidationError(format!(
                        "Slot {} does not belong to doctor {}", slot_id, draft.doctor_id
                    ))
                });
            }
        };

        let body = json!({
            "slot_id": slot_id,
            "doctor_id": draft.doctor_id,
            "appointment_type_id": draft.appointment_type_id,
            "consultation_mode": draft.consultation_mode,
            "booking_date": slot.date,
            "booking_time": slot.time,
            "reason": draft.reason,
            "payment_status": PaymentStatus::Pending,
            "appointment_status": AppointmentStatus::Pending,
            "created_at": now,
        });

        let created: Result<Vec<AppointmentRow>, _> = self.insert(APPOINTMENTS, body).await;
        match created.map(|rows| rows.into_iter().next()) {
            Ok(Some(row)) => Ok(Appointment::from(row)),
            outcome => {
                // Hand the slot back so a failed insert does not strand it.
                let restored: Result<Vec<SlotRow>, _> = self
                    .update(
                        SLOTS,
                        &format!("id=eq.{}&booked=eq.true", slot_id),
                        json!({ "booked": false, "reserved_until": null }),
                    )
                    .await;
                if let Err(e) = restored {
                    error!("Slot {} left booked after failed appointment insert: {}", slot_id, e);
                }

                Err(match outcome {
                    Err(e) => database_error(e),
                    _ => AppointmentError::DatabaseError("Failed to create appointment".to_string()),
                })
            }
        }
    }

    async fn get_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<Appointment>, AppointmentError> {
        Ok(appointment_rows(self, &format!("id=eq.{}", appointment_id)).await?.into_iter().next())
    }

    async fn list_appointments(
        &self,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let query = match payment_status {
            Some(status) => format!("payment_status=eq.{}&order=id.asc", status),
            None => "order=id.asc".to_string(),
        };
        appointment_rows(self, &query).await
    }

    async fn confirm_appointment(
        &self,
        appointment_id: AppointmentId,
        placement: Placement,
    ) -> Result<Appointment, AppointmentError> {
        let mut update_data = Map::new();
        match placement {
            Placement::PhysicalLocation(location) => {
                update_data.insert("physical_location".to_string(), json!(location));
            }
            Placement::OnlineLink(link) => {
                update_data.insert("online_link".to_string(), json!(link));
            }
        }
        update_data.insert("appointment_status".to_string(), json!(AppointmentStatus::Confirmed));

        let filter = format!(
            "id=eq.{}&payment_status=eq.SUCCESS&appointment_status=eq.PENDING&slot_id=not.is.null",
            appointment_id
        );
        let rows: Vec<AppointmentRow> = self.update(APPOINTMENTS, &filter, Value::Object(update_data)).await
            .map_err(database_error)?;

        if let Some(row) = rows.into_iter().next() {
            return Ok(Appointment::from(row));
        }

        let current = self.get_appointment(appointment_id).await?
            .ok_or_else(|| AppointmentError::appointment_not_found(appointment_id))?;
        check_confirmable(&current)?;
        Err(AppointmentError::DatabaseError(format!(
            "Appointment {} changed while being confirmed", appointment_id
        )))
    }

    async fn release_expired_reservations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReleasedReservation>, AppointmentError> {
        let cutoff = filter_timestamp(now);
        let expired = slot_rows(self, &format!("booked=eq.true&reserved_until=lte.{}&order=id.asc", cutoff)).await?;

        let mut released = Vec::with_capacity(expired.len());
        for slot in expired {
            let holder = appointment_rows(self, &format!("slot_id=eq.{}", slot.id)).await?
                .into_iter()
                .next();

            if let Some(paid) = holder.as_ref().filter(|a| a.payment_status == PaymentStatus::Success) {
                warn!("Slot {} held by paid appointment {} had a live lease", slot.id, paid.id);
                let _: Vec<SlotRow> = self
                    .update(SLOTS, &format!("id=eq.{}", slot.id), json!({ "reserved_until": null }))
                    .await
                    .map_err(database_error)?;
                continue;
            }

            // A renewed lease no longer matches the cutoff and is left alone.
            let freed: Vec<SlotRow> = self
                .update(
                    SLOTS,
                    &format!("id=eq.{}&booked=eq.true&reserved_until=lte.{}", slot.id, cutoff),
                    json!({ "booked": false, "reserved_until": null }),
                )
                .await
                .map_err(database_error)?;
            if freed.is_empty() {
                debug!("Slot {} lease changed before release", slot.id);
                continue;
            }

            if let Some(appointment) = &holder {
                let detached: Vec<AppointmentRow> = self
                    .update(
                        APPOINTMENTS,
                        &format!("id=eq.{}&slot_id=eq.{}&payment_status=neq.SUCCESS", appointment.id, slot.id),
                        json!({ "slot_id": null }),
                    )
                    .await
                    .map_err(database_error)?;

                if detached.is_empty() {
                    // Paid between the read and the release; put the booking back.
                    let restored: Vec<SlotRow> = self
                        .update(
                            SLOTS,
                            &format!("id=eq.{}&booked=eq.false", slot.id),
                            json!({ "booked": true, "reserved_until": null }),
                        )
                        .await
                        .map_err(database_error)?;
                    if restored.is_empty() {
                        error!("Slot {} was taken before paid appointment {} could keep it", slot.id, appointment.id);
                    } else {
                        info!("Kept slot {} for appointment {} paid during release", slot.id, appointment.id);
                    }
                    continue;
                }
            }

            released.push(ReleasedReservation {
                slot_id: slot.id,
                appointment_id: holder.map(|appointment| appointment.id),
            });
        }

        Ok(released)
    }
}
