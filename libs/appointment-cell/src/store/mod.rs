//! Persistence seams for availability slots and appointments.
//!
//! [`MemoryDatabase`](shared_database::MemoryDatabase) backs tests and local
//! runs; [`SupabaseClient`](shared_database::SupabaseClient) backs deployments.

mod memory;
mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use shared_models::{
    Appointment, AppointmentId, AppointmentStatus, DoctorId, NewAppointment, PaymentStatus, Slot,
    SlotId,
};

use crate::models::{AppointmentError, Placement, ReleasedReservation};

#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Adds unbooked slots, skipping times the doctor already has on `date`.
    async fn add_slots(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
        times: &[NaiveTime],
    ) -> Result<Vec<Slot>, AppointmentError>;

    async fn get_slot(&self, slot_id: SlotId) -> Result<Option<Slot>, AppointmentError>;

    /// Every slot the doctor has on `date`, booked or not, ordered by time.
    async fn slots_for_day(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, AppointmentError>;

    async fn unbooked_slots(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let slots = self.slots_for_day(doctor_id, date).await?;
        Ok(slots.into_iter().filter(|slot| !slot.booked).collect())
    }

    /// Moves an unbooked slot. Booked slots are immutable, and a doctor never
    /// gets two slots at the same date and time.
    async fn update_slot(
        &self,
        slot_id: SlotId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Slot, AppointmentError>;

    /// Deletes an unbooked slot. Booked slots are never deleted.
    async fn delete_slot(&self, slot_id: SlotId) -> Result<(), AppointmentError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Atomically flips `slot_id` from unbooked to booked (with a lease ending
    /// at `lease_until`) and creates the PENDING/PENDING appointment holding it.
    /// Fails with `SlotAlreadyBooked` if the slot is taken by the time the
    /// write happens.
    async fn reserve_slot(
        &self,
        slot_id: SlotId,
        draft: NewAppointment,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError>;

    async fn get_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<Appointment>, AppointmentError>;

    async fn list_appointments(
        &self,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Marks a paid appointment CONFIRMED at `placement`. The appointment must
    /// still hold its slot.
    async fn confirm_appointment(
        &self,
        appointment_id: AppointmentId,
        placement: Placement,
    ) -> Result<Appointment, AppointmentError>;

    /// Returns every booked slot whose lease ended at or before `now` to the
    /// pool, detaching it from its unpaid appointment.
    async fn release_expired_reservations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReleasedReservation>, AppointmentError>;
}

/// Preconditions for admin confirmation, in the order they are reported.
pub fn check_confirmable(appointment: &Appointment) -> Result<(), AppointmentError> {
    if appointment.payment_status != PaymentStatus::Success {
        return Err(AppointmentError::PaymentNotCompleted(appointment.id));
    }
    if appointment.appointment_status == AppointmentStatus::Confirmed {
        return Err(AppointmentError::AlreadyConfirmed(appointment.id));
    }
    if appointment.slot_id.is_none() {
        return Err(AppointmentError::SlotNotHeld(appointment.id));
    }
    Ok(())
}
