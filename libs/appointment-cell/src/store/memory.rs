use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};

use shared_database::MemoryDatabase;
use shared_models::{
    Appointment, AppointmentId, AppointmentStatus, DoctorId, NewAppointment, PaymentStatus, Slot,
    SlotId,
};

use super::{check_confirmable, AppointmentStore, SlotStore};
use crate::models::{AppointmentError, Placement, ReleasedReservation};

#[async_trait]
impl SlotStore for MemoryDatabase {
    async fn add_slots(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
        times: &[NaiveTime],
    ) -> Result<Vec<Slot>, AppointmentError> {
        let created = self.transaction(|tables| {
            let mut created = Vec::with_capacity(times.len());
            for time in times {
                let exists = tables.slots.values().any(|slot| {
                    slot.doctor_id == doctor_id && slot.date == date && slot.time == *time
                });
                if exists {
                    debug!("Skipping duplicate slot {} {} for doctor {}", date, time, doctor_id);
                    continue;
                }
                created.push(tables.insert_slot(doctor_id, date, *time));
            }
            created
        }).await;

        Ok(created)
    }

    async fn get_slot(&self, slot_id: SlotId) -> Result<Option<Slot>, AppointmentError> {
        Ok(self.transaction(|tables| tables.slots.get(&slot_id).cloned()).await)
    }

    async fn slots_for_day(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let mut slots: Vec<Slot> = self.transaction(|tables| {
            tables.slots.values()
                .filter(|slot| slot.doctor_id == doctor_id && slot.date == date)
                .cloned()
                .collect()
        }).await;

        slots.sort_by_key(|slot| (slot.time, slot.id));
        Ok(slots)
    }

    async fn update_slot(
        &self,
        slot_id: SlotId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Slot, AppointmentError> {
        self.transaction(|tables| {
            let doctor_id = match tables.slots.get(&slot_id) {
                None => return Err(AppointmentError::slot_not_found(slot_id)),
                Some(slot) if slot.booked => return Err(AppointmentError::SlotInUse(slot_id)),
                Some(slot) => slot.doctor_id,
            };

            let clashes = tables.slots.values().any(|other| {
                other.id != slot_id
                    && other.doctor_id == doctor_id
                    && other.date == date
                    && other.time == time
            });
            if clashes {
                return Err(AppointmentError::DuplicateSlot(doctor_id, date, time));
            }

            let slot = tables.slots.get_mut(&slot_id)
                .ok_or_else(|| AppointmentError::slot_not_found(slot_id))?;
            slot.date = date;
            slot.time = time;
            Ok(slot.clone())
        }).await
    }

    async fn delete_slot(&self, slot_id: SlotId) -> Result<(), AppointmentError> {
        self.transaction(|tables| {
            let slot = tables.slots.get(&slot_id)
                .ok_or_else(|| AppointmentError::slot_not_found(slot_id))?;

            if slot.booked || tables.appointment_for_slot(slot_id).is_some() {
                return Err(AppointmentError::SlotInUse(slot_id));
            }

            tables.slots.remove(&slot_id);
            Ok(())
        }).await
    }
}

#[async_trait]
impl AppointmentStore for MemoryDatabase {
    async fn reserve_slot(
        &self,
        slot_id: SlotId,
        draft: NewAppointment,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.transaction(|tables| {
            let slot = tables.slots.get(&slot_id)
                .ok_or_else(|| AppointmentError::slot_not_found(slot_id))?;

            if slot.booked {
                return Err(AppointmentError::SlotAlreadyBooked(slot_id));
            }
            if slot.doctor_id != draft.doctor_id {
                return Err(AppointmentError::ValidationError(format!(
                    "Slot {} does not belong to doctor {}", slot_id, draft.doctor_id
                )));
            }

            let (booking_date, booking_time) = (slot.date, slot.time);
            let appointment = Appointment {
                id: tables.next_appointment_id(),
                slot_id: Some(slot_id),
                doctor_id: draft.doctor_id,
                appointment_type_id: draft.appointment_type_id,
                consultation_mode: draft.consultation_mode,
                booking_date,
                booking_time,
                reason: draft.reason,
                physical_location: None,
                online_link: None,
                payment_status: PaymentStatus::Pending,
                appointment_status: AppointmentStatus::Pending,
                order_id: None,
                created_at: now,
            };

            if let Some(slot) = tables.slots.get_mut(&slot_id) {
                slot.booked = true;
                slot.reserved_until = Some(lease_until);
            }

            Ok(tables.insert_appointment(appointment))
        }).await
    }

    async fn get_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.transaction(|tables| tables.appointments.get(&appointment_id).cloned()).await)
    }

    async fn list_appointments(
        &self,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.transaction(|tables| {
            tables.appointments.values()
                .filter(|appointment| {
                    payment_status.map_or(true, |status| appointment.payment_status == status)
                })
                .cloned()
                .collect()
        }).await)
    }

    async fn confirm_appointment(
        &self,
        appointment_id: AppointmentId,
        placement: Placement,
    ) -> Result<Appointment, AppointmentError> {
        self.transaction(|tables| {
            let appointment = tables.appointments.get_mut(&appointment_id)
                .ok_or_else(|| AppointmentError::appointment_not_found(appointment_id))?;

            check_confirmable(appointment)?;

            match placement {
                Placement::PhysicalLocation(location) => appointment.physical_location = Some(location),
                Placement::OnlineLink(link) => appointment.online_link = Some(link),
            }
            appointment.appointment_status = AppointmentStatus::Confirmed;
            Ok(appointment.clone())
        }).await
    }

    async fn release_expired_reservations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReleasedReservation>, AppointmentError> {
        Ok(self.transaction(|tables| {
            let expired: Vec<SlotId> = tables.slots.values()
                .filter(|slot| slot.lease_expired(now))
                .map(|slot| slot.id)
                .collect();

            let mut released = Vec::with_capacity(expired.len());
            for slot_id in expired {
                let holder = tables.appointment_for_slot(slot_id)
                    .map(|appointment| (appointment.id, appointment.payment_status));

                if let Some((appointment_id, PaymentStatus::Success)) = holder {
                    // Paid but the lease was never cleared; keep the booking.
                    warn!("Slot {} held by paid appointment {} had a live lease", slot_id, appointment_id);
                    if let Some(slot) = tables.slots.get_mut(&slot_id) {
                        slot.reserved_until = None;
                    }
                    continue;
                }

                if let Some(slot) = tables.slots.get_mut(&slot_id) {
                    slot.booked = false;
                    slot.reserved_until = None;
                }
                let appointment_id = holder.map(|(id, _)| id);
                if let Some(appointment) = appointment_id.and_then(|id| tables.appointments.get_mut(&id)) {
                    appointment.slot_id = None;
                }

                released.push(ReleasedReservation { slot_id, appointment_id });
            }
            released
        }).await)
    }
}
