// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, instrument, warn};

use shared_models::{Appointment, AppointmentId, NewAppointment, PaymentStatus};
use shared_utils::Clock;

use crate::models::{AppointmentError, AppointmentView, BookAppointmentRequest};
use crate::services::directory::Directory;
use crate::services::views::describe_appointments;
use crate::store::{AppointmentStore, SlotStore};

pub struct BookingService {
    directory: Arc<dyn Directory>,
    slots: Arc<dyn SlotStore>,
    appointments: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    reservation_ttl: Duration,
}

impl BookingService {
    pub fn new(
        directory: Arc<dyn Directory>,
        slots: Arc<dyn SlotStore>,
        appointments: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
        reservation_ttl: Duration,
    ) -> Self {
        Self {
            directory,
            slots,
            appointments,
            clock,
            reservation_ttl,
        }
    }

    /// Reserves the doctor's slot at the requested date/time and creates a
    /// PENDING appointment for it. The slot stays reserved until the lease
    /// runs out or the payment succeeds.
    #[instrument(skip(self, request), fields(doctor_id = request.doctor_id, date = %request.booking_date))]
    pub async fn book(&self, request: BookAppointmentRequest) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment with doctor {} at {} {}",
              request.doctor_id, request.booking_date, request.booking_time);

        // **Step 1: Collaborator validation**
        let doctor = self.directory.find_doctor(request.doctor_id).await?
            .ok_or_else(|| AppointmentError::doctor_not_found(request.doctor_id))?;

        let appointment_type = self.directory.find_appointment_type(request.appointment_type_id).await?
            .ok_or_else(|| AppointmentError::appointment_type_not_found(request.appointment_type_id))?;

        // **Step 2: Return lapsed reservations to the pool before searching**
        let now = self.clock.now();
        let released = self.appointments.release_expired_reservations(now).await?;
        if !released.is_empty() {
            info!("Released {} expired reservations before booking", released.len());
        }

        // **Step 3: Find the slot**
        let candidates: Vec<_> = self.slots.slots_for_day(doctor.id, request.booking_date).await?
            .into_iter()
            .filter(|slot| slot.time == request.booking_time)
            .collect();

        let slot = match candidates.iter().find(|slot| !slot.booked) {
            Some(slot) => slot.clone(),
            None => {
                debug!("No unbooked slot for doctor {} at {} {}",
                       doctor.id, request.booking_date, request.booking_time);
                return Err(match candidates.first() {
                    Some(taken) => AppointmentError::SlotAlreadyBooked(taken.id),
                    None => AppointmentError::SlotUnavailable,
                });
            }
        };

        // **Step 4: Reserve + create in one transaction**
        let draft = NewAppointment {
            doctor_id: doctor.id,
            appointment_type_id: appointment_type.id,
            consultation_mode: appointment_type.mode(),
            reason: request.reason.filter(|reason| !reason.trim().is_empty()),
        };

        let appointment = self.appointments
            .reserve_slot(slot.id, draft, now, now + self.reservation_ttl)
            .await
            .map_err(|e| {
                if let AppointmentError::SlotAlreadyBooked(slot_id) = &e {
                    warn!("Lost booking race for slot {}", slot_id);
                }
                e
            })?;

        info!("Appointment {} booked on slot {} for doctor {}", appointment.id, slot.id, doctor.id);
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: AppointmentId) -> Result<Appointment, AppointmentError> {
        self.appointments.get_appointment(appointment_id).await?
            .ok_or_else(|| AppointmentError::appointment_not_found(appointment_id))
    }

    /// Appointments whose payment went through, as shown to patients.
    pub async fn successful_appointments(&self) -> Result<Vec<AppointmentView>, AppointmentError> {
        let paid = self.appointments.list_appointments(Some(PaymentStatus::Success)).await?;
        describe_appointments(self.directory.as_ref(), paid).await
    }

    pub async fn all_appointments(&self) -> Result<Vec<AppointmentView>, AppointmentError> {
        let all = self.appointments.list_appointments(None).await?;
        describe_appointments(self.directory.as_ref(), all).await
    }
}
