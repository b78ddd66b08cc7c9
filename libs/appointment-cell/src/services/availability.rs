use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use shared_models::{DoctorId, Slot, SlotId};

use crate::models::{AppointmentError, SaveAvailabilityRequest, UpdateSlotRequest};
use crate::services::directory::Directory;
use crate::store::SlotStore;

/// Staff-facing management of doctor availability slots.
pub struct AvailabilityService {
    directory: Arc<dyn Directory>,
    slots: Arc<dyn SlotStore>,
}

impl AvailabilityService {
    pub fn new(directory: Arc<dyn Directory>, slots: Arc<dyn SlotStore>) -> Self {
        Self { directory, slots }
    }

    pub async fn add_availability(
        &self,
        request: SaveAvailabilityRequest,
    ) -> Result<Vec<Slot>, AppointmentError> {
        if request.times.is_empty() {
            return Err(AppointmentError::ValidationError("At least one time is required".to_string()));
        }

        self.directory.find_doctor(request.doctor_id).await?
            .ok_or_else(|| AppointmentError::doctor_not_found(request.doctor_id))?;

        let times: Vec<_> = request.times.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let created = self.slots.add_slots(request.doctor_id, request.date, &times).await?;

        info!("Added {} slots for doctor {} on {}", created.len(), request.doctor_id, request.date);
        Ok(created)
    }

    pub async fn available_slots(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, AppointmentError> {
        debug!("Listing unbooked slots for doctor {} on {}", doctor_id, date);
        self.slots.unbooked_slots(doctor_id, date).await
    }

    pub async fn update_slot(
        &self,
        slot_id: SlotId,
        request: UpdateSlotRequest,
    ) -> Result<Slot, AppointmentError> {
        let slot = self.slots.update_slot(slot_id, request.available_date, request.available_time).await?;
        info!("Slot {} moved to {} {}", slot_id, slot.date, slot.time);
        Ok(slot)
    }

    pub async fn delete_slot(&self, slot_id: SlotId) -> Result<(), AppointmentError> {
        self.slots.delete_slot(slot_id).await?;
        info!("Slot {} deleted", slot_id);
        Ok(())
    }
}
