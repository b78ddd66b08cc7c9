use std::sync::Arc;

use tracing::{info, instrument, warn};

use shared_models::{Appointment, AppointmentId, ConsultationMode, PaymentStatus};

use crate::models::{AppointmentError, AppointmentView, ConfirmAppointmentRequest, Placement};
use crate::services::directory::Directory;
use crate::services::views::describe_appointments;
use crate::store::{check_confirmable, AppointmentStore};

pub struct AdminConfirmationService {
    directory: Arc<dyn Directory>,
    appointments: Arc<dyn AppointmentStore>,
}

impl AdminConfirmationService {
    pub fn new(directory: Arc<dyn Directory>, appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { directory, appointments }
    }

    /// Finalizes a paid appointment by assigning its room or meeting link.
    /// Falls back to the appointment type's default location/link when the
    /// admin supplies none.
    #[instrument(skip(self, request))]
    pub async fn confirm(
        &self,
        appointment_id: AppointmentId,
        request: ConfirmAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.appointments.get_appointment(appointment_id).await?
            .ok_or_else(|| AppointmentError::appointment_not_found(appointment_id))?;

        if let Err(e) = check_confirmable(&appointment) {
            warn!("Refusing to confirm appointment {}: {}", appointment_id, e);
            return Err(e);
        }

        let placement = self.resolve_placement(&appointment, request).await?;
        let confirmed = self.appointments.confirm_appointment(appointment_id, placement).await?;

        info!("Appointment {} confirmed at {:?}", appointment_id, confirmed.location_or_link());
        Ok(confirmed)
    }

    /// Paid appointments, the admin confirmation queue.
    pub async fn paid_appointments(&self) -> Result<Vec<AppointmentView>, AppointmentError> {
        let paid = self.appointments.list_appointments(Some(PaymentStatus::Success)).await?;
        describe_appointments(self.directory.as_ref(), paid).await
    }

    async fn resolve_placement(
        &self,
        appointment: &Appointment,
        request: ConfirmAppointmentRequest,
    ) -> Result<Placement, AppointmentError> {
        let supplied = match appointment.consultation_mode {
            ConsultationMode::Physical => non_blank(request.physical_location),
            ConsultationMode::Online => non_blank(request.zoom_link),
        };

        let value = match supplied {
            Some(value) => Some(value),
            None => {
                let appointment_type = self.directory
                    .find_appointment_type(appointment.appointment_type_id)
                    .await?;
                appointment_type.and_then(|t| match appointment.consultation_mode {
                    ConsultationMode::Physical => non_blank(t.physical_location),
                    ConsultationMode::Online => non_blank(t.online_link),
                })
            }
        };

        match (appointment.consultation_mode, value) {
            (ConsultationMode::Physical, Some(location)) => Ok(Placement::PhysicalLocation(location)),
            (ConsultationMode::Online, Some(link)) => Ok(Placement::OnlineLink(link)),
            (ConsultationMode::Physical, None) => Err(AppointmentError::ValidationError(
                "physicalLocation is required for physical appointments".to_string(),
            )),
            (ConsultationMode::Online, None) => Err(AppointmentError::ValidationError(
                "zoomLink is required for online appointments".to_string(),
            )),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
