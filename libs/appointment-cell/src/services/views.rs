use std::collections::HashMap;

use tracing::debug;

use shared_models::{Appointment, AppointmentType, AppointmentTypeId, Doctor, DoctorId};

use crate::models::{AppointmentError, AppointmentView};
use crate::services::directory::Directory;

/// Resolves doctor and appointment type details for a listing. Each doctor
/// and type is looked up once per call.
pub async fn describe_appointments(
    directory: &dyn Directory,
    appointments: Vec<Appointment>,
) -> Result<Vec<AppointmentView>, AppointmentError> {
    let mut doctors: HashMap<DoctorId, Option<Doctor>> = HashMap::new();
    let mut types: HashMap<AppointmentTypeId, Option<AppointmentType>> = HashMap::new();

    let mut views = Vec::with_capacity(appointments.len());
    for appointment in appointments {
        if !doctors.contains_key(&appointment.doctor_id) {
            let doctor = directory.find_doctor(appointment.doctor_id).await?;
            if doctor.is_none() {
                debug!("Doctor {} missing from directory", appointment.doctor_id);
            }
            doctors.insert(appointment.doctor_id, doctor);
        }
        if !types.contains_key(&appointment.appointment_type_id) {
            let appointment_type = directory.find_appointment_type(appointment.appointment_type_id).await?;
            types.insert(appointment.appointment_type_id, appointment_type);
        }

        let doctor = doctors.get(&appointment.doctor_id).and_then(Option::as_ref);
        let appointment_type = types.get(&appointment.appointment_type_id).and_then(Option::as_ref);
        views.push(AppointmentView::new(appointment, doctor, appointment_type));
    }

    Ok(views)
}
