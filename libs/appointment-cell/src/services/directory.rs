//! Lookups of doctors and appointment types owned by other parts of the
//! hospital system. Appointment types can also be registered here.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info};

use shared_database::SupabaseClient;
use shared_models::{AppointmentType, AppointmentTypeId, Doctor, DoctorId};

use crate::models::{AppointmentError, CreateAppointmentTypeRequest};

#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_doctor(&self, doctor_id: DoctorId) -> Result<Option<Doctor>, AppointmentError>;

    async fn find_appointment_type(
        &self,
        type_id: AppointmentTypeId,
    ) -> Result<Option<AppointmentType>, AppointmentError>;

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, AppointmentError>;

    async fn create_appointment_type(
        &self,
        request: CreateAppointmentTypeRequest,
    ) -> Result<AppointmentType, AppointmentError>;

    /// Lists appointment types, first registering "Physical" and "Online"
    /// when none exist yet.
    async fn appointment_types_or_defaults(&self) -> Result<Vec<AppointmentType>, AppointmentError> {
        let types = self.list_appointment_types().await?;
        if !types.is_empty() {
            return Ok(types);
        }

        info!("No appointment types registered; seeding Physical and Online");
        for type_name in DEFAULT_TYPE_NAMES {
            self.create_appointment_type(CreateAppointmentTypeRequest::named(type_name)).await?;
        }
        self.list_appointment_types().await
    }
}

pub const DEFAULT_TYPE_NAMES: [&str; 2] = ["Physical", "Online"];

/// Rejects a type without a name before it reaches the directory.
pub fn validate_new_type(request: &CreateAppointmentTypeRequest) -> Result<(), AppointmentError> {
    if request.type_name.trim().is_empty() {
        return Err(AppointmentError::ValidationError("typeName is required".to_string()));
    }
    Ok(())
}

// ==============================================================================
// SUPABASE
// ==============================================================================

pub struct SupabaseDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn first<T>(&self, table: &str, query: &str) -> Result<Option<T>, AppointmentError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let rows: Vec<T> = self.supabase.select(table, query).await.map_err(|e| {
            error!("Directory lookup on {} failed: {}", table, e);
            AppointmentError::ExternalServiceError(e.to_string())
        })?;

        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl Directory for SupabaseDirectory {
    async fn find_doctor(&self, doctor_id: DoctorId) -> Result<Option<Doctor>, AppointmentError> {
        debug!("Fetching doctor {}", doctor_id);
        self.first(
            "doctors",
            &format!("id=eq.{}&select=id,name,specialty,consultation_fee", doctor_id),
        ).await
    }

    async fn find_appointment_type(
        &self,
        type_id: AppointmentTypeId,
    ) -> Result<Option<AppointmentType>, AppointmentError> {
        debug!("Fetching appointment type {}", type_id);
        self.first("appointment_types", &format!("id=eq.{}", type_id)).await
    }

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, AppointmentError> {
        self.supabase.select("appointment_types", "order=id.asc").await.map_err(|e| {
            error!("Listing appointment types failed: {}", e);
            AppointmentError::ExternalServiceError(e.to_string())
        })
    }

    async fn create_appointment_type(
        &self,
        request: CreateAppointmentTypeRequest,
    ) -> Result<AppointmentType, AppointmentError> {
        validate_new_type(&request)?;

        let body = json!({
            "type_name": request.type_name.trim(),
            "physical_location": request.physical_location,
            "online_link": request.online_link,
        });

        let rows: Vec<AppointmentType> = self.supabase.insert("appointment_types", body).await.map_err(|e| {
            error!("Creating appointment type failed: {}", e);
            AppointmentError::ExternalServiceError(e.to_string())
        })?;

        let created = rows.into_iter().next().ok_or_else(|| {
            AppointmentError::ExternalServiceError("Appointment type insert returned no row".to_string())
        })?;
        info!("Registered appointment type {} ({})", created.id, created.type_name);
        Ok(created)
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    doctors: RwLock<HashMap<DoctorId, Doctor>>,
    appointment_types: RwLock<BTreeMap<AppointmentTypeId, AppointmentType>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory seeded with the two standard consultation types.
    pub fn with_default_types() -> Self {
        let directory = Self::new();
        for (id, type_name) in (1..).zip(DEFAULT_TYPE_NAMES) {
            directory.add_appointment_type(AppointmentType {
                id,
                type_name: type_name.to_string(),
                physical_location: None,
                online_link: None,
            });
        }
        directory
    }

    pub fn add_doctor(&self, doctor: Doctor) {
        let mut doctors = self.doctors.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        doctors.insert(doctor.id, doctor);
    }

    pub fn add_appointment_type(&self, appointment_type: AppointmentType) {
        let mut types = self.appointment_types.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        types.insert(appointment_type.id, appointment_type);
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_doctor(&self, doctor_id: DoctorId) -> Result<Option<Doctor>, AppointmentError> {
        let doctors = self.doctors.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(doctors.get(&doctor_id).cloned())
    }

    async fn find_appointment_type(
        &self,
        type_id: AppointmentTypeId,
    ) -> Result<Option<AppointmentType>, AppointmentError> {
        let types = self.appointment_types.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(types.get(&type_id).cloned())
    }

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, AppointmentError> {
        let types = self.appointment_types.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(types.values().cloned().collect())
    }

    async fn create_appointment_type(
        &self,
        request: CreateAppointmentTypeRequest,
    ) -> Result<AppointmentType, AppointmentError> {
        validate_new_type(&request)?;

        let mut types = self.appointment_types.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = types.keys().next_back().map_or(1, |last| last + 1);
        let created = AppointmentType {
            id,
            type_name: request.type_name.trim().to_string(),
            physical_location: request.physical_location,
            online_link: request.online_link,
        };
        types.insert(id, created.clone());
        Ok(created)
    }
}
