//! Appointment booking and staff management.

use chrono::Utc;
use queueless_db::EntryStore;
use queueless_types::{
    Appointment, AppointmentId, AppointmentPatch, AppointmentStatus, NewAppointmentRequest,
};
use tracing::info;
use validator::Validate;

use crate::error::{APPOINTMENT_NOT_FOUND, QueueError};

/// CRUD over appointments, with sanitization and validation on writes.
#[derive(Debug, Clone)]
pub struct AppointmentService {
    store: EntryStore,
}

impl AppointmentService {
    /// Create a service over `store`.
    pub const fn new(store: EntryStore) -> Self {
        Self { store }
    }

    /// Book a new appointment.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Validation`] for missing or malformed fields
    /// and [`QueueError::Store`] if the store fails.
    pub async fn book(&self, request: NewAppointmentRequest) -> Result<Appointment, QueueError> {
        let request = request.sanitized();
        request.validate()?;

        let now = Utc::now();
        let appointment = Appointment {
            id: AppointmentId::new(),
            student_name: request.student_name,
            service_type: request.service_type,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
            notes: request.notes.unwrap_or_default(),
            status: request.status.unwrap_or(AppointmentStatus::Booked),
            created_at: now,
            updated_at: now,
        };
        self.store.create_appointment(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            service_type = %appointment.service_type,
            date = %appointment.appointment_date,
            time = %appointment.appointment_time,
            "Appointment booked"
        );
        Ok(appointment)
    }

    /// Every appointment, earliest first.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Store`] if the store fails.
    pub async fn list(&self) -> Result<Vec<Appointment>, QueueError> {
        Ok(self.store.list_appointments().await?)
    }

    /// One appointment by id.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] for an unknown id.
    pub async fn get(&self, id: AppointmentId) -> Result<Appointment, QueueError> {
        self.store
            .find_appointment(id)
            .await?
            .ok_or(QueueError::NotFound(APPOINTMENT_NOT_FOUND))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Validation`] for an empty or malformed patch
    /// and [`QueueError::NotFound`] for an unknown id.
    pub async fn update(
        &self,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> Result<Appointment, QueueError> {
        let patch = patch.sanitized();
        if patch.is_empty() {
            return Err(QueueError::Validation(String::from(
                "at least one field must be provided",
            )));
        }
        patch.validate()?;

        let updated = self
            .store
            .update_appointment(id, &patch, Utc::now())
            .await?
            .ok_or(QueueError::NotFound(APPOINTMENT_NOT_FOUND))?;
        info!(
            appointment_id = %id,
            status = %updated.status,
            "Appointment updated"
        );
        Ok(updated)
    }

    /// Cancel by deleting the record.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] for an unknown id.
    pub async fn remove(&self, id: AppointmentId) -> Result<(), QueueError> {
        if self.store.delete_appointment(id).await? {
            info!(appointment_id = %id, "Appointment deleted");
            Ok(())
        } else {
            Err(QueueError::NotFound(APPOINTMENT_NOT_FOUND))
        }
    }
}
