use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::Doctor;
use notification_cell::services::email::{AppointmentEmailDetails, EmailService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{
    AdminListQuery, Appointment, AppointmentStatus, CreateAppointmentRequest,
    ManualCreateAppointmentRequest, UpdateAppointmentRequest,
};

const APPOINTMENT_SELECT: &str = "select=*,availability_slots(*),doctors(*)";

/// A slot row joined with its doctor, as fetched before booking.
#[derive(Debug, Deserialize)]
struct SlotWithDoctor {
    id: Uuid,
    doctor_id: Uuid,
    start_time: DateTime<Utc>,
    is_available: bool,
    #[serde(rename = "doctors")]
    doctor: Option<Doctor>,
}

struct ContactSnapshot {
    first_name: String,
    last_name: String,
    phone: String,
    email: String,
}

pub struct BookingService {
    supabase: SupabaseClient,
    email: EmailService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service_role(config),
            email: EmailService::new(config),
        }
    }

    /// Books a slot for the authenticated patient.
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        owner_id: Uuid,
    ) -> Result<Appointment, AppError> {
        self.book_slot(
            request.slot_id,
            Some(owner_id),
            None,
            ContactSnapshot {
                first_name: request.patient_first_name,
                last_name: request.patient_last_name,
                phone: request.patient_phone,
                email: request.patient_email,
            },
        )
        .await
    }

    /// Clinic-side booking with no owning account.
    pub async fn create_manual(
        &self,
        request: ManualCreateAppointmentRequest,
    ) -> Result<Appointment, AppError> {
        self.book_slot(
            request.slot_id,
            None,
            request.patient_id,
            ContactSnapshot {
                first_name: request.patient_first_name,
                last_name: request.patient_last_name,
                phone: request.patient_phone,
                email: request.patient_email,
            },
        )
        .await
    }

    async fn book_slot(
        &self,
        slot_id: Uuid,
        user_id: Option<Uuid>,
        patient_id: Option<Uuid>,
        contact: ContactSnapshot,
    ) -> Result<Appointment, AppError> {
        let slot = self.fetch_slot(slot_id).await?;

        if !slot.is_available {
            return Err(AppError::Conflict(
                "Slot is no longer available".to_string(),
            ));
        }
        if slot.start_time <= Utc::now() {
            return Err(AppError::BadRequest(
                "Cannot book a slot in the past".to_string(),
            ));
        }

        // Claim the slot first: the filter on is_available makes the flip a
        // compare-and-swap, so exactly one concurrent booking wins.
        let claimed = self
            .supabase
            .write_returning(
                Method::PATCH,
                &format!(
                    "/rest/v1/availability_slots?id=eq.{}&is_available=eq.true",
                    slot_id
                ),
                None,
                json!({ "is_available": false }),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if claimed.is_empty() {
            return Err(AppError::Conflict(
                "Slot is no longer available".to_string(),
            ));
        }

        let inserted = self
            .supabase
            .write_returning(
                Method::POST,
                &format!("/rest/v1/appointments?{}", APPOINTMENT_SELECT),
                None,
                json!({
                    "doctor_id": slot.doctor_id,
                    "slot_id": slot.id,
                    "user_id": user_id,
                    "patient_id": patient_id,
                    "patient_first_name": contact.first_name,
                    "patient_last_name": contact.last_name,
                    "patient_phone": contact.phone,
                    "patient_email": contact.email,
                    "status": AppointmentStatus::Confirmed.as_str(),
                }),
            )
            .await;

        let inserted = match inserted {
            Ok(rows) => rows,
            Err(e) => {
                self.release_slot(slot_id).await;
                return Err(AppError::from_store_detail(e.to_string()));
            }
        };

        let row = match inserted.into_iter().next() {
            Some(row) => row,
            None => {
                self.release_slot(slot_id).await;
                return Err(AppError::Database(
                    "Appointment insert returned no row".to_string(),
                ));
            }
        };
        let appointment: Appointment = serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse appointment: {}", e)))?;

        info!(
            "Booked appointment {} on slot {} for doctor {}",
            appointment.id, slot_id, slot.doctor_id
        );

        self.send_confirmation(&appointment, &slot).await;

        Ok(appointment)
    }

    /// Cancels an appointment and frees its slot. Patients may only cancel
    /// their own future appointments; admins may cancel anything.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        requester_id: Uuid,
        is_admin: bool,
    ) -> Result<Appointment, AppError> {
        let appointment = self.fetch_appointment(appointment_id).await?;

        if !is_admin && appointment.user_id != Some(requester_id) {
            return Err(AppError::Forbidden(
                "You can only cancel your own appointments".to_string(),
            ));
        }
        if !is_admin {
            if let Some(slot) = &appointment.slot {
                if slot.start_time <= Utc::now() {
                    return Err(AppError::BadRequest(
                        "Cannot cancel past appointments".to_string(),
                    ));
                }
            }
        }
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(AppError::BadRequest(
                "Appointment is already cancelled".to_string(),
            ));
        }

        let updated = self
            .supabase
            .write_returning(
                Method::PATCH,
                &format!(
                    "/rest/v1/appointments?id=eq.{}&{}",
                    appointment_id, APPOINTMENT_SELECT
                ),
                None,
                json!({ "status": AppointmentStatus::Cancelled.as_str() }),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Appointment update returned no row".to_string()))?;
        let cancelled: Appointment = serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse appointment: {}", e)))?;

        // Put the slot back on the market, if it still exists.
        if let Some(slot_id) = appointment.slot_id {
            let freed = self
                .supabase
                .write_returning(
                    Method::PATCH,
                    &format!("/rest/v1/availability_slots?id=eq.{}", slot_id),
                    None,
                    json!({ "is_available": true }),
                )
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            if freed.is_empty() {
                debug!("Slot {} gone, nothing to free", slot_id);
            }
        }

        info!("Cancelled appointment {}", appointment_id);

        let by_clinic = appointment.user_id != Some(requester_id);
        self.send_cancellation(&cancelled, by_clinic).await;

        Ok(cancelled)
    }

    /// Updates the patient contact snapshot. Ownership is enforced the same
    /// way as cancellation; status and timing are not restricted.
    pub async fn update(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        requester_id: Uuid,
        is_admin: bool,
    ) -> Result<Appointment, AppError> {
        if request.is_empty() {
            return Err(AppError::ValidationError("Nothing to update".to_string()));
        }

        let appointment = self.fetch_appointment(appointment_id).await?;
        if !is_admin && appointment.user_id != Some(requester_id) {
            return Err(AppError::Forbidden(
                "You can only update your own appointments".to_string(),
            ));
        }

        let mut update_data = serde_json::Map::new();
        if let Some(first_name) = request.patient_first_name {
            update_data.insert("patient_first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.patient_last_name {
            update_data.insert("patient_last_name".to_string(), json!(last_name));
        }
        if let Some(phone) = request.patient_phone {
            update_data.insert("patient_phone".to_string(), json!(phone));
        }
        if let Some(email) = request.patient_email {
            update_data.insert("patient_email".to_string(), json!(email));
        }

        let updated = self
            .supabase
            .write_returning(
                Method::PATCH,
                &format!(
                    "/rest/v1/appointments?id=eq.{}&{}",
                    appointment_id, APPOINTMENT_SELECT
                ),
                None,
                Value::Object(update_data),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Appointment update returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse appointment: {}", e)))
    }

    pub async fn get_my_appointments(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppError> {
        let path = format!(
            "/rest/v1/appointments?user_id=eq.{}&{}&order=created_at.desc",
            user_id, APPOINTMENT_SELECT
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        parse_appointments(rows)
    }

    /// Admin listing with optional doctor/status filters and a date range on
    /// the slot's start. The range is applied client-side because the start
    /// lives on the embedded slot, then results are re-sorted by slot start
    /// with slotless appointments first.
    pub async fn get_all(&self, query: AdminListQuery) -> Result<Vec<Appointment>, AppError> {
        let mut path = format!("/rest/v1/appointments?{}", APPOINTMENT_SELECT);
        if let Some(doctor_id) = query.doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }
        if let Some(status) = &query.status {
            path.push_str(&format!("&status=eq.{}", status));
        }

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let mut appointments = parse_appointments(rows)?;

        if let Some(date) = &query.date {
            let from = parse_date(date)?;
            let to = match &query.date_end {
                Some(date_end) => parse_date(date_end)?,
                None => from,
            };
            appointments.retain(|appointment| {
                appointment
                    .slot
                    .as_ref()
                    .map(|slot| {
                        let day = slot.start_time.date_naive();
                        day >= from && day <= to
                    })
                    .unwrap_or(false)
            });
        }

        // None sorts before Some, so slotless appointments lead.
        appointments.sort_by_key(|appointment| {
            appointment.slot.as_ref().map(|slot| slot.start_time)
        });

        Ok(appointments)
    }

    pub async fn get_by_id(
        &self,
        appointment_id: Uuid,
        requester_id: Uuid,
        is_admin: bool,
    ) -> Result<Appointment, AppError> {
        let appointment = self.fetch_appointment(appointment_id).await?;
        if !is_admin && appointment.user_id != Some(requester_id) {
            return Err(AppError::Forbidden(
                "You can only view your own appointments".to_string(),
            ));
        }
        Ok(appointment)
    }

    async fn fetch_slot(&self, slot_id: Uuid) -> Result<SlotWithDoctor, AppError> {
        let path = format!(
            "/rest/v1/availability_slots?id=eq.{}&select=*,doctors(*)",
            slot_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Slot not found".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse slot: {}", e)))
    }

    async fn fetch_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&{}",
            appointment_id, APPOINTMENT_SELECT
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse appointment: {}", e)))
    }

    // Rollback of the availability flip after a failed insert. Best effort:
    // a failure here leaves the slot blocked until an admin toggles it back.
    async fn release_slot(&self, slot_id: Uuid) {
        let result = self
            .supabase
            .write_returning(
                Method::PATCH,
                &format!("/rest/v1/availability_slots?id=eq.{}", slot_id),
                None,
                json!({ "is_available": true }),
            )
            .await;
        if let Err(e) = result {
            warn!("Failed to release slot {} after insert failure: {}", slot_id, e);
        }
    }

    async fn send_confirmation(&self, appointment: &Appointment, slot: &SlotWithDoctor) {
        let patient_name = appointment.patient_full_name();
        let (doctor_name, specialization) = match &slot.doctor {
            Some(doctor) => (doctor.full_name(), doctor.specialization.clone()),
            None => (String::new(), String::new()),
        };
        let date = slot.start_time.format("%d/%m/%Y").to_string();
        let time = slot.start_time.format("%H:%M").to_string();

        self.email
            .send_booking_confirmation(
                &appointment.patient_email,
                &AppointmentEmailDetails {
                    patient_name: &patient_name,
                    doctor_name: &doctor_name,
                    specialization: &specialization,
                    date: &date,
                    time: &time,
                },
            )
            .await;
    }

    async fn send_cancellation(&self, appointment: &Appointment, by_clinic: bool) {
        let patient_name = appointment.patient_full_name();
        let (doctor_name, specialization) = match &appointment.doctor {
            Some(doctor) => (doctor.full_name(), doctor.specialization.clone()),
            None => (String::new(), String::new()),
        };
        let (date, time) = match &appointment.slot {
            Some(slot) => (
                slot.start_time.format("%d/%m/%Y").to_string(),
                slot.start_time.format("%H:%M").to_string(),
            ),
            None => (String::new(), String::new()),
        };

        let details = AppointmentEmailDetails {
            patient_name: &patient_name,
            doctor_name: &doctor_name,
            specialization: &specialization,
            date: &date,
            time: &time,
        };

        if by_clinic {
            self.email
                .send_cancellation_by_clinic(&appointment.patient_email, &details)
                .await;
        } else {
            self.email
                .send_cancellation_by_patient(&appointment.patient_email, &details)
                .await;
        }
    }
}

fn parse_appointments(rows: Vec<Value>) -> Result<Vec<Appointment>, AppError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| AppError::Database(format!("Failed to parse appointments: {}", e)))
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError("Invalid date, expected YYYY-MM-DD".to_string()))
}
