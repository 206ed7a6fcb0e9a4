use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use availability_cell::models::AvailabilitySlot;
use doctor_cell::models::Doctor;

/// Closed status set: an appointment is either live or cancelled, nothing
/// else. Unknown strings from the store fail deserialization loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An appointment row with its embedded slot and doctor. The patient
/// contact fields are a snapshot taken at booking time; the owning account
/// (`user_id`) is absent for manual bookings made by the clinic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_phone: String,
    pub patient_email: String,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        rename(deserialize = "availability_slots", serialize = "slot"),
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub slot: Option<AvailabilitySlot>,
    #[serde(
        rename(deserialize = "doctors", serialize = "doctor"),
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub doctor: Option<Doctor>,
}

impl Appointment {
    pub fn patient_full_name(&self) -> String {
        format!("{} {}", self.patient_first_name, self.patient_last_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub slot_id: Uuid,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_phone: String,
    pub patient_email: String,
}

/// Clinic-side booking: no owning account, optionally linked to an
/// existing patient record.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualCreateAppointmentRequest {
    pub slot_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_phone: String,
    pub patient_email: String,
}

/// Partial update of the contact snapshot only.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_first_name: Option<String>,
    pub patient_last_name: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn is_empty(&self) -> bool {
        self.patient_first_name.is_none()
            && self.patient_last_name.is_none()
            && self.patient_phone.is_none()
            && self.patient_email.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub doctor_id: Option<Uuid>,
    pub date: Option<String>,
    pub date_end: Option<String>,
    pub status: Option<String>,
}
