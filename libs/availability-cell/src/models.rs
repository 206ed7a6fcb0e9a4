use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable half-hour window for a doctor. Uniqueness per
/// (doctor_id, start_time) is enforced by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Admin request to generate slots over a working window.
/// Times are wall-clock `HH:MM` on `date` (`YYYY-MM-DD`), interpreted as UTC.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSlotsRequest {
    pub doctor_id: Uuid,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Serialize)]
pub struct SlotsCreatedResponse {
    pub message: String,
    pub slots_created: usize,
    pub slots: Vec<AvailabilitySlot>,
}

#[derive(Debug, Deserialize)]
pub struct SlotListQuery {
    pub date: Option<String>,
    pub available_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleAvailabilityRequest {
    pub is_available: bool,
}
