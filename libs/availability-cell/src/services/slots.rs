use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{AvailabilitySlot, CreateSlotsRequest, SlotsCreatedResponse};

pub const SLOT_DURATION_MINUTES: i64 = 30;

/// Walks the working window in fixed 30-minute steps and returns the
/// (start, end) pairs to insert. A candidate is kept only when it fits
/// entirely before `window_end` and its start is not already taken; the
/// cursor advances unconditionally, so trailing partial minutes are dropped.
pub fn slot_walk(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    existing_starts: &HashSet<DateTime<Utc>>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let step = Duration::minutes(SLOT_DURATION_MINUTES);
    let mut candidates = Vec::new();
    let mut cursor = window_start;

    while cursor + step <= window_end {
        if !existing_starts.contains(&cursor) {
            candidates.push((cursor, cursor + step));
        }
        cursor += step;
    }

    candidates
}

pub struct SlotService {
    supabase: SupabaseClient,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service_role(config),
        }
    }

    /// Generates the missing 30-minute slots for a doctor's working window.
    /// The date must be in the future; a range where every slot already
    /// exists is reported as an error rather than an empty success.
    pub async fn generate_slots(
        &self,
        request: CreateSlotsRequest,
    ) -> Result<SlotsCreatedResponse, AppError> {
        let date = NaiveDate::parse_from_str(&request.date, "%Y-%m-%d").map_err(|_| {
            AppError::ValidationError("Invalid date, expected YYYY-MM-DD".to_string())
        })?;
        if date <= Utc::now().date_naive() {
            return Err(AppError::ValidationError(
                "Slots can only be generated for future dates".to_string(),
            ));
        }

        let start = NaiveTime::parse_from_str(&request.start_time, "%H:%M").map_err(|_| {
            AppError::ValidationError("Invalid start time, expected HH:MM".to_string())
        })?;
        let end = NaiveTime::parse_from_str(&request.end_time, "%H:%M").map_err(|_| {
            AppError::ValidationError("Invalid end time, expected HH:MM".to_string())
        })?;
        if end <= start {
            return Err(AppError::ValidationError(
                "End time must be after start time".to_string(),
            ));
        }

        let window_start = date.and_time(start).and_utc();
        let window_end = date.and_time(end).and_utc();

        let existing = self
            .existing_starts_for_day(request.doctor_id, date)
            .await?;

        let candidates = slot_walk(window_start, window_end, &existing);
        if candidates.is_empty() {
            return Err(AppError::BadRequest(
                "No slots to create: all slots in this range already exist".to_string(),
            ));
        }

        let rows: Vec<Value> = candidates
            .iter()
            .map(|(slot_start, slot_end)| {
                json!({
                    "doctor_id": request.doctor_id,
                    "start_time": slot_start.to_rfc3339(),
                    "end_time": slot_end.to_rfc3339(),
                    "is_available": true,
                })
            })
            .collect();

        debug!(
            "Inserting {} slots for doctor {} on {}",
            rows.len(),
            request.doctor_id,
            request.date
        );

        let inserted = self
            .supabase
            .write_returning(
                Method::POST,
                "/rest/v1/availability_slots",
                None,
                Value::Array(rows),
            )
            .await
            .map_err(|e| AppError::from_store_detail(e.to_string()))?;

        let slots = parse_slots(inserted)?;
        info!(
            "Created {} slots for doctor {} on {}",
            slots.len(),
            request.doctor_id,
            request.date
        );

        Ok(SlotsCreatedResponse {
            message: format!("Created {} slots", slots.len()),
            slots_created: slots.len(),
            slots,
        })
    }

    async fn existing_starts_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<HashSet<DateTime<Utc>>, AppError> {
        let path = format!(
            "/rest/v1/availability_slots?doctor_id=eq.{}&start_time=gte.{}T00:00:00%2B00:00&start_time=lte.{}T23:59:59%2B00:00&select=start_time",
            doctor_id, date, date
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut starts = HashSet::new();
        for row in rows {
            if let Some(raw) = row["start_time"].as_str() {
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| {
                    AppError::Database(format!("Unparseable slot start_time {}: {}", raw, e))
                })?;
                starts.insert(parsed.with_timezone(&Utc));
            }
        }
        Ok(starts)
    }

    pub async fn get_by_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<&str>,
        available_only: bool,
    ) -> Result<Vec<AvailabilitySlot>, AppError> {
        let mut path = format!(
            "/rest/v1/availability_slots?doctor_id=eq.{}&select=*",
            doctor_id
        );
        if let Some(date) = date {
            let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                AppError::ValidationError("Invalid date, expected YYYY-MM-DD".to_string())
            })?;
            path.push_str(&format!(
                "&start_time=gte.{}T00:00:00%2B00:00&start_time=lte.{}T23:59:59%2B00:00",
                parsed, parsed
            ));
        }
        if available_only {
            path.push_str("&is_available=eq.true");
        }
        path.push_str("&order=start_time.asc");

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        parse_slots(rows)
    }

    pub async fn get_by_id(&self, slot_id: Uuid) -> Result<AvailabilitySlot, AppError> {
        let path = format!("/rest/v1/availability_slots?id=eq.{}", slot_id);
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

    pub async fn toggle_availability(
        &self,
        slot_id: Uuid,
        is_available: bool,
    ) -> Result<AvailabilitySlot, AppError> {
        let path = format!("/rest/v1/availability_slots?id=eq.{}", slot_id);
        let rows = self
            .supabase
            .write_returning(
                Method::PATCH,
                &path,
                None,
                json!({ "is_available": is_available }),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Slot not found".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse slot: {}", e)))
    }

    /// A slot backing a confirmed appointment cannot be deleted; the
    /// appointment has to be cancelled first.
    pub async fn delete(&self, slot_id: Uuid) -> Result<(), AppError> {
        self.get_by_id(slot_id).await?;

        let path = format!(
            "/rest/v1/appointments?slot_id=eq.{}&status=eq.confirmed&select=id",
            slot_id
        );
        let confirmed: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if !confirmed.is_empty() {
            return Err(AppError::Conflict(
                "Slot has a confirmed appointment; cancel it first".to_string(),
            ));
        }

        let path = format!("/rest/v1/availability_slots?id=eq.{}", slot_id);
        self.supabase
            .delete(&path, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Distinct ascending `YYYY-MM-DD` dates with at least one future,
    /// available slot for the doctor.
    pub async fn get_available_dates(&self, doctor_id: Uuid) -> Result<Vec<String>, AppError> {
        let now = Utc::now().to_rfc3339();
        let path = format!(
            "/rest/v1/availability_slots?doctor_id=eq.{}&is_available=eq.true&start_time=gte.{}&select=start_time&order=start_time.asc",
            doctor_id,
            urlencoded(&now)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut dates: Vec<String> = Vec::new();
        for row in rows {
            if let Some(raw) = row["start_time"].as_str() {
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| {
                    AppError::Database(format!("Unparseable slot start_time {}: {}", raw, e))
                })?;
                let date = parsed.with_timezone(&Utc).format("%Y-%m-%d").to_string();
                if dates.last() != Some(&date) {
                    dates.push(date);
                }
            }
        }
        Ok(dates)
    }
}

fn parse_slots(rows: Vec<Value>) -> Result<Vec<AvailabilitySlot>, AppError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<AvailabilitySlot>, _>>()
        .map_err(|e| AppError::Database(format!("Failed to parse slots: {}", e)))
}

// Timestamps go into query strings; '+' in the offset must not read as a space.
fn urlencoded(value: &str) -> String {
    value.replace('+', "%2B")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn walk_produces_contiguous_half_hour_slots() {
        let slots = slot_walk(at(9, 0), at(11, 0), &HashSet::new());

        assert_eq!(slots.len(), 4);
        for (start, end) in &slots {
            assert_eq!(*end - *start, Duration::minutes(30));
        }
        for pair in slots.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        assert_eq!(slots[0].0, at(9, 0));
        assert_eq!(slots[3].1, at(11, 0));
    }

    #[test]
    fn walk_drops_trailing_partial_slot() {
        // 09:00-10:45 fits two whole slots; the 10:00-10:45 remainder is dropped.
        let slots = slot_walk(at(9, 0), at(10, 45), &HashSet::new());
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].1, at(10, 0));
    }

    #[test]
    fn walk_skips_taken_starts_but_keeps_the_grid() {
        let existing: HashSet<_> = [at(9, 30)].into_iter().collect();
        let slots = slot_walk(at(9, 0), at(10, 30), &existing);

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].0, at(9, 0));
        // The cursor still advanced past the taken slot, so the next
        // candidate stays on the half-hour grid.
        assert_eq!(slots[1].0, at(10, 0));
    }

    #[test]
    fn walk_returns_nothing_when_everything_exists() {
        let existing: HashSet<_> = [at(9, 0), at(9, 30)].into_iter().collect();
        let slots = slot_walk(at(9, 0), at(10, 0), &existing);
        assert!(slots.is_empty());
    }

    #[test]
    fn walk_returns_nothing_for_sub_slot_window() {
        let slots = slot_walk(at(9, 0), at(9, 20), &HashSet::new());
        assert!(slots.is_empty());
    }

    #[test]
    fn one_hour_window_yields_two_slots() {
        let slots = slot_walk(at(9, 0), at(10, 0), &HashSet::new());
        assert_eq!(
            slots,
            vec![(at(9, 0), at(9, 30)), (at(9, 30), at(10, 0))]
        );
    }
}
