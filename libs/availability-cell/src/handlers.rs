use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use auth_cell::services::account::AccountService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateSlotsRequest, SlotListQuery, ToggleAvailabilityRequest};
use crate::services::slots::SlotService;

#[axum::debug_handler]
pub async fn list_doctor_slots(
    State(config): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotListQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = SlotService::new(&config)
        .get_by_doctor(
            doctor_id,
            query.date.as_deref(),
            query.available_only.unwrap_or(false),
        )
        .await?;
    Ok(Json(json!(slots)))
}

#[axum::debug_handler]
pub async fn list_available_dates(
    State(config): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let dates = SlotService::new(&config).get_available_dates(doctor_id).await?;
    Ok(Json(json!(dates)))
}

#[axum::debug_handler]
pub async fn generate_slots(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    AccountService::new(&config).require_admin(&user).await?;

    let response = SlotService::new(&config).generate_slots(request).await?;
    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn toggle_slot(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
    Json(request): Json<ToggleAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    AccountService::new(&config).require_admin(&user).await?;

    let slot = SlotService::new(&config)
        .toggle_availability(slot_id, request.is_available)
        .await?;
    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    AccountService::new(&config).require_admin(&user).await?;

    SlotService::new(&config).delete(slot_id).await?;
    Ok(Json(json!({ "message": "Slot deleted" })))
}
