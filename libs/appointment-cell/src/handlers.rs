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

use crate::models::{
    AdminListQuery, CreateAppointmentRequest, ManualCreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::booking::BookingService;

fn requester_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid account id in token".to_string()))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let owner_id = requester_id(&user)?;
    AccountService::new(&config).ensure_account(&user.id).await?;

    let appointment = BookingService::new(&config).create(request, owner_id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn my_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let owner_id = requester_id(&user)?;
    let appointments = BookingService::new(&config).get_my_appointments(owner_id).await?;
    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let id = requester_id(&user)?;
    let is_admin = AccountService::new(&config).get_role(&user.id).await?.is_admin();

    let appointment = BookingService::new(&config)
        .get_by_id(appointment_id, id, is_admin)
        .await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let id = requester_id(&user)?;
    let is_admin = AccountService::new(&config).get_role(&user.id).await?.is_admin();

    let appointment = BookingService::new(&config)
        .update(appointment_id, request, id, is_admin)
        .await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let id = requester_id(&user)?;
    let is_admin = AccountService::new(&config).get_role(&user.id).await?.is_admin();

    let appointment = BookingService::new(&config)
        .cancel(appointment_id, id, is_admin)
        .await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_all_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Value>, AppError> {
    AccountService::new(&config).require_admin(&user).await?;

    let appointments = BookingService::new(&config).get_all(query).await?;
    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn create_manual_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<ManualCreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    AccountService::new(&config).require_admin(&user).await?;

    let appointment = BookingService::new(&config).create_manual(request).await?;
    Ok(Json(json!(appointment)))
}
