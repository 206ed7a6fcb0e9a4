use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CurrentUserResponse, MagicLinkRequest, MagicLinkResponse};
use crate::services::account::AccountService;
use crate::services::identity::IdentityService;

#[axum::debug_handler]
pub async fn request_magic_link(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<MagicLinkRequest>,
) -> Result<Json<MagicLinkResponse>, AppError> {
    let service = IdentityService::new(&config);
    let response = service.send_magic_link(request).await?;
    Ok(Json(response))
}

/// Current principal: the JWT was already verified by the auth middleware;
/// this resolves the clinic role, provisioning the account record on first
/// sign-in.
#[axum::debug_handler]
pub async fn get_me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<CurrentUserResponse>, AppError> {
    debug!("Resolving current user {}", user.id);

    let provision = AccountService::new(&config).ensure_account(&user.id).await?;
    let account = provision.account();

    Ok(Json(CurrentUserResponse {
        id: account.id,
        email: user.email,
        role: account.role,
        created_at: user.created_at.or(account.created_at),
    }))
}

#[axum::debug_handler]
pub async fn verify_token(
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    // Reaching this handler means the middleware accepted the token.
    Ok(Json(json!({ "valid": true })))
}
