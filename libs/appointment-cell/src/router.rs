use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_appointment))
        .route("/me", get(my_appointments))
        .route("/admin/all", get(list_all_appointments))
        .route("/admin/manual", post(create_manual_appointment))
        .route("/{id}", get(get_appointment))
        .route("/{id}", patch(update_appointment))
        .route("/{id}", delete(cancel_appointment))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
