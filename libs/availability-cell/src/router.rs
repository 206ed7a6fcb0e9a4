use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn availability_routes(config: Arc<AppConfig>) -> Router {
    let admin = Router::new()
        .route("/admin/slots", post(generate_slots))
        .route("/admin/slots/{id}", patch(toggle_slot))
        .route("/admin/slots/{id}", delete(delete_slot))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    Router::new()
        .route("/doctors/{id}/slots", get(list_doctor_slots))
        .route("/doctors/{id}/available-dates", get(list_available_dates))
        .merge(admin)
        .with_state(config)
}
