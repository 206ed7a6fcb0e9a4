use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn doctor_routes(config: Arc<AppConfig>) -> Router {
    let admin = Router::new()
        .route("/", post(create_doctor))
        .route("/{id}", put(update_doctor))
        .route("/{id}", delete(delete_doctor))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    Router::new()
        .route("/", get(list_doctors))
        .route("/specializations", get(list_specializations))
        .route("/{id}", get(get_doctor))
        .merge(admin)
        .with_state(config)
}
