use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn auth_routes(config: Arc<AppConfig>) -> Router {
    let protected = Router::new()
        .route("/me", get(get_me))
        .route("/verify", get(verify_token))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    Router::new()
        .route("/magic-link", post(request_magic_link))
        .merge(protected)
        .with_state(config)
}
