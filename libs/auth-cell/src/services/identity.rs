use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{MagicLinkRequest, MagicLinkResponse};

/// Thin wrapper over the identity provider's passwordless flow. The provider
/// owns token issuance end to end; we only trigger the email.
pub struct IdentityService {
    supabase: SupabaseClient,
    frontend_url: String,
}

impl IdentityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            frontend_url: config.frontend_url.clone(),
        }
    }

    pub async fn send_magic_link(
        &self,
        request: MagicLinkRequest,
    ) -> Result<MagicLinkResponse, AppError> {
        debug!("Requesting magic link for {}", request.email);

        let body = json!({
            "email": request.email,
            "create_user": true,
            "options": {
                "email_redirect_to": self.frontend_url
            }
        });

        let _: Value = self
            .supabase
            .request(Method::POST, "/auth/v1/otp", None, Some(body))
            .await
            .map_err(|e| AppError::ExternalService(format!("Magic link request failed: {}", e)))?;

        Ok(MagicLinkResponse {
            message: "Magic link sent. Check your email.".to_string(),
            email: request.email,
        })
    }
}
