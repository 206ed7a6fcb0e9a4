use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{Account, AccountProvision, AccountRole};

pub struct AccountService {
    supabase: SupabaseClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service_role(config),
        }
    }

    /// Idempotent provisioning: look up the account record for a verified
    /// principal, creating it with the default `patient` role when absent.
    /// The tagged result lets callers distinguish first sign-in from a
    /// returning user.
    pub async fn ensure_account(&self, user_id: &str) -> Result<AccountProvision, AppError> {
        let account_id = Uuid::parse_str(user_id)
            .map_err(|_| AppError::Auth("Invalid account id in token".to_string()))?;

        if let Some(account) = self.fetch_account(account_id).await? {
            return Ok(AccountProvision::Existing(account));
        }

        debug!("No account record for {}, provisioning with patient role", account_id);

        let created = self
            .supabase
            .write_returning(
                Method::POST,
                "/rest/v1/users",
                None,
                json!({
                    "id": account_id,
                    "role": AccountRole::Patient.as_str()
                }),
            )
            .await;

        let created = match created {
            Ok(rows) => rows,
            Err(e) => {
                let detail = e.to_string();
                if !AppError::is_duplicate_key(&detail) {
                    return Err(AppError::Database(detail));
                }
                // Two first requests raced and this insert lost; the
                // winner's row is there, use it.
                debug!("Account {} provisioned concurrently, re-fetching", account_id);
                let account = self.fetch_account(account_id).await?.ok_or_else(|| {
                    AppError::Database(
                        "Account missing after duplicate-key insert".to_string(),
                    )
                })?;
                return Ok(AccountProvision::Existing(account));
            }
        };

        let row = created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Account insert returned no row".to_string()))?;
        let account: Account = serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse account: {}", e)))?;

        info!("Provisioned account {} with role patient", account.id);
        Ok(AccountProvision::Created(account))
    }

    async fn fetch_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let path = format!("/rest/v1/users?id=eq.{}", account_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| AppError::Database(format!("Failed to parse account: {}", e)))
            })
            .transpose()
    }

    pub async fn get_role(&self, user_id: &str) -> Result<AccountRole, AppError> {
        Ok(self.ensure_account(user_id).await?.account().role)
    }

    /// Gate for admin-only operations.
    pub async fn require_admin(&self, user: &User) -> Result<(), AppError> {
        let role = self.get_role(&user.id).await?;
        if !role.is_admin() {
            return Err(AppError::Forbidden(
                "Administrator access required".to_string(),
            ));
        }
        Ok(())
    }
}
