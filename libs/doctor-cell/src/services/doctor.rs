use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, Doctor, UpdateDoctorRequest};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service_role(config),
        }
    }

    pub async fn get_all(&self, specialization: Option<&str>) -> Result<Vec<Doctor>, AppError> {
        let mut path = "/rest/v1/doctors?select=*".to_string();

        if let Some(specialization) = specialization {
            path.push_str(&format!(
                "&specialization=eq.{}",
                urlencoding::encode(specialization)
            ));
        }
        path.push_str("&order=last_name.asc");

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    pub async fn get_by_id(&self, doctor_id: Uuid) -> Result<Doctor, AppError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse doctor: {}", e)))
    }

    pub async fn create(&self, request: CreateDoctorRequest) -> Result<Doctor, AppError> {
        debug!("Creating doctor {} {}", request.first_name, request.last_name);

        let result = self
            .supabase
            .write_returning(
                Method::POST,
                "/rest/v1/doctors",
                None,
                json!({
                    "first_name": request.first_name,
                    "last_name": request.last_name,
                    "specialization": request.specialization,
                    "profile_photo_url": request.profile_photo_url,
                }),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Doctor insert returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse doctor: {}", e)))
    }

    pub async fn update(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, AppError> {
        if request.is_empty() {
            return Err(AppError::ValidationError("Nothing to update".to_string()));
        }

        // Existence check so an unknown id is a 404, not a silent no-op.
        self.get_by_id(doctor_id).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(specialization) = request.specialization {
            update_data.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(photo_url) = request.profile_photo_url {
            // Empty string clears the photo.
            let value = if photo_url.is_empty() { Value::Null } else { json!(photo_url) };
            update_data.insert("profile_photo_url".to_string(), value);
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result = self
            .supabase
            .write_returning(Method::PATCH, &path, None, Value::Object(update_data))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Doctor update returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppError::Database(format!("Failed to parse doctor: {}", e)))
    }

    pub async fn delete(&self, doctor_id: Uuid) -> Result<(), AppError> {
        self.get_by_id(doctor_id).await?;

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.supabase
            .delete(&path, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    pub async fn get_specializations(&self) -> Result<Vec<String>, AppError> {
        let result: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/doctors?select=specialization",
                None,
                None,
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut specializations: Vec<String> = result
            .iter()
            .filter_map(|row| row["specialization"].as_str().map(str::to_string))
            .collect();
        specializations.sort();
        specializations.dedup();

        Ok(specializations)
    }
}
