use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::UpdateDoctorRequest;
use doctor_cell::services::doctor::DoctorService;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockRows, TestConfig};

fn service(mock_server: &MockServer) -> DoctorService {
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    DoctorService::new(&config)
}

#[tokio::test]
async fn lists_doctors_filtered_by_specialization() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialization", "eq.Cardiologia"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor(&doctor_id.to_string(), "Anna", "Bianchi", "Cardiologia")
        ])))
        .mount(&mock_server)
        .await;

    let doctors = service(&mock_server)
        .get_all(Some("Cardiologia"))
        .await
        .unwrap();

    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0].full_name(), "Anna Bianchi");
}

#[tokio::test]
async fn unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server).get_by_id(Uuid::new_v4()).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn empty_update_is_a_validation_error() {
    let mock_server = MockServer::start().await;

    let request = UpdateDoctorRequest {
        first_name: None,
        last_name: None,
        specialization: None,
        profile_photo_url: None,
    };
    let result = service(&mock_server).update(Uuid::new_v4(), request).await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn specializations_are_distinct_and_sorted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "specialization": "Ortopedia" },
            { "specialization": "Cardiologia" },
            { "specialization": "Cardiologia" },
        ])))
        .mount(&mock_server)
        .await;

    let specializations = service(&mock_server).get_specializations().await.unwrap();
    assert_eq!(
        specializations,
        vec!["Cardiologia".to_string(), "Ortopedia".to_string()]
    );
}

#[tokio::test]
async fn delete_of_unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = service(&mock_server).delete(Uuid::new_v4()).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}
