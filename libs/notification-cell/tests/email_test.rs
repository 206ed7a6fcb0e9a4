use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::services::email::{AppointmentEmailDetails, EmailService};
use shared_config::AppConfig;
use shared_utils::test_utils::TestConfig;

fn config_with_resend(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.resend_api_key = "re_test_key".to_string();
    config.resend_base_url = mock_server.uri();
    config
}

fn details() -> AppointmentEmailDetails<'static> {
    AppointmentEmailDetails {
        patient_name: "Mario Rossi",
        doctor_name: "Anna Bianchi",
        specialization: "Cardiologia",
        date: "10/06/2030",
        time: "09:00",
    }
}

#[tokio::test]
async fn sends_a_booking_confirmation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test_key"))
        .and(body_partial_json(json!({
            "to": ["mario.rossi@example.com"],
            "subject": "Prenotazione Clinica Orchidea"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email-1" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sent = EmailService::new(&config_with_resend(&mock_server))
        .send_booking_confirmation("mario.rossi@example.com", &details())
        .await;

    assert!(sent);
}

#[tokio::test]
async fn upstream_failure_is_swallowed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let sent = EmailService::new(&config_with_resend(&mock_server))
        .send_cancellation_by_patient("mario.rossi@example.com", &details())
        .await;

    assert!(!sent);
}

#[tokio::test]
async fn missing_api_key_skips_the_send() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = config_with_resend(&mock_server);
    config.resend_api_key = String::new();

    let sent = EmailService::new(&config)
        .send_cancellation_by_clinic("mario.rossi@example.com", &details())
        .await;

    assert!(!sent);
}
