use assert_matches::assert_matches;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AdminListQuery, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use appointment_cell::services::booking::BookingService;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockRows, TestConfig};

fn service(mock_server: &MockServer) -> BookingService {
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    BookingService::new(&config)
}

fn booking_request(slot_id: Uuid) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        slot_id,
        patient_first_name: "Mario".to_string(),
        patient_last_name: "Rossi".to_string(),
        patient_phone: "+39 333 1234567".to_string(),
        patient_email: "mario.rossi@example.com".to_string(),
    }
}

fn slot_with_doctor(slot_id: Uuid, doctor_id: Uuid, start: &str, available: bool) -> Value {
    let end = start.replacen("T09:00", "T09:30", 1);
    let mut row = MockRows::slot(
        &slot_id.to_string(),
        &doctor_id.to_string(),
        start,
        &end,
        available,
    );
    row["doctors"] = MockRows::doctor(&doctor_id.to_string(), "Anna", "Bianchi", "Cardiologia");
    row
}

fn appointment_with_relations(
    appointment_id: Uuid,
    doctor_id: Uuid,
    slot_id: Uuid,
    user_id: Option<&str>,
    status: &str,
    slot_start: &str,
) -> Value {
    let mut row = MockRows::appointment(
        &appointment_id.to_string(),
        &doctor_id.to_string(),
        &slot_id.to_string(),
        user_id,
        status,
    );
    row["availability_slots"] = MockRows::slot(
        &slot_id.to_string(),
        &doctor_id.to_string(),
        slot_start,
        slot_start,
        false,
    );
    row["doctors"] = MockRows::doctor(&doctor_id.to_string(), "Anna", "Bianchi", "Cardiologia");
    row
}

const FUTURE_START: &str = "2030-06-10T09:00:00+00:00";
const PAST_START: &str = "2020-06-10T09:00:00+00:00";

#[tokio::test]
async fn books_an_available_future_slot() {
    let mock_server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_with_doctor(slot_id, doctor_id, FUTURE_START, true)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::slot(
                &slot_id.to_string(),
                &doctor_id.to_string(),
                FUTURE_START,
                FUTURE_START,
                false
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                doctor_id,
                slot_id,
                Some(&owner_id.to_string()),
                "confirmed",
                FUTURE_START
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let appointment = service(&mock_server)
        .create(booking_request(slot_id), owner_id)
        .await
        .unwrap();

    assert_eq!(appointment.id, appointment_id);
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(appointment.doctor_id, doctor_id);
    assert!(appointment.doctor.is_some());
    assert!(appointment.slot.is_some());
}

#[tokio::test]
async fn missing_slot_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .create(booking_request(Uuid::new_v4()), Uuid::new_v4())
        .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn unavailable_slot_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_with_doctor(slot_id, doctor_id, FUTURE_START, false)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .create(booking_request(slot_id), Uuid::new_v4())
        .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn past_slot_is_a_bad_request() {
    let mock_server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_with_doctor(slot_id, doctor_id, PAST_START, true)
        ])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .create(booking_request(slot_id), Uuid::new_v4())
        .await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn losing_the_claim_race_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_with_doctor(slot_id, doctor_id, FUTURE_START, true)
        ])))
        .mount(&mock_server)
        .await;

    // The conditional flip matched zero rows: someone else got there first.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .create(booking_request(slot_id), Uuid::new_v4())
        .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn failed_insert_releases_the_slot_and_conflicts_on_duplicate() {
    let mock_server = MockServer::start().await;
    let slot_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_with_doctor(slot_id, doctor_id, FUTURE_START, true)
        ])))
        .mount(&mock_server)
        .await;

    // One call claims the slot, the second rolls the claim back.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::slot(
                &slot_id.to_string(),
                &doctor_id.to_string(),
                FUTURE_START,
                FUTURE_START,
                false
            )
        ])))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .create(booking_request(slot_id), Uuid::new_v4())
        .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn cancelling_restores_the_slot() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                doctor_id,
                slot_id,
                Some(&owner_id.to_string()),
                "confirmed",
                FUTURE_START
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                doctor_id,
                slot_id,
                Some(&owner_id.to_string()),
                "cancelled",
                FUTURE_START
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::slot(
                &slot_id.to_string(),
                &doctor_id.to_string(),
                FUTURE_START,
                FUTURE_START,
                true
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cancelled = service(&mock_server)
        .cancel(appointment_id, owner_id, false)
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn cancelling_twice_is_rejected() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                doctor_id,
                slot_id,
                Some(&owner_id.to_string()),
                "cancelled",
                FUTURE_START
            )
        ])))
        .mount(&mock_server)
        .await;

    // Neither the status write nor the slot flip may run again.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .cancel(appointment_id, owner_id, false)
        .await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn past_appointment_error_wins_over_already_cancelled_for_patients() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                Uuid::new_v4(),
                Uuid::new_v4(),
                Some(&owner_id.to_string()),
                "cancelled",
                PAST_START
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .cancel(appointment_id, owner_id, false)
        .await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("past"));
}

#[tokio::test]
async fn patient_cannot_cancel_someone_elses_appointment() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                Uuid::new_v4(),
                Uuid::new_v4(),
                Some(&Uuid::new_v4().to_string()),
                "confirmed",
                FUTURE_START
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .cancel(appointment_id, Uuid::new_v4(), false)
        .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn patient_cannot_cancel_a_past_appointment_but_admin_can() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                doctor_id,
                slot_id,
                Some(&owner_id.to_string()),
                "confirmed",
                PAST_START
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .cancel(appointment_id, owner_id, false)
        .await;
    assert_matches!(result, Err(AppError::BadRequest(_)));

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                doctor_id,
                slot_id,
                Some(&owner_id.to_string()),
                "cancelled",
                PAST_START
            )
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let cancelled = service(&mock_server)
        .cancel(appointment_id, Uuid::new_v4(), true)
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn empty_update_is_a_validation_error() {
    let mock_server = MockServer::start().await;

    let request = UpdateAppointmentRequest {
        patient_first_name: None,
        patient_last_name: None,
        patient_phone: None,
        patient_email: None,
    };
    let result = service(&mock_server)
        .update(Uuid::new_v4(), request, Uuid::new_v4(), false)
        .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn non_owner_read_is_forbidden() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_with_relations(
                appointment_id,
                Uuid::new_v4(),
                Uuid::new_v4(),
                Some(&Uuid::new_v4().to_string()),
                "confirmed",
                FUTURE_START
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .get_by_id(appointment_id, Uuid::new_v4(), false)
        .await;
    assert_matches!(result, Err(AppError::Forbidden(_)));

    let admin_read = service(&mock_server)
        .get_by_id(appointment_id, Uuid::new_v4(), true)
        .await;
    assert!(admin_read.is_ok());
}

#[tokio::test]
async fn admin_list_sorts_by_slot_start_with_slotless_first() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let later = appointment_with_relations(
        Uuid::new_v4(),
        doctor_id,
        Uuid::new_v4(),
        None,
        "confirmed",
        "2030-06-11T09:00:00+00:00",
    );
    let earlier = appointment_with_relations(
        Uuid::new_v4(),
        doctor_id,
        Uuid::new_v4(),
        None,
        "confirmed",
        "2030-06-10T09:00:00+00:00",
    );
    // No embedded slot at all.
    let slotless = MockRows::appointment(
        &Uuid::new_v4().to_string(),
        &doctor_id.to_string(),
        &Uuid::new_v4().to_string(),
        None,
        "confirmed",
    );

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([later, slotless, earlier])),
        )
        .mount(&mock_server)
        .await;

    let query = AdminListQuery {
        doctor_id: Some(doctor_id),
        date: None,
        date_end: None,
        status: None,
    };
    let appointments = service(&mock_server).get_all(query).await.unwrap();

    assert_eq!(appointments.len(), 3);
    assert!(appointments[0].slot.is_none());
    let first = appointments[1].slot.as_ref().unwrap().start_time;
    let second = appointments[2].slot.as_ref().unwrap().start_time;
    assert!(first < second);
}

#[tokio::test]
async fn admin_list_date_range_filters_on_slot_start() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let inside = appointment_with_relations(
        Uuid::new_v4(),
        doctor_id,
        Uuid::new_v4(),
        None,
        "confirmed",
        "2030-06-10T09:00:00+00:00",
    );
    let outside = appointment_with_relations(
        Uuid::new_v4(),
        doctor_id,
        Uuid::new_v4(),
        None,
        "confirmed",
        "2030-07-01T09:00:00+00:00",
    );

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([inside, outside])))
        .mount(&mock_server)
        .await;

    let query = AdminListQuery {
        doctor_id: None,
        date: Some("2030-06-10".to_string()),
        date_end: Some("2030-06-15".to_string()),
        status: None,
    };
    let appointments = service(&mock_server).get_all(query).await.unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(
        appointments[0]
            .slot
            .as_ref()
            .unwrap()
            .start_time
            .date_naive()
            .to_string(),
        "2030-06-10"
    );
}
