use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

/// Transactional email over the Resend HTTP API. Delivery is best-effort:
/// every failure is logged and swallowed, a lost email never fails the
/// booking operation that triggered it.
pub struct EmailService {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
}

pub struct AppointmentEmailDetails<'a> {
    pub patient_name: &'a str,
    pub doctor_name: &'a str,
    pub specialization: &'a str,
    pub date: &'a str,
    pub time: &'a str,
}

impl EmailService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.resend_base_url.clone(),
            api_key: config.resend_api_key.clone(),
            from: format!("{} <{}>", config.email_from_name, config.email_from_address),
        }
    }

    pub async fn send_booking_confirmation(
        &self,
        to_email: &str,
        details: &AppointmentEmailDetails<'_>,
    ) -> bool {
        let subject = "Prenotazione Clinica Orchidea";
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #0891b2;">Clinica Orchidea</h2>
  <p>Gentile <strong>{patient}</strong>,</p>
  <p>Le confermiamo il suo appuntamento:</p>
  <div style="background: #f0f9ff; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p style="margin: 5px 0;"><strong>Dottore:</strong> Dr. {doctor}</p>
    <p style="margin: 5px 0;"><strong>Specializzazione:</strong> {specialization}</p>
    <p style="margin: 5px 0;"><strong>Data:</strong> {date}</p>
    <p style="margin: 5px 0;"><strong>Ora:</strong> {time}</p>
  </div>
  <p>Per modifiche o cancellazioni, acceda al portale o contatti la clinica.</p>
</div>"#,
            patient = details.patient_name,
            doctor = details.doctor_name,
            specialization = details.specialization,
            date = details.date,
            time = details.time,
        );

        self.send(to_email, subject, &html).await
    }

    pub async fn send_cancellation_by_patient(
        &self,
        to_email: &str,
        details: &AppointmentEmailDetails<'_>,
    ) -> bool {
        let subject = "Cancellazione Appuntamento - Clinica Orchidea";
        let html = Self::cancellation_body(
            details,
            "Confermiamo la cancellazione del suo appuntamento:",
            "Per prenotare un nuovo appuntamento, acceda al portale.",
        );

        self.send(to_email, subject, &html).await
    }

    pub async fn send_cancellation_by_clinic(
        &self,
        to_email: &str,
        details: &AppointmentEmailDetails<'_>,
    ) -> bool {
        let subject = "Cancellazione Appuntamento - Clinica Orchidea";
        let html = Self::cancellation_body(
            details,
            "La informiamo che il seguente appuntamento è stato cancellato dalla clinica:",
            "Per ulteriori informazioni, La preghiamo di contattare la clinica.",
        );

        self.send(to_email, subject, &html).await
    }

    fn cancellation_body(details: &AppointmentEmailDetails<'_>, intro: &str, outro: &str) -> String {
        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #0891b2;">Clinica Orchidea</h2>
  <p>Gentile <strong>{patient}</strong>,</p>
  <p>{intro}</p>
  <div style="background: #fef2f2; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p style="margin: 5px 0;"><strong>Dottore:</strong> Dr. {doctor}</p>
    <p style="margin: 5px 0;"><strong>Data:</strong> {date}</p>
    <p style="margin: 5px 0;"><strong>Ora:</strong> {time}</p>
    <p style="margin: 5px 0; color: #dc2626;"><strong>Stato:</strong> Cancellato</p>
  </div>
  <p>{outro}</p>
</div>"#,
            patient = details.patient_name,
            intro = intro,
            doctor = details.doctor_name,
            date = details.date,
            time = details.time,
            outro = outro,
        )
    }

    async fn send(&self, to_email: &str, subject: &str, html: &str) -> bool {
        if self.api_key.is_empty() {
            warn!("Resend API key not configured, skipping email to {}", to_email);
            return false;
        }

        let body = json!({
            "from": self.from,
            "to": [to_email],
            "subject": subject,
            "html": html
        });

        let result = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Email sent to {}", to_email);
                true
            }
            Ok(response) => {
                warn!(
                    "Email send to {} failed with status {}",
                    to_email,
                    response.status()
                );
                false
            }
            Err(e) => {
                warn!("Email send to {} failed: {}", to_email, e);
                false
            }
        }
    }
}
