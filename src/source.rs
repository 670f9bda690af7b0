use crate::config::AppSettings;
use crate::errors::{AppError, AppResult};
use crate::models::{AppointmentDetail, IncomingLead, QualifiedLead, WebhookEnvelope};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

const QUALIFIED_KEYS: [&str; 2] = ["qualifiedLeads", "qualified_leads"];
const INCOMING_KEYS: [&str; 2] = ["incomingLeads", "incoming_leads"];
const APPOINTMENT_KEYS: [&str; 3] = [
    "appointmentdetails",
    "appointmentDetails",
    "appointment_details",
];

const NAME_KEYS: [&str; 2] = ["name", "Name"];
const LOCATION_KEYS: [&str; 2] = ["location", "Location"];
const SUBMITTED_KEYS: [&str; 2] = ["submittedAt", "submitted_at"];
const START_TIME_KEYS: [&str; 2] = ["appointment_start_time", "appointmentStartTime"];

pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = AppResult<WebhookEnvelope>> + Send + 'a>>;

/// Where dashboard envelopes come from.
pub trait DataSource: Send + Sync {
    fn fetch(&self) -> SourceFuture<'_>;
}

#[derive(Debug, Clone)]
pub struct WebhookSource {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookSource {
    pub fn new(settings: &AppSettings) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.http_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_envelope(&self) -> AppResult<WebhookEnvelope> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("webhook request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Fetch(format!(
                "webhook returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| AppError::Fetch(format!("failed to read webhook body: {e}")))?;
        decode_envelope(&body)
    }
}

impl DataSource for WebhookSource {
    fn fetch(&self) -> SourceFuture<'_> {
        Box::pin(self.fetch_envelope())
    }
}

/// Parses a webhook body. Only a body that is not a JSON object is an error;
/// absent lists become empty and malformed records fall back to defaults.
pub fn decode_envelope(body: &str) -> AppResult<WebhookEnvelope> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(root) = value else {
        return Err(AppError::Decode("webhook body is not a JSON object".to_string()));
    };

    Ok(WebhookEnvelope {
        qualified_leads: records(&root, &QUALIFIED_KEYS)
            .iter()
            .map(qualified_lead)
            .collect(),
        incoming_leads: records(&root, &INCOMING_KEYS).iter().map(incoming_lead).collect(),
        appointment_details: records(&root, &APPOINTMENT_KEYS)
            .iter()
            .map(appointment_detail)
            .collect(),
    })
}

fn records<'a>(root: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    match lookup(root, keys) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Null) | None => &[],
        Some(other) => {
            tracing::warn!(
                field = keys[0],
                kind = json_kind(other),
                "expected a list, treating as empty"
            );
            &[]
        }
    }
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text_field(record: &Value, keys: &[&str]) -> String {
    let Value::Object(object) = record else {
        return String::new();
    };
    match lookup(object, keys) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn score_field(record: &Value) -> f64 {
    let Value::Object(object) = record else {
        return 0.0;
    };
    let score = match object.get("score") {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

fn qualified_lead(record: &Value) -> QualifiedLead {
    QualifiedLead {
        name: text_field(record, &NAME_KEYS),
        score: score_field(record),
        status: text_field(record, &["status"]),
        location: text_field(record, &LOCATION_KEYS),
    }
}

fn incoming_lead(record: &Value) -> IncomingLead {
    IncomingLead {
        name: text_field(record, &NAME_KEYS),
        location: text_field(record, &LOCATION_KEYS),
        submitted_at: text_field(record, &SUBMITTED_KEYS),
    }
}

fn appointment_detail(record: &Value) -> AppointmentDetail {
    AppointmentDetail {
        name: text_field(record, &NAME_KEYS),
        appointment_start_time: text_field(record, &START_TIME_KEYS),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_envelope, DataSource, WebhookSource};
    use crate::config::AppSettings;
    use crate::errors::AppError;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn decodes_wire_casing() {
        let body = json!({
            "qualifiedLeads": [
                {"name": "Ava", "score": 8, "status": "Hot", "location": "Austin, TX"}
            ],
            "incomingLeads": [
                {"Name": "Ben", "location": "Dallas", "submittedAt": "2025-01-05T10:00:00Z"}
            ],
            "appointmentdetails": [
                {"Name": "Cal", "appointment_start_time": "2025-01-06T15:00:00Z"}
            ]
        })
        .to_string();

        let envelope = decode_envelope(&body).expect("decode");
        assert_eq!(envelope.qualified_leads[0].name, "Ava");
        assert_eq!(envelope.qualified_leads[0].score, 8.0);
        assert_eq!(envelope.qualified_leads[0].location, "Austin, TX");
        assert_eq!(envelope.incoming_leads[0].name, "Ben");
        assert_eq!(envelope.appointment_details[0].name, "Cal");
        assert_eq!(envelope.appointment_details[0].appointment_start_time, "2025-01-06T15:00:00Z");
    }

    #[test]
    fn missing_or_null_lists_are_empty() {
        let envelope = decode_envelope(r#"{"qualifiedLeads": null}"#).expect("decode");
        assert!(envelope.qualified_leads.is_empty());
        assert!(envelope.incoming_leads.is_empty());
        assert!(envelope.appointment_details.is_empty());

        let envelope = decode_envelope(r#"{"incomingLeads": "oops"}"#).expect("decode");
        assert!(envelope.incoming_leads.is_empty());
    }

    #[test]
    fn malformed_records_fall_back_to_defaults() {
        let envelope = decode_envelope(
            r#"{"qualifiedLeads": [
                {"score": "7.5", "status": "Warm"},
                {"score": null, "name": 42},
                17
            ]}"#,
        )
        .expect("decode");
        assert_eq!(envelope.qualified_leads.len(), 3);
        assert_eq!(envelope.qualified_leads[0].score, 7.5);
        assert!(envelope.qualified_leads[0].location.is_empty());
        assert_eq!(envelope.qualified_leads[1].score, 0.0);
        assert_eq!(envelope.qualified_leads[1].name, "42");
        assert!(envelope.qualified_leads[2].status.is_empty());
    }

    #[test]
    fn non_object_body_is_a_decode_error() {
        assert!(matches!(decode_envelope("[1, 2]"), Err(AppError::Decode(_))));
        assert!(matches!(decode_envelope("<html>"), Err(AppError::Decode(_))));
    }

    #[tokio::test]
    async fn fetches_envelope_from_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webhook/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "qualifiedLeads": [
                    {"name": "Ava", "score": 9, "status": "Hot", "location": "Austin"}
                ],
                "incomingLeads": [],
                "appointmentdetails": []
            })))
            .mount(&server)
            .await;

        let settings = AppSettings::new(format!("{}/webhook/dashboard", server.uri()));
        let source = WebhookSource::new(&settings).expect("client");
        let envelope = source.fetch().await.expect("fetch");
        assert_eq!(envelope.qualified_leads.len(), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let settings = AppSettings::new(format!("{}/webhook/dashboard", server.uri()));
        let source = WebhookSource::new(&settings).expect("client");
        let err = source.fetch().await.expect_err("should fail");
        assert!(matches!(err, AppError::Fetch(ref message) if message.contains("503")));
    }
}
