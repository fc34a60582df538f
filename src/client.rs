//! Typed HTTP client for the studio API, used by front-end tooling and scripts.
//!
//! Reads degrade to empty collections or fixed fallbacks so a flaky connection
//! leaves the UI usable; writes surface every failure. Nothing is retried.

use std::collections::HashMap;

use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::{
    auth::MEMBER_HEADER,
    compositor::{PreviewRequest, PreviewResponse},
    consent::ConsentSubmission,
    models::{Appointment, Artwork, CustomerSummary, User, DEFAULT_CATEGORIES},
    policy::Action,
    upload::{encode_data_url, StoredImage, UploadKind, UploadRequest},
    workflow::CustomOrderInput,
};

pub const AFTERCARE_FALLBACK: &str = "The aftercare guide could not be loaded. Please try again later.";

const NUMERIC_FIELDS: [&str; 5] = ["price", "specialPrice", "viewCount", "totalPrice", "depositPaid"];

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Server returned status {0}")]
    Status(u16),

    #[error("{0}")]
    Api(String),

    #[error("Invalid response format from server")]
    InvalidResponse,

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Categories shown when the server cannot be reached.
pub fn fallback_categories() -> Vec<String> {
    std::iter::once("All")
        .chain(DEFAULT_CATEGORIES)
        .map(str::to_string)
        .collect()
}

/// Turns a raw response into JSON, treating an `{"error": ..}` body as a failure
/// whatever the status code says.
pub fn handle_response(status: u16, text: &str) -> ClientResult<Value> {
    if !(200..300).contains(&status) {
        log::error!("API error {status}: {text}");
        return Err(ClientError::Status(status));
    }
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value: Value = serde_json::from_str(text).map_err(|_| {
        log::error!("Unparseable API response: {text}");
        ClientError::InvalidResponse
    })?;
    let error = match value.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(message)) if message.is_empty() => None,
        Some(Value::String(message)) => Some(message.clone()),
        Some(other) => Some(other.to_string()),
    };
    match error {
        Some(message) => Err(ClientError::Api(message)),
        None => Ok(value),
    }
}

/// Reads a number that may have arrived as a JSON number or a numeric string.
pub fn coerce_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|float| float.round() as i64))
        }
        _ => None,
    }
}

fn coerce_numeric_fields(record: &mut Map<String, Value>) {
    for field in NUMERIC_FIELDS {
        if let Some(value) = record.get_mut(field) {
            *value = coerce_number(value).map_or(Value::Null, Value::from);
        }
    }
}

fn default_list(record: &mut Map<String, Value>, field: &str) {
    if !record.get(field).is_some_and(Value::is_array) {
        record.insert(field.to_string(), json!([]));
    }
}

pub fn normalize_artwork(mut value: Value) -> Value {
    if let Some(record) = value.as_object_mut() {
        coerce_numeric_fields(record);
        for field in ["price", "specialPrice"] {
            if record.get(field).and_then(Value::as_i64) == Some(0) {
                record.insert(field.to_string(), Value::Null);
            }
        }
        if !record.get("viewCount").is_some_and(Value::is_i64) {
            record.insert("viewCount".to_string(), json!(0));
        }
        default_list(record, "tags");
    }
    value
}

pub fn normalize_appointment(mut value: Value) -> Value {
    if let Some(record) = value.as_object_mut() {
        coerce_numeric_fields(record);
    }
    value
}

pub fn normalize_user(mut value: Value) -> Value {
    if let Some(record) = value.as_object_mut() {
        default_list(record, "favorites");
    }
    value
}

fn decode_list<T: DeserializeOwned>(value: Value, normalize: fn(Value) -> Value) -> ClientResult<Vec<T>> {
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value(normalize(item)).map_err(ClientError::from))
        .collect()
}

#[derive(Debug, Clone, Default)]
enum Credentials {
    #[default]
    Anonymous,
    Member(String),
    Admin { username: String, password: String },
}

#[derive(Debug, Clone)]
pub struct StudioClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl StudioClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: Credentials::Anonymous,
        })
    }

    pub fn as_member(mut self, member_id: impl Into<String>) -> Self {
        self.credentials = Credentials::Member(member_id.into());
        self
    }

    pub fn as_admin(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials::Admin {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    fn url(&self, action: Action, params: &[(&str, &str)]) -> ClientResult<Url> {
        let mut query = vec![("action", action.as_str())];
        query.extend_from_slice(params);
        Url::parse_with_params(&format!("{}/api", self.base_url), &query)
            .map_err(|err| ClientError::InvalidUrl(err.to_string()))
    }

    fn with_credentials(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Anonymous => request,
            Credentials::Member(id) => request.header(MEMBER_HEADER, id),
            Credentials::Admin { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Value> {
        let response = self.with_credentials(request).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        handle_response(status, &text)
    }

    async fn get(&self, action: Action, params: &[(&str, &str)]) -> ClientResult<Value> {
        let url = self.url(action, params)?;
        self.send(self.http.get(url)).await
    }

    async fn post<B: Serialize + ?Sized>(&self, action: Action, body: &B) -> ClientResult<Value> {
        self.post_with(action, &[], body).await
    }

    async fn post_with<B: Serialize + ?Sized>(
        &self,
        action: Action,
        params: &[(&str, &str)],
        body: &B,
    ) -> ClientResult<Value> {
        let url = self.url(action, params)?;
        self.send(self.http.post(url).json(body)).await
    }

    // Portfolio

    pub async fn get_artworks(&self) -> Vec<Artwork> {
        let result = match self.get(Action::GetArtworks, &[]).await {
            Ok(value) => decode_list(value, normalize_artwork),
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| {
            log::error!("Failed to load artworks: {err}");
            Vec::new()
        })
    }

    pub async fn save_artwork(&self, artwork: &Artwork) -> ClientResult<()> {
        self.post(Action::SaveArtwork, artwork).await.map(drop)
    }

    pub async fn delete_artwork(&self, id: &str) -> ClientResult<()> {
        self.post(Action::DeleteArtwork, &json!({ "id": id })).await.map(drop)
    }

    /// Best effort; returns the new count when the server answered.
    pub async fn record_view(&self, id: &str) -> Option<i64> {
        match self.post(Action::RecordView, &json!({ "id": id })).await {
            Ok(value) => value.get("viewCount").and_then(coerce_number),
            Err(err) => {
                log::warn!("Failed to record view of {id}: {err}");
                None
            }
        }
    }

    pub async fn get_artwork_stats(&self) -> HashMap<String, i64> {
        let Ok(Value::Object(stats)) = self.get(Action::GetArtworkStats, &[]).await else {
            return HashMap::new();
        };
        stats
            .into_iter()
            .filter_map(|(id, count)| coerce_number(&count).map(|count| (id, count)))
            .collect()
    }

    pub async fn get_categories(&self) -> Vec<String> {
        match self.get(Action::GetCategories, &[]).await {
            Ok(value @ Value::Array(_)) => serde_json::from_value(value).unwrap_or_else(|_| fallback_categories()),
            Ok(_) => fallback_categories(),
            Err(err) => {
                log::warn!("Failed to fetch categories, using defaults: {err}");
                fallback_categories()
            }
        }
    }

    pub async fn add_category(&self, name: &str) -> ClientResult<Vec<String>> {
        let value = self.post(Action::AddCategory, &json!({ "name": name })).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete_category(&self, name: &str) -> ClientResult<Vec<String>> {
        let value = self.post(Action::DeleteCategory, &json!({ "name": name })).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_aftercare(&self) -> String {
        match self.get(Action::GetAftercare, &[]).await {
            Ok(value) => value
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Err(err) => {
                log::error!("Failed to fetch aftercare: {err}");
                AFTERCARE_FALLBACK.to_string()
            }
        }
    }

    pub async fn save_aftercare(&self, content: &str) -> ClientResult<()> {
        self.post(Action::SaveAftercare, &json!({ "content": content }))
            .await
            .map(drop)
    }

    // Members

    /// Never fails: when the server is unreachable the local user is returned as is.
    pub async fn sync_user(&self, user: &User) -> User {
        let synced = match self.post(Action::SyncUser, user).await {
            Ok(value @ Value::Object(_)) => serde_json::from_value(normalize_user(value)).map_err(ClientError::from),
            Ok(_) => Err(ClientError::InvalidResponse),
            Err(err) => Err(err),
        };
        synced.unwrap_or_else(|err| {
            log::warn!("User sync failed, using local copy: {err}");
            user.clone()
        })
    }

    pub async fn get_all_users(&self) -> Vec<CustomerSummary> {
        let result = match self.get(Action::GetAllUsers, &[]).await {
            Ok(value) => decode_list(value, normalize_user),
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| {
            log::error!("Failed to load users: {err}");
            Vec::new()
        })
    }

    pub async fn toggle_favorite(&self, user_id: &str, artwork_id: &str) -> ClientResult<Vec<String>> {
        let value = self
            .post(
                Action::ToggleFavorite,
                &json!({ "userId": user_id, "artworkId": artwork_id }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    // Appointments

    pub async fn get_appointments(&self) -> Vec<Appointment> {
        let result = match self.get(Action::GetAppointments, &[]).await {
            Ok(value) => decode_list(value, normalize_appointment),
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| {
            log::error!("Failed to load appointments: {err}");
            Vec::new()
        })
    }

    pub async fn save_appointment(&self, appointment: &Appointment) -> ClientResult<()> {
        self.post(Action::SaveAppointment, appointment).await.map(drop)
    }

    /// Admin edit that skips the workflow checks.
    pub async fn override_appointment(&self, appointment: &Appointment) -> ClientResult<()> {
        self.post_with(Action::SaveAppointment, &[("override", "true")], appointment)
            .await
            .map(drop)
    }

    pub async fn delete_appointment(&self, id: &str) -> ClientResult<()> {
        self.post(Action::DeleteAppointment, &json!({ "id": id }))
            .await
            .map(drop)
    }

    pub async fn cancel_appointment(&self, id: &str) -> ClientResult<()> {
        self.post(Action::CancelAppointment, &json!({ "id": id }))
            .await
            .map(drop)
    }

    async fn workflow(&self, action: Action, body: Value) -> ClientResult<Appointment> {
        let value = self.post(action, &body).await?;
        Ok(serde_json::from_value(normalize_appointment(value))?)
    }

    pub async fn confirm_deposit(&self, id: &str, deposit_paid: i64) -> ClientResult<Appointment> {
        self.workflow(
            Action::ConfirmDeposit,
            json!({ "id": id, "depositPaid": deposit_paid }),
        )
        .await
    }

    pub async fn confirm_payment(&self, id: &str) -> ClientResult<Appointment> {
        self.workflow(Action::ConfirmPayment, json!({ "id": id })).await
    }

    pub async fn confirm_booking(&self, id: &str) -> ClientResult<Appointment> {
        self.workflow(Action::ConfirmBooking, json!({ "id": id })).await
    }

    pub async fn complete_appointment(&self, id: &str) -> ClientResult<Appointment> {
        self.workflow(Action::CompleteAppointment, json!({ "id": id })).await
    }

    pub async fn create_custom_order(&self, order: &CustomOrderInput) -> ClientResult<Appointment> {
        let value = self.post(Action::CreateCustomOrder, order).await?;
        Ok(serde_json::from_value(normalize_appointment(value))?)
    }

    async fn message(&self, action: Action, id: &str) -> ClientResult<String> {
        let value = self.get(action, &[("id", id)]).await?;
        value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ClientError::InvalidResponse)
    }

    pub async fn get_deposit_message(&self, id: &str) -> ClientResult<String> {
        self.message(Action::GetDepositMessage, id).await
    }

    pub async fn get_consent_message(&self, id: &str) -> ClientResult<String> {
        self.message(Action::GetConsentMessage, id).await
    }

    // Consent

    pub async fn get_consent(&self, appointment_id: &str) -> Option<Appointment> {
        let value = match self.get(Action::GetConsent, &[("id", appointment_id)]).await {
            Ok(value) => value,
            Err(err) => {
                log::error!("Failed to get consent data for {appointment_id}: {err}");
                return None;
            }
        };
        serde_json::from_value(normalize_appointment(value))
            .inspect_err(|err| log::error!("Consent data for {appointment_id} is malformed: {err}"))
            .ok()
    }

    pub async fn save_consent(&self, submission: &ConsentSubmission) -> ClientResult<()> {
        self.post(Action::SaveConsent, submission).await.map(drop)
    }

    // Media

    pub async fn upload_image(
        &self,
        kind: UploadKind,
        content_type: &str,
        bytes: &[u8],
    ) -> ClientResult<StoredImage> {
        let request = UploadRequest {
            kind,
            content_type: content_type.to_string(),
            data: encode_data_url(content_type, bytes),
        };
        let value = self.post(Action::UploadImage, &request).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn compose_preview(&self, request: &PreviewRequest) -> ClientResult<PreviewResponse> {
        let value = self.post(Action::ComposePreview, request).await?;
        Ok(serde_json::from_value(value)?)
    }
}
