use actix_web::{http::Method, web, HttpRequest, HttpResponse};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::{
    auth::Caller,
    error::{StudioError, StudioResult},
    policy::{authorize, Action},
    state::AppState,
};

use super::{appointments, catalog, consent, media, members};

#[derive(Debug, Default, Deserialize)]
pub struct ApiQuery {
    pub action: Option<String>,
    pub id: Option<String>,
    pub origin: Option<String>,
    #[serde(rename = "override")]
    pub admin_override: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct IdInput {
    #[serde(default)]
    pub id: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api")
            .route(web::get().to(dispatch))
            .route(web::post().to(dispatch))
            .route(web::method(Method::OPTIONS).to(preflight)),
    );
}

async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn dispatch(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ApiQuery>,
    caller: Caller,
    body: web::Bytes,
) -> StudioResult<HttpResponse> {
    let query = query.into_inner();
    let action: Action = query.action.as_deref().unwrap_or_default().parse()?;

    if action.requires_post() && req.method() != Method::POST {
        return Err(StudioError::MethodNotAllowed);
    }
    authorize(action, &caller)?;
    log::debug!("{} called {action}", caller.label());

    match action {
        Action::GetArtworks => catalog::get_artworks(&state).await,
        Action::SaveArtwork => catalog::save_artwork(&state, &caller, parse_body(&body)?).await,
        Action::DeleteArtwork => catalog::delete_artwork(&state, &caller, parse_body(&body)?).await,
        Action::RecordView => catalog::record_view(&state, parse_body(&body)?).await,
        Action::GetCategories => catalog::get_categories(&state).await,
        Action::AddCategory => catalog::add_category(&state, parse_body(&body)?).await,
        Action::DeleteCategory => catalog::delete_category(&state, parse_body(&body)?).await,
        Action::GetAftercare => catalog::get_aftercare(&state).await,
        Action::SaveAftercare => catalog::save_aftercare(&state, &caller, parse_body(&body)?).await,

        Action::GetAppointments => appointments::get_appointments(&state, &caller).await,
        Action::SaveAppointment => {
            let admin_override = query.admin_override.unwrap_or(false);
            appointments::save_appointment(&state, &caller, admin_override, parse_body(&body)?).await
        }
        Action::DeleteAppointment | Action::CancelAppointment => {
            appointments::remove_appointment(&state, &caller, action, parse_body(&body)?).await
        }
        Action::ConfirmDeposit => appointments::confirm_deposit(&state, &caller, parse_body(&body)?).await,
        Action::ConfirmPayment | Action::ConfirmBooking | Action::CompleteAppointment => {
            appointments::advance(&state, &caller, action, parse_body(&body)?).await
        }
        Action::CreateCustomOrder => {
            appointments::create_custom_order(&state, &caller, parse_body(&body)?).await
        }
        Action::GetDepositMessage => appointments::deposit_message(&state, query.id.as_deref()).await,
        Action::GetConsentMessage => {
            let origin = request_origin(&req, query.origin.as_deref());
            appointments::consent_message(&state, query.id.as_deref(), &origin).await
        }

        Action::SyncUser => members::sync_user(&state, parse_body(&body)?).await,
        Action::GetAllUsers => members::get_all_users(&state).await,
        Action::ToggleFavorite => members::toggle_favorite(&state, &caller, parse_body(&body)?).await,
        Action::GetArtworkStats => members::get_artwork_stats(&state).await,

        Action::GetConsent => consent::get_consent(&state, &caller, query.id.as_deref()).await,
        Action::SaveConsent => consent::save_consent(&state, &caller, parse_body(&body)?).await,

        Action::UploadImage => media::upload_image(&state, parse_body(&body)?).await,
        Action::ComposePreview => media::compose_preview(&state, parse_body(&body)?).await,
    }
}

pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> StudioResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(StudioError::MissingField("request body"));
    }
    Ok(serde_json::from_slice(body)?)
}

pub fn success() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true }))
}

pub fn required<'a>(value: Option<&'a str>, field: &'static str) -> StudioResult<&'a str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(StudioError::MissingField(field))
}

fn request_origin(req: &HttpRequest, explicit: Option<&str>) -> String {
    if let Some(origin) = explicit.map(str::trim).filter(|origin| !origin.is_empty()) {
        return origin.to_string();
    }
    let info = req.connection_info();
    format!("{}://{}", info.scheme(), info.host())
}
