use actix_web::{
    http::header::{self, ContentType},
    web, HttpResponse, Result,
};
use askama::Template;

use crate::{
    auth::Caller,
    consent::{CONSENT_NOTICES, CONSENT_TERMS},
    models::Appointment,
    state::AppState,
};

use super::consent::consent_target;

#[derive(Clone, Debug)]
struct ConsentView {
    id: String,
    customer_name: String,
    date: String,
    time_slot: String,
    artwork_title: String,
    tattoo_position: String,
    tattoo_size: String,
    tattoo_color: String,
    consent_notes: String,
    has_notes: bool,
    signer_name: String,
    signer_phone: String,
    signature_data: String,
    signed_at: String,
    signed: bool,
}

impl From<Appointment> for ConsentView {
    fn from(appointment: Appointment) -> Self {
        let signed = appointment.is_signed();
        let consent_notes = appointment.consent_notes.unwrap_or_default();
        Self {
            customer_name: appointment.customer_name.unwrap_or_default(),
            date: appointment.date,
            time_slot: appointment.time_slot,
            artwork_title: appointment.artwork_title.unwrap_or_default(),
            tattoo_position: appointment.tattoo_position.unwrap_or_default(),
            tattoo_size: appointment.tattoo_size.unwrap_or_default(),
            tattoo_color: appointment.tattoo_color.unwrap_or_default(),
            has_notes: !consent_notes.trim().is_empty(),
            consent_notes,
            signer_name: appointment.signer_name.unwrap_or_default(),
            signer_phone: appointment.signer_phone.unwrap_or_default(),
            signature_data: appointment.signature_data.unwrap_or_default(),
            signed_at: appointment.signed_at.unwrap_or_default(),
            signed,
            id: appointment.id,
        }
    }
}

#[derive(Template)]
#[template(path = "consent.html")]
struct ConsentTemplate {
    consent: ConsentView,
    terms: Vec<&'static str>,
    notices: Vec<&'static str>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/consent/{id}").route(web::get().to(consent_page)));
}

/// Signed waivers carry personal data, so pages are never cached.
fn render<T: Template>(template: T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type(ContentType::html())
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .body(body),
        Err(err) => {
            log::error!("Consent page render failed: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn consent_page(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment = consent_target(&state, &caller, &path.into_inner()).await?;

    Ok(render(ConsentTemplate {
        consent: ConsentView::from(appointment),
        terms: CONSENT_TERMS.to_vec(),
        notices: CONSENT_NOTICES.to_vec(),
    }))
}
