use actix_web::HttpResponse;

use crate::{
    auth::Caller,
    consent::{ConsentError, ConsentSubmission},
    db::{fetch_appointment, log_activity},
    error::{StudioError, StudioResult},
    models::Appointment,
    policy::authorize_owner,
    state::AppState,
};

use super::api::{required, success};

/// Loads the appointment behind a consent form, checking the caller may see it.
pub async fn consent_target(state: &AppState, caller: &Caller, id: &str) -> StudioResult<Appointment> {
    let appointment = fetch_appointment(&state.db, id)
        .await?
        .ok_or(StudioError::NotFound("Appointment"))?;
    authorize_owner(caller, appointment.user_id.as_deref())?;
    Ok(appointment)
}

pub async fn get_consent(
    state: &AppState,
    caller: &Caller,
    id: Option<&str>,
) -> StudioResult<HttpResponse> {
    let id = required(id, "appointment ID")?;
    let appointment = consent_target(state, caller, id).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

pub async fn save_consent(
    state: &AppState,
    caller: &Caller,
    submission: ConsentSubmission,
) -> StudioResult<HttpResponse> {
    let id = required(Some(submission.id.as_str()), "appointment ID")?;
    let appointment = consent_target(state, caller, id).await?;
    if appointment.is_signed() {
        return Err(ConsentError::AlreadySigned.into());
    }
    let signed = submission.validate()?;

    sqlx::query(
        r#"UPDATE appointments
           SET signer_name = ?, signer_phone = ?, signature_data = ?, signed_at = ?
           WHERE id = ?"#,
    )
    .bind(&signed.signer_name)
    .bind(&signed.signer_phone)
    .bind(&signed.signature_data)
    .bind(&signed.signed_at)
    .bind(id)
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "consent_submitted",
        &format!("{} signed the consent form for appointment {id}.", signed.signer_name),
        appointment.user_id.as_deref(),
        Some(id),
    )
    .await;

    Ok(success())
}
