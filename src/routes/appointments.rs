use actix_web::HttpResponse;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    auth::Caller,
    db::{fetch_appointment, log_activity},
    error::{StudioError, StudioResult},
    models::{Appointment, AppointmentInput, AppointmentStatus, User, APPOINTMENT_COLUMNS},
    policy::{authorize_booking, authorize_owner, Action},
    reconcile::{apply_status_effect, conflicting_claim, holds_artwork, release_artwork},
    state::AppState,
    workflow::{self, check_transition, new_custom_order, CustomOrderInput, WorkflowStep},
};

use super::{
    api::{required, success, IdInput},
    members::fetch_user,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInput {
    #[serde(default)]
    pub id: String,
    pub deposit_paid: Option<i64>,
}

fn actor_id(caller: &Caller) -> Option<&str> {
    caller.user().map(|user| user.id.as_str())
}

async fn require_appointment(state: &AppState, id: &str) -> StudioResult<Appointment> {
    fetch_appointment(&state.db, id)
        .await?
        .ok_or(StudioError::NotFound("Appointment"))
}

/// Moves SIGNING appointments that already carry a signature on to SIGNED.
pub async fn promote_signed(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    let signing = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE status = ?"
    ))
    .bind(AppointmentStatus::Signing)
    .fetch_all(pool)
    .await?;

    let mut promoted = 0;
    for appointment in signing {
        let Ok(next) = WorkflowStep::PromoteSigned.apply(&appointment) else {
            continue;
        };
        sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
            .bind(next)
            .bind(&appointment.id)
            .execute(pool)
            .await?;
        log_activity(
            pool,
            WorkflowStep::PromoteSigned.activity_kind(),
            &format!("Consent for appointment {} is signed.", appointment.id),
            appointment.user_id.as_deref(),
            Some(&appointment.id),
        )
        .await;
        promoted += 1;
    }

    if promoted > 0 {
        log::info!("Promoted {promoted} signed appointment(s)");
    }
    Ok(promoted)
}

pub async fn get_appointments(state: &AppState, caller: &Caller) -> StudioResult<HttpResponse> {
    let base = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments");
    let appointments = match caller {
        Caller::Admin(_) => {
            promote_signed(&state.db).await?;
            sqlx::query_as::<_, Appointment>(&format!("{base} ORDER BY date, time_slot"))
                .fetch_all(&state.db)
                .await?
        }
        Caller::Member(member) => {
            sqlx::query_as::<_, Appointment>(&format!(
                "{base} WHERE status = ? OR user_id = ? ORDER BY date, time_slot"
            ))
            .bind(AppointmentStatus::Open)
            .bind(&member.id)
            .fetch_all(&state.db)
            .await?
        }
        Caller::Guest => {
            sqlx::query_as::<_, Appointment>(&format!(
                "{base} WHERE status = ? ORDER BY date, time_slot"
            ))
            .bind(AppointmentStatus::Open)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(appointments))
}

pub async fn save_appointment(
    state: &AppState,
    caller: &Caller,
    admin_override: bool,
    input: AppointmentInput,
) -> StudioResult<HttpResponse> {
    let id = required(Some(input.id.as_str()), "appointment ID")?.to_string();
    required(Some(input.date.as_str()), "date")?;
    required(Some(input.time_slot.as_str()), "time slot")?;
    if admin_override && !caller.is_admin() {
        return Err(StudioError::Forbidden(
            "only the studio can override the workflow".to_string(),
        ));
    }

    let existing = fetch_appointment(&state.db, &id).await?;
    authorize_booking(caller, existing.as_ref(), &input)?;
    check_transition(
        existing.as_ref().map(|appointment| appointment.status),
        input.status,
        input.order_type(),
        admin_override,
    )?;

    let artwork_id = input.linked_artwork();
    if let Some(artwork_id) = artwork_id.filter(|_| holds_artwork(input.status) && !admin_override) {
        if let Some(holder) = conflicting_claim(&state.db, artwork_id, &id).await? {
            log::warn!("Appointment {id} wants artwork {artwork_id} already held by {holder}");
            return Err(StudioError::ArtworkUnavailable(artwork_id.to_string()));
        }
    }

    sqlx::query(
        r#"INSERT INTO appointments
               (id, date, time_slot, user_id, customer_name, phone_number, status, notes,
                artwork_id, artwork_title, artwork_image, total_price, deposit_paid,
                tattoo_position, tattoo_size, tattoo_color, consent_notes, order_type, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
               date = excluded.date,
               time_slot = excluded.time_slot,
               user_id = excluded.user_id,
               customer_name = excluded.customer_name,
               phone_number = excluded.phone_number,
               status = excluded.status,
               notes = excluded.notes,
               artwork_id = excluded.artwork_id,
               artwork_title = excluded.artwork_title,
               artwork_image = excluded.artwork_image,
               total_price = excluded.total_price,
               deposit_paid = excluded.deposit_paid,
               tattoo_position = excluded.tattoo_position,
               tattoo_size = excluded.tattoo_size,
               tattoo_color = excluded.tattoo_color,
               consent_notes = excluded.consent_notes,
               order_type = excluded.order_type"#,
    )
    .bind(&id)
    .bind(input.date.trim())
    .bind(input.time_slot.trim())
    .bind(&input.user_id)
    .bind(&input.customer_name)
    .bind(&input.phone_number)
    .bind(input.status)
    .bind(&input.notes)
    .bind(artwork_id)
    .bind(&input.artwork_title)
    .bind(&input.artwork_image)
    .bind(input.total_price)
    .bind(input.deposit_paid)
    .bind(&input.tattoo_position)
    .bind(&input.tattoo_size)
    .bind(&input.tattoo_color)
    .bind(&input.consent_notes)
    .bind(input.order_type())
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    apply_status_effect(&state.db, artwork_id, input.status).await?;
    if let Some(previous) = existing.as_ref().and_then(Appointment::linked_artwork) {
        if Some(previous) != artwork_id {
            release_artwork(&state.db, previous).await?;
        }
    }

    let (kind, message) = match (&existing, admin_override) {
        (Some(previous), true) => (
            "appointment_override",
            format!(
                "{} moved appointment {id} from {} to {} by override.",
                caller.label(),
                previous.status,
                input.status
            ),
        ),
        (Some(_), false) => (
            "appointment_updated",
            format!("{} updated appointment {id} ({}).", caller.label(), input.status),
        ),
        (None, _) => (
            "appointment_created",
            format!("{} booked appointment {id} ({}).", caller.label(), input.status),
        ),
    };
    log_activity(&state.db, kind, &message, actor_id(caller), Some(&id)).await;

    Ok(success())
}

/// Delete and cancel share one path: the row goes away and its artwork is freed.
pub async fn remove_appointment(
    state: &AppState,
    caller: &Caller,
    action: Action,
    input: IdInput,
) -> StudioResult<HttpResponse> {
    let id = required(Some(input.id.as_str()), "appointment ID")?;
    let appointment = require_appointment(state, id).await?;
    if action == Action::CancelAppointment {
        authorize_owner(caller, appointment.user_id.as_deref())?;
    }

    sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if let Some(artwork_id) = appointment.linked_artwork() {
        release_artwork(&state.db, artwork_id).await?;
    }

    let verb = if action == Action::CancelAppointment {
        "cancelled"
    } else {
        "deleted"
    };
    log_activity(
        &state.db,
        &format!("appointment_{verb}"),
        &format!("{} {verb} appointment {id}.", caller.label()),
        actor_id(caller),
        Some(id),
    )
    .await;

    Ok(success())
}

async fn run_step(
    state: &AppState,
    caller: &Caller,
    step: WorkflowStep,
    id: &str,
    deposit_paid: Option<i64>,
) -> StudioResult<HttpResponse> {
    let appointment = require_appointment(state, id).await?;
    let next = step.apply(&appointment)?;

    sqlx::query("UPDATE appointments SET status = ?, deposit_paid = COALESCE(?, deposit_paid) WHERE id = ?")
        .bind(next)
        .bind(deposit_paid)
        .bind(id)
        .execute(&state.db)
        .await?;
    apply_status_effect(&state.db, appointment.linked_artwork(), next).await?;

    log_activity(
        &state.db,
        step.activity_kind(),
        &format!("{} moved appointment {id} to {next}.", caller.label()),
        actor_id(caller),
        Some(id),
    )
    .await;

    let updated = require_appointment(state, id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn confirm_deposit(
    state: &AppState,
    caller: &Caller,
    input: DepositInput,
) -> StudioResult<HttpResponse> {
    let id = required(Some(input.id.as_str()), "appointment ID")?;
    let deposit_paid = input
        .deposit_paid
        .filter(|amount| *amount > 0)
        .ok_or(StudioError::MissingField("depositPaid"))?;
    run_step(state, caller, WorkflowStep::ConfirmDeposit, id, Some(deposit_paid)).await
}

pub async fn advance(
    state: &AppState,
    caller: &Caller,
    action: Action,
    input: IdInput,
) -> StudioResult<HttpResponse> {
    let step = match action {
        Action::ConfirmPayment => WorkflowStep::ConfirmPayment,
        Action::ConfirmBooking => WorkflowStep::ConfirmBooking,
        Action::CompleteAppointment => WorkflowStep::Complete,
        other => return Err(StudioError::InvalidAction(other.to_string())),
    };
    let id = required(Some(input.id.as_str()), "appointment ID")?;
    run_step(state, caller, step, id, None).await
}

pub async fn create_custom_order(
    state: &AppState,
    caller: &Caller,
    input: CustomOrderInput,
) -> StudioResult<HttpResponse> {
    let user_id = required(Some(input.user_id.as_str()), "user ID")?;
    let customer = fetch_user(state, user_id)
        .await?
        .map(User::from)
        .ok_or(StudioError::NotFound("User"))?;
    let order = new_custom_order(&input, &customer)?;

    sqlx::query(
        r#"INSERT INTO appointments
               (id, date, time_slot, user_id, customer_name, phone_number, status, notes,
                artwork_title, total_price, deposit_paid, order_type, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&order.id)
    .bind(&order.date)
    .bind(&order.time_slot)
    .bind(&order.user_id)
    .bind(&order.customer_name)
    .bind(&order.phone_number)
    .bind(order.status)
    .bind(&order.notes)
    .bind(&order.artwork_title)
    .bind(order.total_price)
    .bind(order.deposit_paid)
    .bind(order.order_type)
    .bind(&order.created_at)
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "custom_order_created",
        &format!("{} opened custom order {} for {}.", caller.label(), order.id, customer.name),
        actor_id(caller),
        Some(&order.id),
    )
    .await;

    Ok(HttpResponse::Ok().json(order))
}

pub async fn deposit_message(state: &AppState, id: Option<&str>) -> StudioResult<HttpResponse> {
    let appointment = require_appointment(state, required(id, "appointment ID")?).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": workflow::deposit_message(&appointment) })))
}

pub async fn consent_message(
    state: &AppState,
    id: Option<&str>,
    origin: &str,
) -> StudioResult<HttpResponse> {
    let appointment = require_appointment(state, required(id, "appointment ID")?).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": workflow::consent_message(&appointment, origin),
        "link": workflow::consent_link(&appointment, origin),
    })))
}
