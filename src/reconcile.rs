//! Artwork availability is derived data: an artwork is claimed exactly when an
//! appointment in an active status links to it.
//!
//! The listing path recomputes the whole map and writes back only rows whose stored
//! status drifted, so the `artworks.status` column behaves like a materialised view.
//! Save-time side effects keep it current between listings; a crash between the two
//! writes is healed by the next listing.

use std::collections::{HashMap, HashSet};

use sqlx::SqlitePool;

use crate::models::{AppointmentStatus, Artwork, ArtworkRow, ArtworkStatus};

/// Statuses that hold an artwork. Used by the listing and by save-time effects alike.
pub const ACTIVE_STATUSES: [AppointmentStatus; 5] = [
    AppointmentStatus::Pending,
    AppointmentStatus::WaitingPayment,
    AppointmentStatus::Signing,
    AppointmentStatus::Signed,
    AppointmentStatus::Booked,
];

pub fn holds_artwork(status: AppointmentStatus) -> bool {
    ACTIVE_STATUSES.contains(&status)
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ArtworkLink {
    pub artwork_id: String,
    pub status: AppointmentStatus,
}

pub fn compute_status<'a>(
    artwork_ids: impl IntoIterator<Item = &'a str>,
    links: &[ArtworkLink],
) -> HashMap<String, ArtworkStatus> {
    let claimed: HashSet<&str> = links
        .iter()
        .filter(|link| holds_artwork(link.status))
        .map(|link| link.artwork_id.as_str())
        .collect();

    artwork_ids
        .into_iter()
        .map(|id| {
            let status = if claimed.contains(id) {
                ArtworkStatus::Claimed
            } else {
                ArtworkStatus::Available
            };
            (id.to_string(), status)
        })
        .collect()
}

fn active_status_list() -> String {
    ACTIVE_STATUSES
        .iter()
        .map(|status| format!("'{}'", status.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

const ARTWORK_COLUMNS: &str = "id, title, description, image_url, png_url, category, status, price, special_price, tags, created_at, view_count";

pub async fn reconcile_artworks(pool: &SqlitePool) -> Result<Vec<Artwork>, sqlx::Error> {
    let mut rows = sqlx::query_as::<_, ArtworkRow>(&format!(
        "SELECT {ARTWORK_COLUMNS} FROM artworks ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    let links = sqlx::query_as::<_, ArtworkLink>(
        r#"SELECT artwork_id, status FROM appointments
           WHERE artwork_id IS NOT NULL AND artwork_id != ''"#,
    )
    .fetch_all(pool)
    .await?;

    let derived = compute_status(rows.iter().map(|row| row.id.as_str()), &links);

    let mut corrected = 0usize;
    for row in &mut rows {
        let status = derived
            .get(&row.id)
            .copied()
            .unwrap_or(ArtworkStatus::Available);
        if row.status != status {
            sqlx::query("UPDATE artworks SET status = ? WHERE id = ?")
                .bind(status)
                .bind(&row.id)
                .execute(pool)
                .await?;
            row.status = status;
            corrected += 1;
        }
    }

    if corrected > 0 {
        log::info!("Reconciled availability of {corrected} artwork(s)");
    }

    Ok(rows.into_iter().map(Artwork::from).collect())
}

/// Status an artwork should have right now, looked up for one id.
pub async fn derived_status(pool: &SqlitePool, artwork_id: &str) -> Result<ArtworkStatus, sqlx::Error> {
    let holders = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM appointments WHERE artwork_id = ? AND status IN ({})",
        active_status_list()
    ))
    .bind(artwork_id)
    .fetch_one(pool)
    .await?;

    Ok(if holders > 0 {
        ArtworkStatus::Claimed
    } else {
        ArtworkStatus::Available
    })
}

/// Another active appointment already holding `artwork_id`, if any.
pub async fn conflicting_claim(
    pool: &SqlitePool,
    artwork_id: &str,
    appointment_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(&format!(
        "SELECT id FROM appointments WHERE artwork_id = ? AND id != ? AND status IN ({}) LIMIT 1",
        active_status_list()
    ))
    .bind(artwork_id)
    .bind(appointment_id)
    .fetch_optional(pool)
    .await
}

pub async fn set_artwork_status(
    pool: &SqlitePool,
    artwork_id: &str,
    status: ArtworkStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE artworks SET status = ? WHERE id = ?")
        .bind(status)
        .bind(artwork_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Recomputes a single artwork after one of its appointments let go of it.
/// Another active appointment may still hold it.
pub async fn release_artwork(pool: &SqlitePool, artwork_id: &str) -> Result<(), sqlx::Error> {
    let status = derived_status(pool, artwork_id).await?;
    set_artwork_status(pool, artwork_id, status).await
}

/// Forward side effect of saving an appointment in `status` linked to `artwork_id`.
pub async fn apply_status_effect(
    pool: &SqlitePool,
    artwork_id: Option<&str>,
    status: AppointmentStatus,
) -> Result<(), sqlx::Error> {
    match artwork_id {
        Some(artwork_id) if holds_artwork(status) => {
            set_artwork_status(pool, artwork_id, ArtworkStatus::Claimed).await
        }
        Some(artwork_id) => release_artwork(pool, artwork_id).await,
        None => Ok(()),
    }
}
