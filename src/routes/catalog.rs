use actix_web::HttpResponse;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::Caller,
    db::log_activity,
    error::{StudioError, StudioResult},
    models::{join_tags, ArtworkInput},
    reconcile::{derived_status, reconcile_artworks},
    state::AppState,
};

use super::api::{success, IdInput};

#[derive(Debug, Deserialize)]
pub struct NameInput {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentInput {
    #[serde(default)]
    pub content: String,
}

pub async fn get_artworks(state: &AppState) -> StudioResult<HttpResponse> {
    let artworks = reconcile_artworks(&state.db).await?;
    Ok(HttpResponse::Ok().json(artworks))
}

pub async fn save_artwork(
    state: &AppState,
    caller: &Caller,
    input: ArtworkInput,
) -> StudioResult<HttpResponse> {
    let id = input.id.trim();
    if id.is_empty() {
        return Err(StudioError::MissingField("artwork ID"));
    }
    if input.title.trim().is_empty() {
        return Err(StudioError::MissingField("title"));
    }

    let status = derived_status(&state.db, id).await?;
    if input.status.is_some_and(|requested| requested != status) {
        log::debug!("Ignoring requested status for artwork {id}; links say {status:?}");
    }
    let created_at = input
        .created_at
        .clone()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    sqlx::query(
        r#"INSERT INTO artworks
               (id, title, description, image_url, png_url, category, status, price, special_price, tags, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
               title = excluded.title,
               description = excluded.description,
               image_url = excluded.image_url,
               png_url = excluded.png_url,
               category = excluded.category,
               status = excluded.status,
               price = excluded.price,
               special_price = excluded.special_price,
               tags = excluded.tags"#,
    )
    .bind(id)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(&input.image_url)
    .bind(input.png_url.as_deref().filter(|url| !url.is_empty()))
    .bind(&input.category)
    .bind(status)
    .bind(input.price)
    .bind(input.special_price.filter(|price| *price != 0))
    .bind(join_tags(&input.tags))
    .bind(created_at)
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "artwork_saved",
        &format!("{} saved artwork {}.", caller.label(), input.title.trim()),
        caller.user().map(|user| user.id.as_str()),
        None,
    )
    .await;

    Ok(success())
}

pub async fn delete_artwork(
    state: &AppState,
    caller: &Caller,
    input: IdInput,
) -> StudioResult<HttpResponse> {
    let id = input.id.trim();
    if id.is_empty() {
        return Err(StudioError::MissingField("artwork ID"));
    }

    sqlx::query("DELETE FROM artworks WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    log_activity(
        &state.db,
        "artwork_deleted",
        &format!("{} deleted artwork {id}.", caller.label()),
        caller.user().map(|user| user.id.as_str()),
        None,
    )
    .await;

    Ok(success())
}

pub async fn record_view(state: &AppState, input: IdInput) -> StudioResult<HttpResponse> {
    let id = input.id.trim();
    if id.is_empty() {
        return Err(StudioError::MissingField("artwork ID"));
    }

    sqlx::query("UPDATE artworks SET view_count = COALESCE(view_count, 0) + 1 WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    let view_count = sqlx::query_scalar::<_, i64>("SELECT view_count FROM artworks WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .unwrap_or(0);

    Ok(HttpResponse::Ok().json(json!({ "success": true, "viewCount": view_count })))
}

async fn category_names(state: &AppState) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT name FROM categories ORDER BY rowid")
        .fetch_all(&state.db)
        .await
}

pub async fn get_categories(state: &AppState) -> StudioResult<HttpResponse> {
    let mut names = category_names(state).await?;
    if names.is_empty() {
        names.push("All".to_string());
    }
    Ok(HttpResponse::Ok().json(names))
}

pub async fn add_category(state: &AppState, input: NameInput) -> StudioResult<HttpResponse> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(StudioError::MissingField("category name"));
    }

    sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES (?)")
        .bind(name)
        .execute(&state.db)
        .await?;

    Ok(HttpResponse::Ok().json(category_names(state).await?))
}

pub async fn delete_category(state: &AppState, input: NameInput) -> StudioResult<HttpResponse> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(StudioError::MissingField("category name"));
    }

    sqlx::query("DELETE FROM categories WHERE name = ?")
        .bind(name)
        .execute(&state.db)
        .await?;

    Ok(HttpResponse::Ok().json(category_names(state).await?))
}

pub async fn get_aftercare(state: &AppState) -> StudioResult<HttpResponse> {
    let content = sqlx::query_scalar::<_, String>("SELECT content FROM aftercare WHERE id = 1")
        .fetch_optional(&state.db)
        .await?
        .unwrap_or_default();
    Ok(HttpResponse::Ok().json(json!({ "content": content })))
}

pub async fn save_aftercare(
    state: &AppState,
    caller: &Caller,
    input: ContentInput,
) -> StudioResult<HttpResponse> {
    sqlx::query(
        r#"INSERT INTO aftercare (id, content) VALUES (1, ?)
           ON CONFLICT(id) DO UPDATE SET content = excluded.content"#,
    )
    .bind(&input.content)
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "aftercare_saved",
        &format!("{} updated the aftercare guide.", caller.label()),
        caller.user().map(|user| user.id.as_str()),
        None,
    )
    .await;

    Ok(success())
}
