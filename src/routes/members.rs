use std::collections::BTreeMap;

use actix_web::HttpResponse;
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::Caller,
    error::{StudioError, StudioResult},
    models::{parse_favorites, CustomerSummary, Role, User, UserRow, UserSyncInput, USER_COLUMNS},
    policy::authorize_owner,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteInput {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub artwork_id: String,
}

pub async fn fetch_user(state: &AppState, user_id: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? LIMIT 1"))
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
}

/// Upserts a member coming back from the login provider. Stored favorites win
/// over whatever the client cached.
pub async fn sync_user(state: &AppState, input: UserSyncInput) -> StudioResult<HttpResponse> {
    let id = input.id.trim();
    if id.is_empty() {
        return Err(StudioError::MissingField("user ID"));
    }
    let name = input.name.trim();
    let now = Utc::now().to_rfc3339();

    match fetch_user(state, id).await? {
        Some(existing) if existing.role == Role::Admin => {
            return Err(StudioError::Forbidden(
                "studio accounts cannot be synced".to_string(),
            ));
        }
        Some(_) => {
            sqlx::query(
                r#"UPDATE users
                   SET name = ?, avatar_url = ?, phone_number = COALESCE(?, phone_number), last_login = ?
                   WHERE id = ?"#,
            )
            .bind(name)
            .bind(&input.avatar_url)
            .bind(&input.phone_number)
            .bind(&now)
            .bind(id)
            .execute(&state.db)
            .await?;
        }
        None => {
            let favorites = serde_json::to_string(&input.favorites.clone().unwrap_or_default())?;
            sqlx::query(
                r#"INSERT INTO users (id, name, avatar_url, role, favorites, phone_number, last_login, created_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(id)
            .bind(name)
            .bind(&input.avatar_url)
            .bind(Role::Member)
            .bind(favorites)
            .bind(&input.phone_number)
            .bind(&now)
            .bind(&now)
            .execute(&state.db)
            .await?;
            log::info!("New member {id} synced");
        }
    }

    let user = fetch_user(state, id)
        .await?
        .map(User::from)
        .ok_or(StudioError::NotFound("User"))?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn get_all_users(state: &AppState) -> StudioResult<HttpResponse> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role != ? ORDER BY id DESC"
    ))
    .bind(Role::Admin)
    .fetch_all(&state.db)
    .await?;

    let customers: Vec<CustomerSummary> = rows
        .into_iter()
        .map(|row| {
            let user = User::from(row);
            CustomerSummary {
                favorite_count: user.favorites.len(),
                user,
            }
        })
        .collect();
    Ok(HttpResponse::Ok().json(customers))
}

/// Adds `artwork_id` when absent, removes it when present.
pub fn toggle(mut favorites: Vec<String>, artwork_id: &str) -> Vec<String> {
    if let Some(position) = favorites.iter().position(|id| id == artwork_id) {
        favorites.remove(position);
    } else {
        favorites.push(artwork_id.to_string());
    }
    favorites
}

pub async fn toggle_favorite(
    state: &AppState,
    caller: &Caller,
    input: FavoriteInput,
) -> StudioResult<HttpResponse> {
    let user_id = input.user_id.trim();
    let artwork_id = input.artwork_id.trim();
    if user_id.is_empty() {
        return Err(StudioError::MissingField("user ID"));
    }
    if artwork_id.is_empty() {
        return Err(StudioError::MissingField("artwork ID"));
    }
    authorize_owner(caller, Some(user_id))?;

    let user = fetch_user(state, user_id)
        .await?
        .ok_or(StudioError::NotFound("User"))?;
    let favorites = toggle(user.favorite_ids(), artwork_id);

    sqlx::query("UPDATE users SET favorites = ? WHERE id = ?")
        .bind(serde_json::to_string(&favorites)?)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    Ok(HttpResponse::Ok().json(favorites))
}

pub fn favorite_counts<'a>(lists: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for raw in lists {
        for artwork_id in parse_favorites(raw) {
            *counts.entry(artwork_id).or_insert(0) += 1;
        }
    }
    counts
}

pub async fn get_artwork_stats(state: &AppState) -> StudioResult<HttpResponse> {
    let lists = sqlx::query_scalar::<_, String>("SELECT favorites FROM users")
        .fetch_all(&state.db)
        .await?;
    let counts = favorite_counts(lists.iter().map(String::as_str));
    Ok(HttpResponse::Ok().json(counts))
}
