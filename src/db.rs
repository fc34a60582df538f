use std::{fs, path::Path, str::FromStr};

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    auth::{hash_password, new_id},
    models::{Appointment, Role, APPOINTMENT_COLUMNS, DEFAULT_CATEGORIES},
    state::StudioConfig,
};

pub async fn connect(db_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Creates the directory holding a file-backed SQLite database.
pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let Some(rest) = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };
    let file = rest.split_once('?').map_or(rest, |(file, _)| file);
    let file = file.trim_start_matches("file:");
    if file.is_empty() || file == ":memory:" {
        return Ok(());
    }

    match Path::new(file).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

pub async fn seed_defaults(pool: &SqlitePool, config: &StudioConfig) -> Result<(), sqlx::Error> {
    seed_admin(pool, config).await?;
    seed_catalog(pool).await?;
    Ok(())
}

pub async fn log_activity(
    pool: &SqlitePool,
    kind: &str,
    message: &str,
    user_id: Option<&str>,
    appointment_id: Option<&str>,
) {
    let result = sqlx::query(
        r#"INSERT INTO activities (id, kind, message, created_at, user_id, appointment_id)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(kind)
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .bind(user_id)
    .bind(appointment_id)
    .execute(pool)
    .await;

    if let Err(err) = result {
        log::warn!("Activity log write failed: {err}");
    }
}

pub async fn fetch_appointment(
    pool: &SqlitePool,
    appointment_id: &str,
) -> Result<Option<Appointment>, sqlx::Error> {
    let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ? LIMIT 1");
    sqlx::query_as::<_, Appointment>(&query)
        .bind(appointment_id)
        .fetch_optional(pool)
        .await
}

async fn seed_admin(pool: &SqlitePool, config: &StudioConfig) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>(
        "SELECT id FROM users WHERE role = ? AND password_hash IS NOT NULL LIMIT 1",
    )
    .bind(Role::Admin)
    .fetch_optional(pool)
    .await?;

    if existing.is_some() {
        return Ok(());
    }

    if config.uses_default_password() {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash = hash_password(&config.admin_password)
        .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, name, role, favorites, username, password_hash, created_at)
           VALUES (?, ?, ?, '[]', ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&config.admin_display_name)
    .bind(Role::Admin)
    .bind(&config.admin_user)
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await?;

    log::info!("Seeded admin account '{}'", config.admin_user);
    Ok(())
}

async fn seed_catalog(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let categories = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    if categories == 0 {
        for name in DEFAULT_CATEGORIES {
            sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await?;
        }
    }

    sqlx::query("INSERT OR IGNORE INTO aftercare (id, content) VALUES (1, '')")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_need_no_directory() {
        assert!(ensure_sqlite_dir("sqlite::memory:").is_ok());
        assert!(ensure_sqlite_dir("postgres://localhost/db").is_ok());
    }

    #[test]
    fn file_urls_create_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("inkflow.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        ensure_sqlite_dir(&url).unwrap();
        assert!(dir.path().join("nested").is_dir());
    }

    #[actix_web::test]
    async fn seeding_is_idempotent() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let config = StudioConfig {
            admin_password: "seed-test".into(),
            ..StudioConfig::default()
        };
        seed_defaults(&pool, &config).await.unwrap();
        seed_defaults(&pool, &config).await.unwrap();

        let admins = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'ADMIN'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(admins, 1);
        let categories = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(categories, DEFAULT_CATEGORIES.len() as i64);
    }
}
