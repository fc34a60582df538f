use std::{env, path::PathBuf};

use sqlx::SqlitePool;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: StudioConfig,
}

#[derive(Clone, Debug)]
pub struct StudioConfig {
    pub database_url: String,
    pub port: u16,
    pub admin_user: String,
    pub admin_password: String,
    pub admin_display_name: String,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl StudioConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/inkflow.db".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(8080),
            admin_user: env::var("ADMIN_USER").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string()),
            admin_display_name: env::var("ADMIN_DISPLAY_NAME")
                .unwrap_or_else(|_| "Studio Admin".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/uploads")),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./static")),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    pub fn uses_default_password(&self) -> bool {
        self.admin_password == "admin"
    }

    pub fn serves_frontend(&self) -> bool {
        self.static_dir.join("index.html").is_file()
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 8080,
            admin_user: "admin".to_string(),
            admin_password: "admin".to_string(),
            admin_display_name: "Studio Admin".to_string(),
            upload_dir: PathBuf::from("./data/uploads"),
            static_dir: PathBuf::from("./static"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
