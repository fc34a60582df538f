pub mod auth;
pub mod client;
pub mod compositor;
pub mod consent;
pub mod db;
pub mod error;
pub mod models;
pub mod policy;
pub mod reconcile;
pub mod routes;
pub mod state;
pub mod upload;
pub mod workflow;

use actix_web::{middleware::DefaultHeaders, web};

use crate::{auth::MEMBER_HEADER, error::StudioError, state::AppState};

/// Registers shared state and every route that does not touch the filesystem.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        // Preview requests carry two base64 images.
        let payload_limit = state.config.max_upload_bytes * 3;
        cfg.app_data(web::Data::new(state))
            .app_data(web::PayloadConfig::new(payload_limit))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                StudioError::Validation(err.to_string()).into()
            }))
            .configure(routes::api::configure)
            .configure(routes::public::configure);
    }
}

pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add((
            "Access-Control-Allow-Headers",
            format!("Content-Type, Authorization, {MEMBER_HEADER}"),
        ))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
}
