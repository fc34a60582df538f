use actix_web::{http::header, http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::{auth::AUTH_REALM, consent::ConsentError, models::AppointmentStatus, upload::UploadError};

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot move appointment from {from} to {to}")]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Artwork {0} is already claimed by another appointment")]
    ArtworkUnavailable(String),

    #[error(transparent)]
    Consent(#[from] ConsentError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Preview failed: {0}")]
    Preview(String),

    #[error("Image worker failed: {0}")]
    Worker(#[from] actix_web::error::BlockingError),

    #[error("{0}")]
    Validation(String),
}

pub type StudioResult<T> = Result<T, StudioError>;

impl ResponseError for StudioError {
    fn status_code(&self) -> StatusCode {
        match self {
            StudioError::Unauthorized => StatusCode::UNAUTHORIZED,
            StudioError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            StudioError::Database(err) => log::error!("Database failure: {err}"),
            StudioError::Worker(err) => log::error!("Blocking image task failed: {err}"),
            _ => {}
        }
        let mut builder = HttpResponse::build(self.status_code());
        if matches!(self, StudioError::Unauthorized) {
            builder.insert_header((
                header::WWW_AUTHENTICATE,
                format!("Basic realm=\"{}\"", AUTH_REALM),
            ));
        }
        builder.json(json!({ "error": self.to_string() }))
    }
}
