use actix_web::{dev::Payload, http::header, http::header::Header, web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Basic};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use futures_util::future::LocalBoxFuture;
use rand_core::OsRng;
use uuid::Uuid;

use crate::{error::StudioError, models::Role, state::AppState};

pub const AUTH_REALM: &str = "InkFlow";
pub const MEMBER_HEADER: &str = "X-Member-Id";

#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub display_name: String,
}

/// Who is calling. Members are identified by the external login provider; the
/// server only checks that the id belongs to a synced member.
#[derive(Clone, Debug, PartialEq)]
pub enum Caller {
    Guest,
    Member(AuthUser),
    Admin(AuthUser),
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin(_))
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Caller::Member(user) | Caller::Admin(user) => Some(user),
            Caller::Guest => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Caller::Guest => "guest".to_string(),
            Caller::Member(user) => format!("member {}", user.id),
            Caller::Admin(user) => user.display_name.clone(),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .and_then(|hash| Argon2::default().verify_password(password.as_bytes(), &hash))
        .is_ok()
}

pub async fn authenticate_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Option<AuthUser> {
    let user = sqlx::query_as::<_, (String, String, String)>(
        r#"SELECT id, name, password_hash
           FROM users
           WHERE username = ? AND role = ? AND password_hash IS NOT NULL
           LIMIT 1"#,
    )
    .bind(username)
    .bind(Role::Admin)
    .fetch_optional(&state.db)
    .await
    .ok()??;

    let (id, display_name, password_hash) = user;
    if !verify_password(password, &password_hash) {
        return None;
    }

    Some(AuthUser { id, display_name })
}

async fn find_member(state: &AppState, member_id: &str) -> Result<Option<AuthUser>, StudioError> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT id, name FROM users WHERE id = ? AND role = ? LIMIT 1",
    )
    .bind(member_id)
    .bind(Role::Member)
    .fetch_optional(&state.db)
    .await?;

    Ok(row.map(|(id, display_name)| AuthUser { id, display_name }))
}

pub async fn resolve_caller(req: &HttpRequest) -> Result<Caller, StudioError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or(StudioError::Unauthorized)?;

    if req.headers().contains_key(header::AUTHORIZATION) {
        let auth = Authorization::<Basic>::parse(req).map_err(|_| StudioError::Unauthorized)?;
        let credentials = auth.into_scheme();
        let username = credentials.user_id();
        let password = credentials.password().unwrap_or_default();
        return authenticate_credentials(state, username, password)
            .await
            .map(Caller::Admin)
            .ok_or(StudioError::Unauthorized);
    }

    let member_id = req
        .headers()
        .get(MEMBER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let Some(member_id) = member_id else {
        return Ok(Caller::Guest);
    };

    match find_member(state, member_id).await? {
        Some(member) => Ok(Caller::Member(member)),
        None => {
            log::debug!("Unknown member id {member_id}, treating caller as guest");
            Ok(Caller::Guest)
        }
    }
}

impl FromRequest for Caller {
    type Error = StudioError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { resolve_caller(&req).await })
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
