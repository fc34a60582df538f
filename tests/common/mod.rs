#![allow(dead_code)]

use std::io::Cursor;

use actix_web::{
    http::header::{self, HeaderValue},
    test::TestRequest,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::Value;

use inkflow::{
    auth::MEMBER_HEADER,
    db,
    state::{AppState, StudioConfig},
    upload::encode_data_url,
};

pub const ADMIN_PASSWORD: &str = "ink-test-secret";

#[allow(unused_macros)]
macro_rules! spawn_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(inkflow::cors_headers())
                .configure(inkflow::configure($state.clone())),
        )
        .await
    };
}

pub async fn test_state() -> AppState {
    test_state_with(StudioConfig::default()).await
}

pub async fn test_state_with(config: StudioConfig) -> AppState {
    let config = StudioConfig {
        admin_password: ADMIN_PASSWORD.to_string(),
        ..config
    };
    let pool = db::connect("sqlite::memory:", 1).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    db::seed_defaults(&pool, &config).await.unwrap();
    AppState { db: pool, config }
}

pub fn admin_header() -> (header::HeaderName, HeaderValue) {
    let token = STANDARD.encode(format!("admin:{ADMIN_PASSWORD}"));
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Basic {token}")).unwrap(),
    )
}

pub fn member_header(id: &str) -> (&'static str, String) {
    (MEMBER_HEADER, id.to_string())
}

pub fn api_get(action: &str) -> TestRequest {
    TestRequest::get().uri(&format!("/api?action={action}"))
}

pub fn api_post(action: &str, body: Value) -> TestRequest {
    TestRequest::post()
        .uri(&format!("/api?action={action}"))
        .set_json(body)
}

pub fn png_data_url(width: u32, height: u32, color: [u8; 4]) -> String {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    encode_data_url("image/png", &bytes)
}

pub fn signature(ink: bool) -> String {
    let mut canvas = RgbaImage::from_pixel(80, 30, Rgba([255, 255, 255, 255]));
    if ink {
        for x in 10..60 {
            canvas.put_pixel(x, 15, Rgba([20, 20, 20, 255]));
        }
    }
    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    encode_data_url("image/png", &bytes)
}
