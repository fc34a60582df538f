#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};

use common::{admin_header, api_get, api_post, member_header, test_state};

fn artwork(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "Fine line piece",
        "imageUrl": format!("/uploads/{id}.jpg"),
        "category": "Flower",
        "status": "CLAIMED",
        "price": 3500,
        "specialPrice": 0,
        "tags": ["rose", " fine line "],
        "createdAt": "2026-10-01T10:00:00Z",
    })
}

fn find<'a>(artworks: &'a Value, id: &str) -> &'a Value {
    artworks
        .as_array()
        .unwrap()
        .iter()
        .find(|artwork| artwork["id"] == id)
        .unwrap()
}

#[actix_web::test]
async fn booking_claims_and_cancelling_releases_artwork() {
    let state = test_state().await;
    let app = spawn_app!(state);

    let resp = test::call_service(
        &app,
        api_post("saveArtwork", artwork("a1", "Rose"))
            .insert_header(admin_header())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let artworks: Value =
        test::call_and_read_body_json(&app, api_get("getArtworks").to_request()).await;
    let a1 = find(&artworks, "a1");
    assert_eq!(a1["status"], "AVAILABLE");
    assert_eq!(a1["tags"], json!(["rose", "fine line"]));
    assert_eq!(a1["specialPrice"], Value::Null);

    let _: Value = test::call_and_read_body_json(
        &app,
        api_post("syncUser", json!({ "id": "u1", "name": "Mei" })).to_request(),
    )
    .await;
    let resp = test::call_service(
        &app,
        api_post(
            "saveAppointment",
            json!({
                "id": "p1",
                "date": "2026-11-02",
                "timeSlot": "14:00",
                "userId": "u1",
                "customerName": "Mei",
                "status": "PENDING",
                "artworkId": "a1",
                "artworkTitle": "Rose",
            }),
        )
        .insert_header(member_header("u1"))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let artworks: Value =
        test::call_and_read_body_json(&app, api_get("getArtworks").to_request()).await;
    assert_eq!(find(&artworks, "a1")["status"], "CLAIMED");

    let resp = test::call_service(
        &app,
        api_post("cancelAppointment", json!({ "id": "p1" }))
            .insert_header(member_header("u1"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let artworks: Value =
        test::call_and_read_body_json(&app, api_get("getArtworks").to_request()).await;
    assert_eq!(find(&artworks, "a1")["status"], "AVAILABLE");
}

#[actix_web::test]
async fn listing_heals_drifted_status() {
    let state = test_state().await;
    let app = spawn_app!(state);

    sqlx::query(
        "INSERT INTO artworks (id, title, status, created_at) VALUES ('a7', 'Koi', 'CLAIMED', '2026-10-01')",
    )
    .execute(&state.db)
    .await
    .unwrap();

    let artworks: Value =
        test::call_and_read_body_json(&app, api_get("getArtworks").to_request()).await;
    assert_eq!(find(&artworks, "a7")["status"], "AVAILABLE");

    let stored = sqlx::query_scalar::<_, String>("SELECT status FROM artworks WHERE id = 'a7'")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(stored, "AVAILABLE");
}

#[actix_web::test]
async fn views_are_counted() {
    let state = test_state().await;
    let app = spawn_app!(state);
    test::call_service(
        &app,
        api_post("saveArtwork", artwork("a2", "Wolf"))
            .insert_header(admin_header())
            .to_request(),
    )
    .await;

    for expected in 1..=2 {
        let body: Value = test::call_and_read_body_json(
            &app,
            api_post("recordView", json!({ "id": "a2" })).to_request(),
        )
        .await;
        assert_eq!(body, json!({ "success": true, "viewCount": expected }));
    }

    let resp = test::call_service(&app, api_post("recordView", json!({})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing artwork ID");
}

#[actix_web::test]
async fn categories_round_trip() {
    let state = test_state().await;
    let app = spawn_app!(state);

    let categories: Vec<String> =
        test::call_and_read_body_json(&app, api_get("getCategories").to_request()).await;
    assert_eq!(categories, ["Flower", "Animal", "Geometry", "Line Work", "Traditional"]);

    let categories: Vec<String> = test::call_and_read_body_json(
        &app,
        api_post("addCategory", json!({ "name": "Blackwork" }))
            .insert_header(admin_header())
            .to_request(),
    )
    .await;
    assert_eq!(categories.last().map(String::as_str), Some("Blackwork"));

    sqlx::query("DELETE FROM categories")
        .execute(&state.db)
        .await
        .unwrap();
    let categories: Vec<String> =
        test::call_and_read_body_json(&app, api_get("getCategories").to_request()).await;
    assert_eq!(categories, ["All"]);
}

#[actix_web::test]
async fn aftercare_is_a_singleton() {
    let state = test_state().await;
    let app = spawn_app!(state);

    let body: Value = test::call_and_read_body_json(&app, api_get("getAftercare").to_request()).await;
    assert_eq!(body, json!({ "content": "" }));

    for content in ["Keep it clean.", "Keep it clean and moisturised."] {
        let resp = test::call_service(
            &app,
            api_post("saveAftercare", json!({ "content": content }))
                .insert_header(admin_header())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let body: Value = test::call_and_read_body_json(&app, api_get("getAftercare").to_request()).await;
    assert_eq!(body["content"], "Keep it clean and moisturised.");
}

#[actix_web::test]
async fn dispatch_rejects_bad_requests() {
    let state = test_state().await;
    let app = spawn_app!(state);

    let resp = test::call_service(&app, api_get("recordView").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Method not allowed");

    let resp = test::call_service(&app, api_get("dropTables").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid action: dropTables");

    let resp = test::call_service(
        &app,
        test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/api?action=saveArtwork")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[actix_web::test]
async fn admin_actions_are_guarded() {
    let state = test_state().await;
    let app = spawn_app!(state);
    let _: Value = test::call_and_read_body_json(
        &app,
        api_post("syncUser", json!({ "id": "u1", "name": "Mei" })).to_request(),
    )
    .await;

    let resp = test::call_service(&app, api_post("saveArtwork", artwork("a3", "Moth")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key("www-authenticate"));

    let resp = test::call_service(
        &app,
        api_post("saveArtwork", artwork("a3", "Moth"))
            .insert_header(member_header("u1"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        api_post("saveArtwork", artwork("a3", "Moth"))
            .insert_header(("Authorization", "Basic YWRtaW46d3Jvbmc="))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
