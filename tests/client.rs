mod common;

use actix_web::{App, HttpServer};

use inkflow::{
    client::{StudioClient, AFTERCARE_FALLBACK},
    models::{Artwork, ArtworkStatus, User},
    state::AppState,
};

use common::{test_state, ADMIN_PASSWORD};

async fn serve(state: AppState) -> String {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(inkflow::cors_headers())
            .configure(inkflow::configure(state.clone()))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

fn artwork(id: &str) -> Artwork {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": "Swallow",
        "description": "",
        "imageUrl": "/uploads/swallow.jpg",
        "pngUrl": null,
        "category": "Traditional",
        "status": "AVAILABLE",
        "price": 4200,
        "specialPrice": null,
        "createdAt": "2026-10-01T10:00:00Z",
        "tags": ["bird"],
        "viewCount": 0,
    }))
    .unwrap()
}

#[actix_web::test]
async fn client_talks_to_a_live_server() {
    let base_url = serve(test_state().await).await;
    let guest = StudioClient::new(&base_url).unwrap();
    let admin = StudioClient::new(&base_url)
        .unwrap()
        .as_admin("admin", ADMIN_PASSWORD);

    admin.save_artwork(&artwork("a1")).await.unwrap();
    assert!(guest.save_artwork(&artwork("a2")).await.is_err());

    let artworks = guest.get_artworks().await;
    assert_eq!(artworks.len(), 1);
    assert_eq!(artworks[0].status, ArtworkStatus::Available);
    assert_eq!(artworks[0].tags, ["bird"]);

    assert_eq!(guest.record_view("a1").await, Some(1));
    assert_eq!(guest.get_categories().await.len(), 5);

    admin.save_aftercare("Wash twice a day.").await.unwrap();
    assert_eq!(guest.get_aftercare().await, "Wash twice a day.");

    let local = User {
        id: "u1".into(),
        name: "Mei".into(),
        favorites: vec!["a1".into()],
        ..User::default()
    };
    let synced = guest.sync_user(&local).await;
    assert_eq!(synced.favorites, ["a1"]);

    let member = StudioClient::new(&base_url).unwrap().as_member("u1");
    assert_eq!(member.toggle_favorite("u1", "a1").await.unwrap(), Vec::<String>::new());
    assert!(admin.get_all_users().await.iter().any(|c| c.user.id == "u1"));
}

#[actix_web::test]
async fn client_falls_back_when_the_server_is_gone() {
    let client = StudioClient::new("http://127.0.0.1:9").unwrap();

    assert!(client.get_artworks().await.is_empty());
    assert_eq!(client.get_categories().await[0], "All");
    assert_eq!(client.get_aftercare().await, AFTERCARE_FALLBACK);
    assert_eq!(client.record_view("a1").await, None);

    let local = User {
        id: "u1".into(),
        name: "Offline".into(),
        ..User::default()
    };
    assert_eq!(client.sync_user(&local).await, local);
}
