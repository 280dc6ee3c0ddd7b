use petition_api::{
    AppConfig, AppState, MemoryPhotoStore, MemoryRepository, PhotoState, RepositoryState,
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

// Tiny but valid-enough payloads; the server never inspects image contents.
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfakepixels";
const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0fakepixels";

pub struct TestApp {
    pub address: String,
    /// Concrete handle onto the photo store, to assert which files exist.
    pub photos: Arc<MemoryPhotoStore>,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let photos = Arc::new(MemoryPhotoStore::new());
    let state = AppState {
        repo,
        photos: photos.clone() as PhotoState,
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, photos }
}

async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    name: &str,
    email: &str,
) -> (i64, String) {
    let response = client
        .post(format!("{address}/api/v1/users/register"))
        .json(&serde_json::json!({ "name": name, "email": email, "password": "hunter22" }))
        .send()
        .await
        .expect("register failed");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{address}/api/v1/users/login"))
        .json(&serde_json::json!({ "email": email, "password": "hunter22" }))
        .send()
        .await
        .expect("login failed");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    (
        body["userId"].as_i64().unwrap(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_avatar_upload_authorization() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let (alice_id, _) =
        register_and_login(&client, &app.address, "Alice", "alice@example.com").await;
    let (_, bob_token) = register_and_login(&client, &app.address, "Bob", "bob@example.com").await;
    let url = format!("{}/api/v1/users/{}/photo", app.address, alice_id);

    // Unknown user resolves before auth.
    let response = client
        .put(format!("{}/api/v1/users/9999/photo", app.address))
        .header("Content-Type", "image/png")
        .body(PNG_BYTES)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // No session.
    let response = client
        .put(&url)
        .header("Content-Type", "image/png")
        .body(PNG_BYTES)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Someone else's session.
    let response = client
        .put(&url)
        .header("X-Authorization", &bob_token)
        .header("Content-Type", "image/png")
        .body(PNG_BYTES)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_avatar_content_type_gate() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let (alice_id, token) =
        register_and_login(&client, &app.address, "Alice", "alice@example.com").await;
    let url = format!("{}/api/v1/users/{}/photo", app.address, alice_id);

    for content_type in ["text/plain", "image/webp", "application/json"] {
        let response = client
            .put(&url)
            .header("X-Authorization", &token)
            .header("Content-Type", content_type)
            .body(PNG_BYTES)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "content type {content_type}");
        let body = response.text().await.unwrap();
        assert!(body.contains("image/jpeg, image/png, image/gif"));
    }

    // Accepted types are matched case-insensitively.
    let response = client
        .put(&url)
        .header("X-Authorization", &token)
        .header("Content-Type", "IMAGE/PNG")
        .body(PNG_BYTES)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_avatar_store_retrieve_replace_delete() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let (alice_id, token) =
        register_and_login(&client, &app.address, "Alice", "alice@example.com").await;
    let url = format!("{}/api/v1/users/{}/photo", app.address, alice_id);

    // No photo yet.
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 404);

    // First upload creates.
    let response = client
        .put(&url)
        .header("X-Authorization", &token)
        .header("Content-Type", "image/png")
        .body(PNG_BYTES)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    assert!(app.photos.contains(&format!("user_{alice_id}.png")));

    // Retrieval serves the bytes back with the stored MIME type.
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.bytes().await.unwrap().as_ref(), PNG_BYTES);

    // Replacing with a different type returns 200 and removes the old file.
    let response = client
        .put(&url)
        .header("X-Authorization", &token)
        .header("Content-Type", "image/jpeg")
        .body(JPEG_BYTES)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(!app.photos.contains(&format!("user_{alice_id}.png")));
    assert!(app.photos.contains(&format!("user_{alice_id}.jpeg")));

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.headers()["content-type"], "image/jpeg");

    // Deletion clears both the row and the file.
    let response = client
        .delete(&url)
        .header("X-Authorization", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(!app.photos.contains(&format!("user_{alice_id}.jpeg")));

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 404);

    // Deleting again: nothing left to delete.
    let response = client
        .delete(&url)
        .header("X-Authorization", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_petition_photo_roundtrip() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, alice_token) =
        register_and_login(&client, &app.address, "Alice", "alice@example.com").await;
    let (_, bob_token) = register_and_login(&client, &app.address, "Bob", "bob@example.com").await;

    let response = client
        .post(format!("{}/api/v1/petitions", app.address))
        .header("X-Authorization", &alice_token)
        .json(&serde_json::json!({
            "title": "More Cycle Lanes", "description": "Safer streets.", "categoryId": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let petition_id = body["petitionId"].as_i64().unwrap();
    let url = format!("{}/api/v1/petitions/{}/photo", app.address, petition_id);

    // Only the author may set the hero image.
    let response = client
        .put(&url)
        .header("X-Authorization", &bob_token)
        .header("Content-Type", "image/png")
        .body(PNG_BYTES)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // No hero image yet.
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client
        .put(&url)
        .header("X-Authorization", &alice_token)
        .header("Content-Type", "image/png")
        .body(PNG_BYTES)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    assert!(app.photos.contains(&format!("petition_{petition_id}.png")));

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.bytes().await.unwrap().as_ref(), PNG_BYTES);

    // Unknown petition.
    let response = client
        .get(format!("{}/api/v1/petitions/999/photo", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
