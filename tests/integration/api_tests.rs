//! API integration tests

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::task::JoinSet;
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";
const SCIENCE_FICTION: &str = "6f1d3b52-8c1e-4c43-9a51-0d3c5c1e0a01";

async fn login(client: &Client, username: &str, password: &str) -> Value {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    assert!(response.status().is_success(), "login failed for {username}");
    response.json().await.expect("Failed to parse login response")
}

async fn admin_token(client: &Client) -> String {
    let body = login(client, "admin", "admin").await;
    body["access_token"].as_str().expect("No token in response").to_string()
}

/// Register a fresh reader and return its username (password "secret")
async fn register_reader(client: &Client) -> String {
    let username = format!("reader-{}", Uuid::new_v4().simple());
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Test Reader",
            "username": username,
            "email": format!("{username}@example.com"),
            "phone_number": "0600000000",
            "address": "1 Library Street",
            "password": "secret",
            "confirm_password": "secret"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);
    username
}

async fn reader_token(client: &Client) -> String {
    let username = register_reader(client).await;
    let body = login(client, &username, "secret").await;
    body["access_token"].as_str().expect("No token in response").to_string()
}

async fn create_book(client: &Client, admin: &str, quantity: i32) -> String {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "title": format!("Book {}", Uuid::new_v4().simple()),
            "author": "Integration",
            "publish_date": "2001-01-01",
            "isbn": "9780000000000",
            "quantity": quantity,
            "available_quantity": quantity,
            "category_id": SCIENCE_FICTION
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_str().expect("No book id").to_string()
}

async fn available(client: &Client, book_id: &str) -> i64 {
    let body: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["available_quantity"].as_i64().expect("No availability")
}

async fn borrow(client: &Client, token: &str, book_ids: &[&str]) -> reqwest::Response {
    client
        .post(format!("{}/book-borrowing", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_ids": book_ids }))
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_refresh_token_is_single_use() {
    let client = Client::new();
    let username = register_reader(&client).await;
    let tokens = login(&client, &username, "secret").await;
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let first = client
        .post(format!("{}/auth/refresh-token", BASE_URL))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert!(first.status().is_success());

    let second = client
        .post(format!("{}/auth/refresh-token", BASE_URL))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_last_copy_and_rejection() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book = create_book(&client, &admin, 1).await;
    let reader = reader_token(&client).await;
    let other = reader_token(&client).await;

    let response = borrow(&client, &reader, &[&book]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let request: Value = response.json().await.unwrap();
    assert_eq!(request["status"], "waiting");
    assert_eq!(available(&client, &book).await, 0);

    let response = borrow(&client, &other, &[&book]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "BookNotAvailable");

    let request_id = request["id"].as_str().unwrap();
    let response = client
        .put(format!("{}/book-borrowing/{}/reject", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(available(&client, &book).await, 1);

    // A decided request stays decided
    let response = client
        .put(format!("{}/book-borrowing/{}/approve", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(
        error["message"],
        "Cannot update status. The borrowing request is already Rejected."
    );
    assert_eq!(available(&client, &book).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_monthly_quota() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book = create_book(&client, &admin, 10).await;
    let reader = reader_token(&client).await;

    for _ in 0..3 {
        let response = borrow(&client, &reader, &[&book]).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = borrow(&client, &reader, &[&book]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "MaxRequestsReached");
    assert_eq!(available(&client, &book).await, 7);

    let count: Value = client
        .get(format!("{}/book-borrowing/monthly-count", BASE_URL))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 3);
    assert_eq!(count["limit"], 3);
}

/// Fire one borrow per token at once; returns the status and `error` field
/// of every response
async fn borrow_concurrently(client: &Client, tokens: Vec<String>, book: &str) -> Vec<(StatusCode, Value)> {
    let mut tasks = JoinSet::new();
    for token in tokens {
        let client = client.clone();
        let book = book.to_string();
        tasks.spawn(async move {
            let response = borrow(&client, &token, &[book.as_str()]).await;
            let status = response.status();
            let body: Value = response.json().await.expect("Failed to parse response");
            (status, body["error"].clone())
        });
    }

    let mut results = Vec::new();
    while let Some(result) = tasks.join_next().await {
        results.push(result.expect("borrow task panicked"));
    }
    results
}

#[tokio::test]
#[ignore]
async fn test_concurrent_readers_share_limited_copies() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let copies = 2;
    let book = create_book(&client, &admin, copies).await;

    let mut readers = Vec::new();
    for _ in 0..8 {
        readers.push(reader_token(&client).await);
    }

    let results = borrow_concurrently(&client, readers, &book).await;

    let accepted = results.iter().filter(|(status, _)| *status == StatusCode::OK).count();
    assert_eq!(accepted, copies as usize);
    for (status, error) in results.iter().filter(|(status, _)| *status != StatusCode::OK) {
        assert_eq!(*status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "BookNotAvailable");
    }
    assert_eq!(available(&client, &book).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_requests_by_one_reader_respect_quota() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book = create_book(&client, &admin, 10).await;
    let reader = reader_token(&client).await;

    let results = borrow_concurrently(&client, vec![reader.clone(); 6], &book).await;

    let accepted = results.iter().filter(|(status, _)| *status == StatusCode::OK).count();
    assert_eq!(accepted, 3);
    for (status, error) in results.iter().filter(|(status, _)| *status != StatusCode::OK) {
        assert_eq!(*status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "MaxRequestsReached");
    }
    assert_eq!(available(&client, &book).await, 7);
}

#[tokio::test]
#[ignore]
async fn test_request_size_limits() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let reader = reader_token(&client).await;

    let response = borrow(&client, &reader, &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "NoBooks");

    let mut books = Vec::new();
    for _ in 0..6 {
        books.push(create_book(&client, &admin, 1).await);
    }
    let ids: Vec<&str> = books.iter().map(String::as_str).collect();
    let response = borrow(&client, &reader, &ids).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "TooManyBooks");
}

#[tokio::test]
#[ignore]
async fn test_reader_cannot_list_all_requests() {
    let client = Client::new();
    let reader = reader_token(&client).await;

    let response = client
        .get(format!("{}/book-borrowing", BASE_URL))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/book-borrowing/my-requests", BASE_URL))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page: Value = response.json().await.unwrap();
    assert_eq!(page["page_index"], 1);
    assert_eq!(page["page_size"], 10);
}

#[tokio::test]
#[ignore]
async fn test_statistics() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let response = client
        .get(format!("{}/statistics", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert!(body["total_categories"].as_i64().unwrap() >= 5);
}
