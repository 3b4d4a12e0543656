//! REST resources registered with `register_api`.

use std::sync::Arc;

use switchyard::crud::MemoryQueryset;
use switchyard::dispatch::AppSettings;
use switchyard::message::Message;
use switchyard::App;

mod common;
use common::{json_body, send, send_json};

fn todo_app() -> Arc<App> {
    let mut builder = App::builder();
    builder.register_api("todos", MemoryQueryset::new()).unwrap();
    builder.build()
}

#[tokio::test]
async fn test_create_then_read() {
    let app = todo_app();

    let created = send_json(&app, "POST", "/todos/", r#"{"id":"a","title":"milk"}"#).await;
    assert_eq!(created.status.code, 201);
    assert_eq!(created.header("content-type"), Some("application/json"));
    let body = json_body(&created);
    assert_eq!(body["status_code"], 201);
    assert_eq!(body["data"]["title"], "milk");

    let read = send(&app, "GET", "/todos/a").await;
    assert_eq!(read.status.code, 200);
    assert_eq!(json_body(&read)["data"]["id"], "a");

    let all = send(&app, "GET", "/todos/").await;
    assert_eq!(json_body(&all)["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_mixed_batch_is_multistatus() {
    let app = todo_app();
    send_json(&app, "POST", "/todos/", r#"{"id":"a"}"#).await;

    let batch = send_json(&app, "POST", "/todos/", r#"[{"id":"a"},{"id":"b"}]"#).await;
    assert_eq!(batch.status.code, 207);

    let body = json_body(&batch);
    let statuses = body["multistatus"].as_array().unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0]["status"], "Updated");
    assert_eq!(statuses[0]["href"], "/todos/a");
    assert_eq!(statuses[1]["status"], "Created");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_uniform_batch_has_no_multistatus() {
    let app = todo_app();
    let batch = send_json(&app, "POST", "/todos/", r#"[{"id":"a"},{"id":"b"}]"#).await;
    assert_eq!(batch.status.code, 201);
    assert!(json_body(&batch).get("multistatus").is_none());
}

#[tokio::test]
async fn test_destroy_unknown_id_is_not_found() {
    let app = todo_app();
    let response = send(&app, "DELETE", "/todos/nope").await;
    assert_eq!(response.status.code, 404);
}

#[tokio::test]
async fn test_destroy_existing() {
    let app = todo_app();
    send_json(&app, "POST", "/todos/", r#"[{"id":"a"},{"id":"b"}]"#).await;

    let response = send(&app, "DELETE", "/todos/a,b").await;
    assert_eq!(response.status.code, 200);
    assert_eq!(json_body(&send(&app, "GET", "/todos/").await)["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_bad_requests() {
    let app = todo_app();

    let malformed = send_json(&app, "POST", "/todos/", "{not json").await;
    assert_eq!(malformed.status.code, 400);

    let scalar = send_json(&app, "POST", "/todos/", "42").await;
    assert_eq!(scalar.status.code, 400);

    let no_ids = send_json(&app, "PUT", "/todos/", r#"{"id":"a"}"#).await;
    assert_eq!(no_ids.status.code, 400);

    let mismatch = send_json(&app, "PUT", "/todos/b", r#"{"id":"a"}"#).await;
    assert_eq!(mismatch.status.code, 400);
}

#[tokio::test]
async fn test_form_encoded_data_argument() {
    let app = todo_app();
    let message = Message::builder("POST", "/todos/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("data=%7B%22id%22%3A%22f%22%7D")
        .build();
    let response = app.handle(message).await;
    assert_eq!(response.status.code, 201);
}

#[tokio::test]
async fn test_api_base_url_prefix() {
    let mut builder = App::builder();
    builder.settings(AppSettings {
        api_base_url: "/api/".into(),
        ..AppSettings::default()
    });
    builder.register_api("todos", MemoryQueryset::new()).unwrap();
    let app = builder.build();

    assert_eq!(send(&app, "GET", "/api/todos/").await.status.code, 200);
    assert_eq!(send(&app, "GET", "/todos/").await.status.code, 404);
}
