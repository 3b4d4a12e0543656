//! The server loop over the in-memory transport.

use std::collections::HashMap;
use std::time::Duration;

use switchyard::message::Message;
use switchyard::server::{Server, Shutdown, TaskPool};
use switchyard::transport::channel;
use switchyard::App;

mod common;
use common::{Greet, Sleepy};

fn app() -> std::sync::Arc<App> {
    let mut builder = App::builder();
    builder
        .add_handler(r"^/greet/(?P<name>\w+)$", Greet::new)
        .unwrap()
        .add_handler(r"^/sleep$", Sleepy::new)
        .unwrap();
    builder.build()
}

#[tokio::test]
async fn test_every_message_gets_one_reply() {
    let (transport, mut client) = channel(16);
    let server = tokio::spawn(Server::new(app(), transport, TaskPool::new(8)).run());

    let mut expected = HashMap::new();
    for (verb, path, status) in [
        ("GET", "/greet/Ada", 200),
        ("POST", "/greet/Ada", 405),
        ("GET", "/nowhere", 404),
        ("GET", "/sleep", 400),
    ] {
        let id = client.send(Message::builder(verb, path).build()).await.unwrap();
        expected.insert(id, status);
    }

    for _ in 0..expected.len() {
        let reply = client.recv().await.unwrap();
        let status = expected.remove(&reply.message_id).unwrap();
        assert_eq!(reply.response.status.code, status);
    }
    assert!(expected.is_empty());

    client.close();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_replies_complete_out_of_order() {
    let (transport, mut client) = channel(16);
    let server = tokio::spawn(Server::new(app(), transport, TaskPool::new(4)).run());

    let slow = client
        .send(Message::builder("GET", "/sleep").query("ms=200").build())
        .await
        .unwrap();
    let fast = client
        .send(Message::builder("GET", "/sleep").query("ms=1").build())
        .await
        .unwrap();

    let first = client.recv().await.unwrap();
    let second = client.recv().await.unwrap();
    assert_eq!(first.message_id, fast);
    assert_eq!(first.response.body_text(), "1");
    assert_eq!(second.message_id, slow);

    client.close();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_disconnect_notifications_are_ignored() {
    let (transport, mut client) = channel(4);
    let server = tokio::spawn(Server::new(app(), transport, TaskPool::new(2)).run());

    client
        .send(
            Message::builder("JSON", "@*")
                .body(r#"{"type":"disconnect"}"#)
                .build(),
        )
        .await
        .unwrap();
    let id = client
        .send(Message::builder("GET", "/greet/Bo").build())
        .await
        .unwrap();

    let reply = client.recv().await.unwrap();
    assert_eq!(reply.message_id, id);

    client.close();
    server.await.unwrap().unwrap();
    assert!(client.recv().await.is_none());
}

#[tokio::test]
async fn test_shutdown_stops_the_loop() {
    let (transport, _client) = channel(4);
    let shutdown = Shutdown::new();
    let server = tokio::spawn(
        Server::new(app(), transport, TaskPool::new(2))
            .with_shutdown(shutdown.clone())
            .run(),
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server loop did not stop")
        .unwrap()
        .unwrap();
}
