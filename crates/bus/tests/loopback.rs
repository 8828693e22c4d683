//! Runs the bus task against a websocket server on the loopback interface.

use std::{future::Future, time::Duration};

use cs_bus::{BusConfig, BusEvent, Message};
use cs_client::Task;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite};
use tokio_util::sync::CancellationToken;

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

async fn bind() -> (TcpListener, BusConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = BusConfig {
        port: listener.local_addr().unwrap().port(),
        reconnect_attempts: 3,
        reconnect_interval_ms: 20,
        ..Default::default()
    };

    (listener, config)
}

fn text(s: &str) -> tungstenite::Message {
    tungstenite::Message::Text(s.to_string().into())
}

#[tokio::test]
async fn delivers_messages_both_ways() {
    let (listener, config) = bind().await;

    let task = cs_bus::create_task(config).unwrap();
    let emitter = task.emitter();
    let events = task.events();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Box::new(task).run(cancel.clone()));

    let (tcp, _) = within(listener.accept()).await.unwrap();
    let mut ws = accept_async(tcp).await.unwrap();

    assert_eq!(within(events.recv_async()).await.unwrap(), BusEvent::Connected);

    emitter.emit(Message::new("gui.page.show", json!({ "index": 0 })));
    let frame = within(ws.next()).await.unwrap().unwrap();
    let sent = Message::from_json(frame.to_text().unwrap()).unwrap();
    assert_eq!(sent.msg_type, "gui.page.show");
    assert_eq!(sent.data["index"], json!(0));

    ws.send(text(r#"{"type": "mycroft.stop", "data": {}}"#)).await.unwrap();
    match within(events.recv_async()).await.unwrap() {
        BusEvent::Message(msg) => assert_eq!(msg.msg_type, "mycroft.stop"),
        other => panic!("unexpected event {:?}", other),
    }

    cancel.cancel();
    within(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn skips_malformed_frames() {
    let (listener, config) = bind().await;

    let task = cs_bus::create_task(config).unwrap();
    let events = task.events();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Box::new(task).run(cancel.clone()));

    let (tcp, _) = within(listener.accept()).await.unwrap();
    let mut ws = accept_async(tcp).await.unwrap();
    assert_eq!(within(events.recv_async()).await.unwrap(), BusEvent::Connected);

    ws.send(text("definitely not json")).await.unwrap();
    ws.send(text(r#"{"data": {}}"#)).await.unwrap();
    ws.send(text(r#"{"type": "CameraSkill.EndProcess"}"#)).await.unwrap();

    match within(events.recv_async()).await.unwrap() {
        BusEvent::Message(msg) => assert_eq!(msg.msg_type, "CameraSkill.EndProcess"),
        other => panic!("unexpected event {:?}", other),
    }

    cancel.cancel();
    within(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn reconnects_after_server_drops_connection() {
    let (listener, config) = bind().await;

    let task = cs_bus::create_task(config).unwrap();
    let events = task.events();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Box::new(task).run(cancel.clone()));

    let (tcp, _) = within(listener.accept()).await.unwrap();
    let ws = accept_async(tcp).await.unwrap();
    assert_eq!(within(events.recv_async()).await.unwrap(), BusEvent::Connected);
    drop(ws);

    let (tcp, _) = within(listener.accept()).await.unwrap();
    let _ws = accept_async(tcp).await.unwrap();
    assert_eq!(within(events.recv_async()).await.unwrap(), BusEvent::Connected);

    cancel.cancel();
    within(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_during_reconnect_backoff_is_prompt() {
    let (listener, mut config) = bind().await;
    config.reconnect_interval_ms = 3_000;

    let task = cs_bus::create_task(config).unwrap();
    let events = task.events();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Box::new(task).run(cancel.clone()));

    let (tcp, _) = within(listener.accept()).await.unwrap();
    let ws = accept_async(tcp).await.unwrap();
    assert_eq!(within(events.recv_async()).await.unwrap(), BusEvent::Connected);
    drop(ws);

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let res = tokio::time::timeout(Duration::from_millis(500), handle)
        .await
        .expect("bus task kept sleeping after cancellation");
    res.unwrap().unwrap();
}

#[tokio::test]
async fn messages_emitted_while_disconnected_reach_the_next_connection() {
    let (listener, mut config) = bind().await;
    config.reconnect_interval_ms = 300;

    let task = cs_bus::create_task(config).unwrap();
    let emitter = task.emitter();
    let events = task.events();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Box::new(task).run(cancel.clone()));

    let (tcp, _) = within(listener.accept()).await.unwrap();
    let ws = accept_async(tcp).await.unwrap();
    assert_eq!(within(events.recv_async()).await.unwrap(), BusEvent::Connected);
    drop(ws);

    tokio::time::sleep(Duration::from_millis(100)).await;
    emitter.emit(Message::new("gui.page.show", json!({ "index": 0 })));

    let (tcp, _) = within(listener.accept()).await.unwrap();
    let mut ws = accept_async(tcp).await.unwrap();
    assert_eq!(within(events.recv_async()).await.unwrap(), BusEvent::Connected);

    let frame = within(ws.next()).await.unwrap().unwrap();
    let sent = Message::from_json(frame.to_text().unwrap()).unwrap();
    assert_eq!(sent.msg_type, "gui.page.show");

    cancel.cancel();
    within(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn fails_after_exhausting_connection_attempts() {
    let (listener, mut config) = bind().await;
    drop(listener);
    config.reconnect_attempts = 2;

    let task = cs_bus::create_task(config).unwrap();

    let res = within(Box::new(task).run(CancellationToken::new())).await;
    assert!(res.is_err());
}

#[test]
fn rejects_empty_host() {
    let config = BusConfig {
        host: String::new(),
        ..Default::default()
    };

    assert!(cs_bus::create_task(config).is_err());
}
