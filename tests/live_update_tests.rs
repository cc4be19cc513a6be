//! Live update integration tests: mockito for HTTP, a local WebSocket server for pushes.

use futures::SinkExt;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use turnstile_hal::turnstile::{Dashboard, Snapshot};
use turnstile_hal::ClientConfig;

const WAIT: Duration = Duration::from_secs(5);

/// Accept one WebSocket client and forward every string from the returned sender to it.
async fn push_server() -> (SocketAddr, mpsc::UnboundedSender<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(frame) = rx.recv().await {
            if ws.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });
    (addr, tx)
}

fn turnstile(server: &ServerGuard, id: i64, locked: bool, message: Option<&str>) -> Value {
    let base = format!("{}/api/turnstiles/{}", server.url(), id);
    let event = if locked { "coin" } else { "push" };
    let mut links = json!({
        "self": {"href": base},
        "delete": {"href": base},
    });
    links[event] = json!({"href": format!("{}/{}", base, event)});
    json!({
        "id": id,
        "locked": locked,
        "currentState": if locked { "LOCKED" } else { "UNLOCKED" },
        "message": message,
        "_links": links,
    })
}

/// Mock the root and the first page. Mocks are removed when dropped, so both are returned.
async fn mock_api(server: &mut ServerGuard, list_hits: usize) -> (mockito::Mock, mockito::Mock) {
    let root = json!({
        "apiVersion": 1,
        "_links": {
            "list": {"href": format!("{}/api/turnstiles{{?page,size,sort}}", server.url()), "templated": true},
            "create": {"href": format!("{}/api/turnstiles", server.url())},
        }
    });
    let root = server
        .mock("GET", "/api")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(root.to_string())
        .create_async()
        .await;

    let page = json!({
        "page": {"size": 10, "totalElements": 2, "totalPages": 1, "number": 0},
        "_embedded": {"turnstiles": [
            turnstile(server, 1, true, None),
            turnstile(server, 2, true, None),
        ]},
        "_links": {"self": {"href": format!("{}/api/turnstiles?page=0&size=10", server.url())}}
    });
    let list = server
        .mock("GET", "/api/turnstiles")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "0".into()),
            Matcher::UrlEncoded("size".into(), "10".into()),
        ]))
        .with_status(200)
        .with_body(page.to_string())
        .expect(list_hits)
        .create_async()
        .await;
    (root, list)
}

fn config(server: &ServerGuard, ws: String) -> ClientConfig {
    ClientConfig {
        base_url: format!("{}/api", server.url()),
        ws_url: ws,
        message_clear_delay_ms: 60_000,
        ..Default::default()
    }
}

async fn wait(dashboard: &Dashboard, predicate: impl FnMut(&Snapshot) -> bool) -> Snapshot {
    tokio::time::timeout(WAIT, dashboard.view().wait_for(predicate))
        .await
        .expect("timed out waiting for the live view")
        .unwrap()
}

#[tokio::test]
async fn test_pushes_reconcile_displayed_page() {
    let mut server = Server::new_async().await;
    let (_root, list) = mock_api(&mut server, 2).await;
    let item1 = server
        .mock("GET", "/api/turnstiles/1")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let item2 = server
        .mock("GET", "/api/turnstiles/2")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(turnstile(&server, 2, false, None).to_string())
        .expect(1)
        .create_async()
        .await;

    let (addr, frames) = push_server().await;
    let dashboard = Dashboard::start(config(&server, format!("ws://{}", addr)))
        .await
        .unwrap();
    assert!(dashboard.push().is_some());
    let snapshot = tokio::time::timeout(WAIT, dashboard.ready()).await.unwrap().unwrap();
    assert_eq!(snapshot.page.unwrap().embedded.turnstiles.len(), 2);

    // same identity: only the message changes, nothing is fetched
    frames
        .send(json!({"id": 1, "locked": true, "currentState": "LOCKED", "message": "hello"}).to_string())
        .unwrap();
    let snapshot = wait(&dashboard, |s| {
        s.item(1).and_then(|i| i.message.as_deref()) == Some("hello")
    })
    .await;
    assert!(snapshot.item(1).unwrap().links.contains("coin"));

    // changed identity: the held item is re-read through its self link
    frames
        .send(json!({"id": 2, "locked": false, "currentState": "UNLOCKED"}).to_string())
        .unwrap();
    let snapshot = wait(&dashboard, |s| s.item(2).map(|i| !i.locked).unwrap_or(false)).await;
    assert!(snapshot.item(2).unwrap().links.contains("push"));

    // not on display: the page is reloaded
    let revision = dashboard.snapshot().revision;
    frames
        .send(json!({"id": 99, "locked": true, "currentState": "LOCKED"}).to_string())
        .unwrap();
    wait(&dashboard, |s| s.revision >= revision + 2 && s.in_flight == 0).await;

    list.assert_async().await;
    item1.assert_async().await;
    item2.assert_async().await;
    dashboard.shutdown().await;
}

#[tokio::test]
async fn test_send_event_flashes_message_and_updates_view() {
    let mut server = Server::new_async().await;
    let _api = mock_api(&mut server, 1).await;
    let coin = server
        .mock("POST", "/api/turnstiles/1/coin")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(turnstile(&server, 1, false, Some("Unlocked")).to_string())
        .expect(1)
        .create_async()
        .await;

    let (addr, _frames) = push_server().await;
    let dashboard = Dashboard::start(config(&server, format!("ws://{}", addr)))
        .await
        .unwrap();
    let snapshot = tokio::time::timeout(WAIT, dashboard.ready()).await.unwrap().unwrap();
    let held = snapshot.item(1).unwrap().clone();
    assert_eq!(dashboard.events(&held), vec!["coin"]);

    let updated = dashboard.send_event(&held, "coin").await.unwrap();
    assert!(!updated.locked);
    assert_eq!(dashboard.notice().current().as_deref(), Some("Unlocked"));

    let snapshot = wait(&dashboard, |s| s.item(1).map(|i| !i.locked).unwrap_or(false)).await;
    assert_eq!(dashboard.events(snapshot.item(1).unwrap()), vec!["push"]);
    coin.assert_async().await;
}

#[tokio::test]
async fn test_dashboard_runs_without_push_channel() {
    let mut server = Server::new_async().await;
    let (_root, list) = mock_api(&mut server, 1).await;

    let dashboard = Dashboard::start(config(&server, "ws://127.0.0.1:1/ws".to_string()))
        .await
        .unwrap();
    assert!(dashboard.push().is_none());
    let snapshot = tokio::time::timeout(WAIT, dashboard.ready()).await.unwrap().unwrap();
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.item(2).map(|i| i.id), Some(2));
    list.assert_async().await;
}

#[tokio::test]
async fn test_version_mismatch_shows_notice() {
    let mut server = Server::new_async().await;
    let _root = server
        .mock("GET", "/api")
        .match_query(Matcher::Any)
        .with_status(417)
        .with_body(r#"{"error": {"detail": "Client must reload"}}"#)
        .create_async()
        .await;

    let dashboard = Dashboard::start(config(&server, "ws://127.0.0.1:1/ws".to_string()))
        .await
        .unwrap();
    let snapshot = tokio::time::timeout(WAIT, dashboard.ready()).await.unwrap().unwrap();
    assert!(snapshot.page.is_none());
    assert_eq!(snapshot.error.as_deref(), Some("Client must reload"));
    assert_eq!(dashboard.notice().current().as_deref(), Some("Client must reload"));
}
