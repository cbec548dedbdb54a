//! Runs `ApiClient` against a one-shot local HTTP server.

use std::collections::BTreeMap;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};

use tinychat::api::ApiClient;
use tinychat::api::models::{FormReply, MessageList, NewMessage};
use tinychat::error::Error;

/// Accepts one connection, answers it with a canned response and hands back the raw request.
async fn serve_once(status: &str, headers: &[&str], body: &str) -> (ApiClient, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut response = format!("HTTP/1.1 {status}\r\n");
    for header in headers {
        response.push_str(header);
        response.push_str("\r\n");
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ));

    let server = tokio::spawn(async move {
        let (mut tcp, _) = listener.accept().await.unwrap();
        let request = read_request(&mut tcp).await;
        tcp.write_all(response.as_bytes()).await.unwrap();
        let _ = tcp.shutdown().await;
        request
    });

    let client = ApiClient::new(&format!("http://{addr}")).unwrap();
    (client, server)
}

async fn read_request(tcp: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = timeout(Duration::from_secs(5), tcp.read(&mut chunk))
            .await
            .expect("request timed out")
            .unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        let Some(head_end) = text.find("\r\n\r\n") else { continue };
        let content_length = text[..head_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= head_end + 4 + content_length {
            break;
        }
    }
    String::from_utf8(buf).unwrap()
}

fn login_record() -> BTreeMap<String, String> {
    [("username", "Test1"), ("password", "secret")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn messages_are_fetched_in_order() {
    let (client, server) =
        serve_once("200 OK", &["Content-Type: application/json"], r#"{"messages":["a","b"]}"#)
            .await;

    let list = client.messages().await.unwrap();
    assert_eq!(list, MessageList { messages: vec!["a".into(), "b".into()] });
    assert!(server.await.unwrap().starts_with("GET /messages HTTP/1.1"));
}

#[tokio::test]
async fn unreadable_message_list_is_an_error() {
    let (client, server) = serve_once("200 OK", &[], "not json").await;

    assert!(matches!(client.messages().await, Err(Error::Http(_))));
    server.await.unwrap();
}

#[tokio::test]
async fn failed_message_list_reports_status() {
    let (client, server) = serve_once("500 Internal Server Error", &[], "").await;

    match client.messages().await {
        Err(Error::Status { status, reason }) => {
            assert_eq!(status, 500);
            assert_eq!(reason, "Internal Server Error");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn posted_message_returns_created() {
    let (client, server) = serve_once("201 Created", &[], "").await;

    let status = client.post_message(&NewMessage { message: "hello".into() }).await.unwrap();
    assert_eq!(status, 201);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /messages HTTP/1.1"));
    assert!(request.ends_with(r#"{"message":"hello"}"#));
}

#[tokio::test]
async fn login_stores_the_session_cookie() {
    let (client, server) = serve_once(
        "200 OK",
        &["Content-Type: application/json", "Set-Cookie: tinyhttpChatSess=abc; path=/"],
        r#"{"error":null}"#,
    )
    .await;

    let response = client.submit_form("/login", &login_record()).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.reply, Some(FormReply { error: None }));
    assert_eq!(response.reply.unwrap().error_message(), None);
    assert_eq!(client.session_cookie().as_deref(), Some("tinyhttpChatSess=abc"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /login HTTP/1.1"));
    assert!(request.ends_with(r#"{"password":"secret","username":"Test1"}"#));
}

#[tokio::test]
async fn rejected_form_carries_status_and_reason() {
    let (client, server) = serve_once("418 I'm a teapot", &[], r#"{"error":"ignored"}"#).await;

    let response = client.submit_form("/register", &login_record()).await.unwrap();
    assert_eq!(response.status, 418);
    assert_eq!(response.reason, "I'm a teapot");
    assert_eq!(response.reply, None);
    server.await.unwrap();
}

#[tokio::test]
async fn unreadable_form_reply_is_dropped() {
    let (client, server) = serve_once("200 OK", &[], "<html>").await;

    let response = client.submit_form("/login", &login_record()).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.reply, None);
    assert_eq!(client.session_cookie(), None);
    server.await.unwrap();
}
