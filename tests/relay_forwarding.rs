//! Relay forwarding against a minimal scripted TCP backend: the request
//! line must carry the rewritten path, and the backend's status and JSON
//! body must be mirrored verbatim.

use std::time::Duration;

use clickrush::relay::{forward, rewrite_target};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Accept one connection, read the full request, answer with a canned
/// response, and hand back the raw request bytes for assertions.
async fn scripted_backend(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        // Read headers, then any advertised body.
        let header_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break raw.len();
            }
            raw.extend_from_slice(&buf[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while raw.len() < header_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&raw).to_string()
    });
    (format!("http://{}", addr), server)
}

#[tokio::test]
async fn get_is_forwarded_with_the_prefix_stripped() {
    let (origin, server) = scripted_backend("200 OK", r#"{"leaderboard":[],"userInTop":true}"#).await;

    let target = rewrite_target(&origin, "/relay", "/relay/api/leaderboard", "user_id=5");
    let client = reqwest::Client::new();
    let reply = forward(&client, "GET", &target, None, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, br#"{"leaderboard":[],"userInTop":true}"#);

    let request = server.await.unwrap();
    assert!(
        request.starts_with("GET /api/leaderboard?user_id=5 HTTP/1.1"),
        "unexpected request line: {}",
        request.lines().next().unwrap_or("")
    );
}

#[tokio::test]
async fn backend_failure_status_and_body_are_mirrored() {
    let (origin, server) = scripted_backend(
        "500 Internal Server Error",
        r#"{"error":"database exploded"}"#,
    )
    .await;

    let target = rewrite_target(&origin, "/relay", "/relay/api/save_score", "");
    let client = reqwest::Client::new();
    let reply = forward(
        &client,
        "POST",
        &target,
        Some(br#"{"userId":5,"userName":"Alice","score":9}"#.to_vec()),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    // Mirrored verbatim, not translated.
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, br#"{"error":"database exploded"}"#);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/save_score HTTP/1.1"));
    assert!(
        request.contains(r#"{"userId":5,"userName":"Alice","score":9}"#),
        "body must pass through unchanged"
    );
    assert!(request
        .lines()
        .any(|l| l.to_ascii_lowercase().starts_with("content-type:")
            && l.contains("application/json")));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let client = reqwest::Client::new();
    let err = forward(
        &client,
        "GET",
        "http://127.0.0.1:9/api/leaderboard",
        None,
        Duration::from_secs(2),
    )
    .await;
    assert!(err.is_err(), "connection refused must surface as an error");
}
