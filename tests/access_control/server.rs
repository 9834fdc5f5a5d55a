//! HTTP transport tests.
//!
//! These start a real server over a temporary database file, send raw TCP
//! traffic, and assert on the responses.

use std::net::SocketAddr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use taskgate::config::{Auth, Config, Database, Server as ServerConfig, Service};
use taskgate::models::User;
use taskgate::{auth, db, server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const SECRET: &str = "test-secret-that-is-at-least-32b!";

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    server: server::Server,
    token: String,
    _dir: tempfile::TempDir,
}

/// Start the API over a fresh database holding one user, `ana`.
async fn start() -> Harness {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let url = dir.path().join("taskgate.db").display().to_string();

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["https://app.example.com".to_string()],
        },
        database: Database { url: url.clone() },
        auth: Auth {
            jwt_secret: SECRET.to_string(),
            token_expiry_days: 1,
        },
        service: Service {
            max_items_per_page: 2,
            enable_metrics: true,
        },
    };

    let seed = db::connect(&url).await.expect("failed to open database");
    let conn = db::connection(&seed).expect("failed to connect");
    db::migrate(&conn).await.expect("failed to migrate");
    let ana = User::create(&conn, "ana", "ana@example.com")
        .await
        .expect("failed to create user");
    let token = auth::create_token(&config.auth, &ana).expect("failed to issue token");

    let server = server::serve(config).await.expect("failed to start server");
    Harness {
        server,
        token,
        _dir: dir,
    }
}

/// Send a raw HTTP/1.1 request with `Connection: close` and read the full response.
async fn raw_request(addr: SocketAddr, payload: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    stream.write_all(payload).await.expect("failed to write");

    let mut buf = Vec::new();
    let _ = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        stream.read_to_end(&mut buf),
    )
    .await;
    String::from_utf8_lossy(&buf).into_owned()
}

async fn request(addr: SocketAddr, method: &str, path: &str, token: Option<&str>, body: &str) -> String {
    let auth = token
        .map(|t| format!("Authorization: Bearer {t}\r\n"))
        .unwrap_or_default();
    let payload = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\n{auth}\
         Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    raw_request(addr, payload.as_bytes()).await
}

fn status(response: &str) -> u16 {
    response
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0)
}

fn header<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response
        .lines()
        .take_while(|line| !line.is_empty())
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
}

fn body(response: &str) -> serde_json::Value {
    let raw = response.split("\r\n\r\n").nth(1).unwrap_or("");
    serde_json::from_str(raw).unwrap_or(serde_json::Value::Null)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_read_with_headers() {
    let h = start().await;
    let addr = h.server.addr();
    let token = Some(h.token.as_str());

    let created = request(addr, "PUT", "/api/v1/namespaces", token, r#"{"name":"Home"}"#).await;
    assert_eq!(status(&created), 201, "{created}");
    let namespace_id = body(&created)["id"].as_i64().unwrap();

    let path = format!("/api/v1/namespaces/{namespace_id}/lists");
    for title in ["Groceries", "Chores", "Garden"] {
        let response = request(addr, "PUT", &path, token, &format!(r#"{{"title":"{title}"}}"#)).await;
        assert_eq!(status(&response), 201, "{response}");
    }

    let listed = request(addr, "GET", "/api/v1/lists?page=1", token, "").await;
    assert_eq!(status(&listed), 200, "{listed}");
    assert_eq!(header(&listed, "x-pagination-total-pages"), Some("2"));
    assert_eq!(header(&listed, "x-pagination-result-count"), Some("2"));

    let list_id = body(&listed)[0]["id"].as_i64().unwrap();
    let one = request(addr, "GET", &format!("/api/v1/lists/{list_id}"), token, "").await;
    assert_eq!(status(&one), 200, "{one}");
    assert_eq!(header(&one, "x-max-right"), Some("admin"));

    h.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn delete_reports_success_message() {
    let h = start().await;
    let addr = h.server.addr();
    let token = Some(h.token.as_str());

    let created = request(addr, "PUT", "/api/v1/teams", token, r#"{"name":"Ops"}"#).await;
    let team_id = body(&created)["id"].as_i64().unwrap();

    let deleted = request(addr, "DELETE", &format!("/api/v1/teams/{team_id}"), token, "").await;
    assert_eq!(status(&deleted), 200, "{deleted}");
    assert_eq!(body(&deleted)["message"], "Successfully deleted.");

    let gone = request(addr, "GET", &format!("/api/v1/teams/{team_id}"), token, "").await;
    assert_eq!(status(&gone), 404, "{gone}");

    h.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let h = start().await;
    let response = request(h.server.addr(), "GET", "/api/v1/lists", None, "").await;
    h.server.shutdown().await.unwrap();

    assert_eq!(status(&response), 401, "{response}");
}

/// A token with `alg: none` and no signature must never authenticate.
#[tokio::test]
async fn unsigned_token_is_rejected() {
    let h = start().await;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(br#"{"sub":1,"kind":"user","exp":9999999999,"iat":0}"#);
    let forged = format!("{header}.{claims}.");

    let response = request(h.server.addr(), "GET", "/api/v1/lists", Some(&forged), "").await;
    h.server.shutdown().await.unwrap();

    assert_eq!(status(&response), 401, "{response}");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let h = start().await;
    let response = raw_request(
        h.server.addr(),
        b"PUT /api/v1/teams HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10485760\r\nConnection: close\r\n\r\n",
    )
    .await;
    h.server.shutdown().await.unwrap();

    assert_eq!(status(&response), 413, "{response}");
}

#[tokio::test]
async fn wrong_method_is_not_allowed() {
    let h = start().await;
    let response = request(h.server.addr(), "PATCH", "/api/v1/teams", Some(&h.token), "{}").await;
    h.server.shutdown().await.unwrap();

    assert_eq!(status(&response), 405, "{response}");
}

#[tokio::test]
async fn invalid_pagination_is_a_bad_request() {
    let h = start().await;
    let response = request(h.server.addr(), "GET", "/api/v1/lists?per_page=-1", Some(&h.token), "").await;
    h.server.shutdown().await.unwrap();

    assert_eq!(status(&response), 400, "{response}");
}

#[tokio::test]
async fn cors_origin_is_echoed_only_when_allowed() {
    let h = start().await;
    let addr = h.server.addr();

    let allowed = raw_request(
        addr,
        b"GET /api/v1/lists HTTP/1.1\r\nHost: localhost\r\nOrigin: https://app.example.com\r\nConnection: close\r\n\r\n",
    )
    .await;
    let foreign = raw_request(
        addr,
        b"GET /api/v1/lists HTTP/1.1\r\nHost: localhost\r\nOrigin: https://evil.example.com\r\nConnection: close\r\n\r\n",
    )
    .await;
    h.server.shutdown().await.unwrap();

    assert_eq!(
        header(&allowed, "access-control-allow-origin"),
        Some("https://app.example.com")
    );
    assert_eq!(header(&foreign, "access-control-allow-origin"), None);
}

#[tokio::test]
async fn link_share_hash_is_exchanged_for_a_token() {
    let h = start().await;
    let addr = h.server.addr();
    let token = Some(h.token.as_str());

    let namespace = request(addr, "PUT", "/api/v1/namespaces", token, r#"{"name":"Home"}"#).await;
    let namespace_id = body(&namespace)["id"].as_i64().unwrap();
    let list = request(
        addr,
        "PUT",
        &format!("/api/v1/namespaces/{namespace_id}/lists"),
        token,
        r#"{"title":"Groceries"}"#,
    )
    .await;
    let list_id = body(&list)["id"].as_i64().unwrap();

    let share = request(
        addr,
        "PUT",
        &format!("/api/v1/lists/{list_id}/shares"),
        token,
        r#"{"right":"read"}"#,
    )
    .await;
    assert_eq!(status(&share), 201, "{share}");
    let hash = body(&share)["hash"].as_str().unwrap().to_string();

    let exchanged = request(addr, "POST", &format!("/api/v1/shares/{hash}/auth"), None, "").await;
    assert_eq!(status(&exchanged), 200, "{exchanged}");
    let share_token = body(&exchanged)["token"].as_str().unwrap().to_string();

    let read = request(addr, "GET", &format!("/api/v1/lists/{list_id}"), Some(&share_token), "").await;
    assert_eq!(status(&read), 200, "{read}");
    assert_eq!(header(&read, "x-max-right"), Some("read"));

    let denied = request(addr, "GET", "/api/v1/namespaces", Some(&share_token), "").await;
    assert_eq!(body(&denied), serde_json::json!([]), "{denied}");

    let unknown = request(addr, "POST", "/api/v1/shares/nope/auth", None, "").await;
    assert_eq!(status(&unknown), 401, "{unknown}");

    h.server.shutdown().await.unwrap();
}
