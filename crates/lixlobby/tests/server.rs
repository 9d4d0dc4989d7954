//! Integration tests for the lobby server: a real WebSocket client talks
//! JSON envelopes to a server bound on a random local port.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lixlobby::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn fast_hashing() -> HashingConfig {
    HashingConfig {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    }
}

/// Starts a server with alice (id 1) and bob (id 2) registered and
/// returns its address.
async fn start_server() -> String {
    start_server_with(LobbyConfig::default()).await
}

async fn start_server_with(config: LobbyConfig) -> String {
    let server = LobbyServerBuilder::new()
        .config(config)
        .bind("127.0.0.1:0")
        .hashing_config(fast_hashing())
        .build(InMemoryCredentialStore::new())
        .await
        .expect("server should build");

    for (id, name, pw) in [(1, "alice", "correct-horse"), (2, "bob", "battery-staple")] {
        let hash = server.auth().verifier().hash_password(pw).unwrap();
        server
            .auth()
            .store()
            .insert(UserRecord {
                user_id: UserId(id),
                name: name.into(),
                password_hash: hash,
            })
            .await;
    }

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

/// Sends `message` wrapped in an envelope and returns the reply envelope.
async fn request(ws: &mut ClientWs, seq: u64, message: LobbyMessage) -> Envelope {
    let envelope = Envelope::new(seq, 0, message);
    let text = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::text(text)).await.expect("send");
    next_envelope(ws).await
}

async fn next_envelope(ws: &mut ClientWs) -> Envelope {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("reply within 5s")
        .expect("stream open")
        .expect("frame");
    serde_json::from_slice(&msg.into_data()).expect("decode")
}

fn login(username: &str, password: &str) -> LobbyMessage {
    LobbyMessage::Authenticate {
        username: username.into(),
        password: Password::new(password),
    }
}

async fn login_token(ws: &mut ClientWs, username: &str, password: &str) -> String {
    match request(ws, 1, login(username, password)).await.message {
        LobbyMessage::AuthResult {
            success: true,
            session_token: Some(token),
        } => token,
        other => panic!("expected successful AuthResult, got {other:?}"),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_login_validate_logout_flow() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let token = login_token(&mut ws, "alice", "correct-horse").await;
    assert_eq!(token.len(), 64);

    let status = request(&mut ws, 2, LobbyMessage::ValidateSession { token: token.clone() }).await;
    assert_eq!(
        status.message,
        LobbyMessage::SessionStatus {
            valid: true,
            user_id: Some(UserId(1)),
        }
    );

    let bye = request(&mut ws, 3, LobbyMessage::Logout { token: token.clone() }).await;
    assert_eq!(bye.message, LobbyMessage::LoggedOut);

    let status = request(&mut ws, 4, LobbyMessage::ValidateSession { token }).await;
    assert_eq!(
        status.message,
        LobbyMessage::SessionStatus {
            valid: false,
            user_id: None,
        }
    );
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_get_identical_replies() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let wrong = request(&mut ws, 1, login("alice", "wrong")).await;
    let unknown = request(&mut ws, 2, login("bob-unknown", "anything")).await;

    let expected = LobbyMessage::AuthResult {
        success: false,
        session_token: None,
    };
    assert_eq!(wrong.message, expected);
    assert_eq!(unknown.message, expected);
}

#[tokio::test]
async fn test_empty_username_is_bad_request() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = request(&mut ws, 1, login("", "correct-horse")).await;
    match reply.message {
        LobbyMessage::Error { code, .. } => assert_eq!(code, error_codes::BAD_REQUEST),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_password_field_is_bad_request_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let raw = r#"{"seq":1,"timestamp":0,"message":{"type":"Authenticate","username":"alice"}}"#;
    ws.send(Message::text(raw.to_string())).await.unwrap();
    match next_envelope(&mut ws).await.message {
        LobbyMessage::Error { code, .. } => assert_eq!(code, 400),
        other => panic!("expected Error, got {other:?}"),
    }

    // Still usable after the bad frame.
    let token = login_token(&mut ws, "alice", "correct-horse").await;
    assert_eq!(token.len(), 64);
}

#[tokio::test]
async fn test_server_only_message_from_client_is_bad_request() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = request(&mut ws, 1, LobbyMessage::LoggedOut).await;
    match reply.message {
        LobbyMessage::Error { code, message } => {
            assert_eq!(code, error_codes::BAD_REQUEST);
            assert!(message.contains("LoggedOut"), "{message}");
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = request(&mut ws, 1, LobbyMessage::Heartbeat { client_time: 4242 }).await;
    match reply.message {
        LobbyMessage::HeartbeatAck { client_time, .. } => assert_eq!(client_time, 4242),
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reply_sequence_numbers_increase() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let first = request(&mut ws, 1, LobbyMessage::Heartbeat { client_time: 1 }).await;
    let second = request(&mut ws, 2, LobbyMessage::Heartbeat { client_time: 2 }).await;
    assert!(second.seq > first.seq);
    assert!(second.timestamp >= first.timestamp);
}

#[tokio::test]
async fn test_token_from_one_connection_validates_on_another() {
    let addr = start_server().await;
    let mut client = connect(&addr).await;
    let mut service = connect(&addr).await;

    let token = login_token(&mut client, "bob", "battery-staple").await;

    let status = request(&mut service, 1, LobbyMessage::ValidateSession { token }).await;
    assert_eq!(
        status.message,
        LobbyMessage::SessionStatus {
            valid: true,
            user_id: Some(UserId(2)),
        }
    );
}

#[tokio::test]
async fn test_disconnect_closes_connection() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let envelope = Envelope::new(
        1,
        0,
        LobbyMessage::Disconnect {
            reason: "done".into(),
        },
    );
    ws.send(Message::text(serde_json::to_string(&envelope).unwrap()))
        .await
        .unwrap();

    let next = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("server should close within 5s");
    match next {
        None | Some(Ok(Message::Close(_))) | Some(Err(_)) => {}
        Some(Ok(other)) => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let addr = start_server_with(LobbyConfig {
        idle_timeout_secs: 1,
        ..LobbyConfig::default()
    })
    .await;
    let mut ws = connect(&addr).await;

    let next = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("idle connection should close within 5s");
    assert!(!matches!(next, Some(Ok(Message::Text(_)))));
}

#[tokio::test]
async fn test_stalled_handshake_does_not_block_other_clients() {
    let addr = start_server().await;

    // Opens TCP and never sends the upgrade request.
    let _stalled = tokio::net::TcpStream::connect(addr.as_str()).await.unwrap();

    let mut ws = tokio::time::timeout(Duration::from_secs(3), connect(&addr))
        .await
        .expect("second client must connect while the first one stalls");
    let token = login_token(&mut ws, "alice", "correct-horse").await;
    assert_eq!(token.len(), 64);
}

#[tokio::test]
async fn test_stalled_handshake_is_dropped_after_idle_timeout() {
    use tokio::io::AsyncReadExt;

    let addr = start_server_with(LobbyConfig {
        idle_timeout_secs: 1,
        ..LobbyConfig::default()
    })
    .await;
    let mut stalled = tokio::net::TcpStream::connect(addr.as_str()).await.unwrap();

    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(5), stalled.read(&mut buf))
        .await
        .expect("server should hang up within 5s");
    assert!(matches!(read, Ok(0) | Err(_)), "expected EOF, got {read:?}");
}

#[tokio::test]
async fn test_build_rejects_unusable_hashing_params() {
    let result = LobbyServerBuilder::new()
        .bind("127.0.0.1:0")
        .hashing_config(HashingConfig {
            memory_kib: 0,
            iterations: 0,
            parallelism: 0,
        })
        .build(InMemoryCredentialStore::new())
        .await;
    assert!(matches!(result, Err(LobbyError::Hashing(_))));
}
