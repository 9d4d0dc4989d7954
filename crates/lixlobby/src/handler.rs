//! Per-connection handler: receive, decode, dispatch, reply.
//!
//! Each accepted socket gets its own Tokio task running this handler.
//! The task first finishes the WebSocket upgrade, bounded by the idle
//! timeout. There is no lobby-level handshake after that: every frame is
//! an independent request, and a connection may log in, check tokens and
//! log out in any order until it goes idle or says `Disconnect`.

use std::sync::Arc;
use std::time::Instant;

use lixlobby_auth::{Credential, CredentialStore, Rejection};
use lixlobby_protocol::{Codec, Envelope, LobbyMessage, ProtocolError, error_codes};
use lixlobby_transport::{Connection, PendingConnection, PendingWebSocket, WebSocketConnection};
use zeroize::Zeroizing;

use crate::LobbyError;
use crate::server::ServerState;

/// Outgoing half of a connection: numbers and timestamps every reply.
struct Replier<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
    start: Instant,
}

impl<C: Codec> Replier<'_, C> {
    async fn send(&mut self, message: LobbyMessage) -> Result<(), LobbyError> {
        let envelope = Envelope::new(self.next_seq(), self.elapsed_ms(), message);
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_error(&mut self, code: u16, message: impl Into<String>) -> Result<(), LobbyError> {
        self.send(LobbyMessage::Error {
            code,
            message: message.into(),
        })
        .await
    }

    fn next_seq(&mut self) -> u64 {
        let current = self.seq;
        self.seq += 1;
        current
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    pending: PendingWebSocket,
    state: Arc<ServerState<S, C>>,
) -> Result<(), LobbyError>
where
    S: CredentialStore,
    C: Codec,
{
    let conn_id = pending.id();
    let peer = pending.peer_addr();

    let conn = match tokio::time::timeout(state.idle_timeout, pending.upgrade()).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            tracing::debug!(%conn_id, %peer, error = %e, "websocket upgrade failed");
            return Err(e.into());
        }
        Err(_) => {
            tracing::info!(%conn_id, %peer, "websocket handshake timed out");
            return Ok(());
        }
    };
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let mut out = Replier {
        conn: &conn,
        codec: &state.codec,
        seq: 1,
        start: Instant::now(),
    };

    loop {
        // Frames can carry plaintext passwords.
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => Zeroizing::new(data),
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                out.send_error(error_codes::BAD_REQUEST, "malformed request")
                    .await?;
                continue;
            }
        };

        let should_close = dispatch(&state, &mut out, envelope.message).await?;
        if should_close {
            break;
        }
    }

    let _ = conn.close().await;
    Ok(())
}

/// Handles one decoded message. Returns `true` if the connection should
/// close.
async fn dispatch<S, C>(
    state: &ServerState<S, C>,
    out: &mut Replier<'_, C>,
    message: LobbyMessage,
) -> Result<bool, LobbyError>
where
    S: CredentialStore,
    C: Codec,
{
    let conn_id = out.conn.id();

    match message {
        LobbyMessage::Authenticate { username, password } => {
            let credential = Credential::new(username, password.into_inner());
            match state.auth.authenticate_credential(credential).await {
                Ok(token) => {
                    out.send(LobbyMessage::AuthResult {
                        success: true,
                        session_token: Some(token.to_string()),
                    })
                    .await?;
                }
                Err(e) => match e.rejection() {
                    Rejection::BadRequest => {
                        out.send_error(error_codes::BAD_REQUEST, e.to_string())
                            .await?;
                    }
                    Rejection::InvalidCredentials | Rejection::SessionInvalid => {
                        out.send(LobbyMessage::AuthResult {
                            success: false,
                            session_token: None,
                        })
                        .await?;
                    }
                },
            }
        }

        LobbyMessage::ValidateSession { token } => {
            let status = match state.auth.validate_session(&token).await {
                Ok(user_id) => LobbyMessage::SessionStatus {
                    valid: true,
                    user_id: Some(user_id),
                },
                Err(_) => LobbyMessage::SessionStatus {
                    valid: false,
                    user_id: None,
                },
            };
            out.send(status).await?;
        }

        LobbyMessage::Logout { token } => {
            state.auth.logout(&token).await;
            out.send(LobbyMessage::LoggedOut).await?;
        }

        LobbyMessage::Heartbeat { client_time } => {
            let server_time = out.elapsed_ms();
            out.send(LobbyMessage::HeartbeatAck {
                client_time,
                server_time,
            })
            .await?;
        }

        LobbyMessage::Disconnect { reason } => {
            tracing::info!(%conn_id, %reason, "client disconnected");
            return Ok(true);
        }

        LobbyMessage::AuthResult { .. }
        | LobbyMessage::SessionStatus { .. }
        | LobbyMessage::LoggedOut
        | LobbyMessage::HeartbeatAck { .. }
        | LobbyMessage::Error { .. } => {
            let err = ProtocolError::InvalidMessage(format!(
                "{} is sent by the server only",
                message.kind()
            ));
            tracing::debug!(%conn_id, error = %err, "client sent a server-only message");
            out.send_error(error_codes::BAD_REQUEST, err.to_string())
                .await?;
        }
    }

    Ok(false)
}
