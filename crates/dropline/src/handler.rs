//! Per-connection handler: init, attach, and the participant loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Finish the WebSocket upgrade
//!   2. Receive `init` → create a game, join one, or watch one
//!   3. Attach to the session as a player or a spectator
//!   4. Loop: forward session broadcasts to the client, feed its `play`
//!      messages to the session
//!
//! However the loop ends, a guard detaches the connection, and the last
//! participant to leave unregisters the session.

use std::sync::Arc;

use dropline_engine::GameEngine;
use dropline_protocol::{ClientMessage, Codec, Player, ProtocolError, ServerMessage};
use dropline_session::{Outbound, Role, SessionError, SessionHandle, SessionRegistry};
use dropline_transport::{
    Connection, ConnectionId, Handshake, PendingWebSocket, WebSocketConnection,
};
use tokio::sync::{mpsc, watch};

use crate::DroplineError;
use crate::server::ServerState;

/// What a connection asked for in its `init` message.
#[derive(Debug, PartialEq, Eq)]
enum Intent {
    Create,
    Join(String),
    Watch(String),
}

impl Intent {
    fn from_init(
        join: Option<String>,
        watch: Option<String>,
    ) -> Result<Self, ProtocolError> {
        match (join, watch) {
            (None, None) => Ok(Intent::Create),
            (Some(token), None) => Ok(Intent::Join(token)),
            (None, Some(token)) => Ok(Intent::Watch(token)),
            (Some(_), Some(_)) => Err(ProtocolError::InvalidMessage(
                "init may carry join or watch, not both".into(),
            )),
        }
    }
}

/// Drop guard that detaches a participant when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct ParticipantGuard<E: GameEngine> {
    conn_id: ConnectionId,
    session: SessionHandle<E>,
    registry: Arc<SessionRegistry<E>>,
}

impl<E: GameEngine> Drop for ParticipantGuard<E> {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let conn_id = self.conn_id;
        let session = Arc::clone(&self.session);
        let registry = Arc::clone(&self.registry);
        runtime.spawn(async move {
            if session.detach(conn_id).await {
                registry.destroy(&session);
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<E, C>(
    pending: PendingWebSocket,
    state: Arc<ServerState<E, C>>,
) -> Result<(), DroplineError>
where
    E: GameEngine,
    C: Codec,
{
    let conn_id = pending.id();
    let mut shutdown = state.shutdown.subscribe();
    let conn = tokio::select! {
        upgraded = pending.upgrade() => upgraded?,
        () = shutdown_requested(&mut shutdown) => return Ok(()),
    };
    tracing::debug!(%conn_id, "handling new connection");

    let result = serve(&conn, &state, &mut shutdown).await;
    // The peer may already be gone.
    let _ = conn.close().await;
    result
}

async fn serve<E, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<E, C>>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), DroplineError>
where
    E: GameEngine,
    C: Codec,
{
    let conn_id = conn.id();

    // --- Step 1: init ---
    let intent = tokio::select! {
        intent = receive_init(conn, state) => intent?,
        () = shutdown_requested(shutdown) => return Ok(()),
    };
    let Some(intent) = intent else {
        return Ok(());
    };

    // --- Step 2: attach ---
    let (outbound, inbox) = mpsc::unbounded_channel();
    let (session, as_player, reply) = match intent {
        Intent::Create => {
            let (play_token, watch_token, session) =
                state.registry.create(E::default());
            let reply = ServerMessage::Init {
                join: play_token.into(),
                watch: watch_token.into(),
            };
            (session, true, Some(reply))
        }
        Intent::Join(token) => match state.registry.lookup_by_play_token(&token) {
            Some(session) => (session, true, None),
            None => return reject(conn, &state.codec, &SessionError::NotFound).await,
        },
        Intent::Watch(token) => match state.registry.lookup_by_watch_token(&token) {
            Some(session) => (session, false, None),
            None => return reject(conn, &state.codec, &SessionError::NotFound).await,
        },
    };

    let attached = if as_player {
        session
            .attach_player(conn_id, outbound.clone())
            .await
            .map(Role::Player)
    } else {
        session
            .attach_spectator(conn_id, outbound.clone())
            .await
            .map(|()| Role::Spectator)
    };
    let role = match attached {
        Ok(role) => role,
        Err(e) => {
            if reply.is_some() {
                state.registry.destroy(&session);
            }
            return reject(conn, &state.codec, &e).await;
        }
    };
    let _guard = ParticipantGuard {
        conn_id,
        session: Arc::clone(&session),
        registry: Arc::clone(&state.registry),
    };

    tracing::info!(
        %conn_id,
        session_id = %session.id(),
        ?role,
        "connection attached"
    );

    if let Some(reply) = reply {
        send_message(conn, &state.codec, &reply).await?;
    }

    // --- Step 3: participant loop ---
    participate(conn, state, &session, role, outbound, inbox, shutdown).await

    // _guard drops here → detach fires.
}

/// Waits for the first message and checks that it is a valid `init`.
///
/// Returns `Ok(None)` if the peer hangs up first.
async fn receive_init<E, C>(
    conn: &WebSocketConnection,
    state: &ServerState<E, C>,
) -> Result<Option<Intent>, DroplineError>
where
    E: GameEngine,
    C: Codec,
{
    let received = match state.config.init_timeout {
        Some(limit) => tokio::time::timeout(limit, conn.recv())
            .await
            .map_err(|_| ProtocolError::InvalidMessage("init timed out".into()))?,
        None => conn.recv().await,
    };
    let Some(data) = received? else {
        tracing::debug!(conn_id = %conn.id(), "connection closed before init");
        return Ok(None);
    };

    match state.codec.decode::<ClientMessage>(&data)? {
        ClientMessage::Init { join, watch } => {
            Ok(Some(Intent::from_init(join, watch)?))
        }
        other => Err(ProtocolError::UnexpectedMessage {
            expected: "init",
            got: other.kind(),
        }
        .into()),
    }
}

/// Relays broadcasts out and moves in until the connection ends.
async fn participate<E, C>(
    conn: &WebSocketConnection,
    state: &ServerState<E, C>,
    session: &SessionHandle<E>,
    role: Role,
    outbound: Outbound,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), DroplineError>
where
    E: GameEngine,
    C: Codec,
{
    let conn_id = conn.id();

    loop {
        tokio::select! {
            biased;

            () = shutdown_requested(shutdown) => {
                tracing::debug!(%conn_id, "closing for shutdown");
                break;
            }

            Some(message) = inbox.recv() => {
                send_message(conn, &state.codec, &message).await?;
            }

            incoming = conn.recv() => {
                let data = match incoming {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };

                match role {
                    Role::Player(player) => {
                        handle_move(state, session, player, &outbound, &data).await?;
                    }
                    Role::Spectator => {
                        tracing::debug!(%conn_id, "ignoring frame from spectator");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Decodes a player's frame and submits it to the session.
///
/// A rejected move is answered with an `error` on the player's own queue,
/// behind any broadcasts already waiting there.
async fn handle_move<E, C>(
    state: &ServerState<E, C>,
    session: &SessionHandle<E>,
    player: Player,
    outbound: &Outbound,
    data: &[u8],
) -> Result<(), DroplineError>
where
    E: GameEngine,
    C: Codec,
{
    match state.codec.decode::<ClientMessage>(data)? {
        ClientMessage::Play { column } => {
            if let Err(e) = session.play(player, column).await {
                tracing::debug!(
                    session_id = %session.id(),
                    %player,
                    column,
                    error = %e,
                    "move rejected"
                );
                if outbound.send(ServerMessage::error(&e)).is_err() {
                    tracing::trace!(
                        session_id = %session.id(),
                        %player,
                        "own queue gone, reply dropped"
                    );
                }
            }
            Ok(())
        }
        other => Err(ProtocolError::UnexpectedMessage {
            expected: "play",
            got: other.kind(),
        }
        .into()),
    }
}

/// Answers a failed init with an `error` message. The connection ends
/// afterwards; the failure is the client's, not the handler's.
async fn reject(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    error: &SessionError,
) -> Result<(), DroplineError> {
    tracing::debug!(conn_id = %conn.id(), %error, "init rejected");
    send_message(conn, codec, &ServerMessage::error(error.client_message())).await
}

async fn send_message(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    message: &ServerMessage,
) -> Result<(), DroplineError> {
    let text = codec.encode(message)?;
    conn.send(&text).await?;
    Ok(())
}

/// Resolves once the server starts shutting down.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // A closed channel means the server is gone, which counts too.
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}
