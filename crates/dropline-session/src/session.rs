//! A single game in progress and the connections attached to it.
//!
//! All mutable state of a session sits behind one async mutex. Every
//! operation that touches the engine, the move log or the participant
//! sets runs start-to-finish inside that lock, and outbound delivery is a
//! non-blocking channel push, so the lock is never held across I/O. This
//! single-writer discipline is what makes the ordering guarantees hold:
//!
//! - moves are logged in exactly the order the engine accepted them
//! - a joiner receives the replayed log and then live moves, with no gap
//!   and no duplicate, because replay and registration happen in the same
//!   critical section as any broadcast

use std::collections::HashMap;
use std::fmt;

use dropline_engine::GameEngine;
use dropline_protocol::{Player, ServerMessage};
use dropline_transport::ConnectionId;
use tokio::sync::{Mutex, mpsc};

use crate::replay::replay;
use crate::{SessionError, Token, broadcast};

/// Channel sender for delivering server messages to one connection.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// Internal identifier of a session, used in logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a new `SessionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// One accepted move, as recorded in the move log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub player: Player,
    pub column: i32,
    pub row: usize,
}

impl MoveRecord {
    /// The `play` message announcing this move.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Play {
            player: self.player,
            column: self.column,
            row: self.row,
        }
    }
}

/// The part a connection plays in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(Player),
    Spectator,
}

struct PlayerSlot {
    player: Player,
    outbound: Outbound,
}

struct SessionState<E> {
    engine: E,
    players: HashMap<ConnectionId, PlayerSlot>,
    spectators: HashMap<ConnectionId, Outbound>,
    move_log: Vec<MoveRecord>,
    /// Set once the last participant leaves (or at shutdown). A closed
    /// session accepts no new participants.
    closed: bool,
}

impl<E> SessionState<E> {
    fn is_attached(&self, conn_id: &ConnectionId) -> bool {
        self.players.contains_key(conn_id)
            || self.spectators.contains_key(conn_id)
    }

    fn recipients(&self) -> impl Iterator<Item = (ConnectionId, &Outbound)> {
        self.players
            .iter()
            .map(|(id, slot)| (*id, &slot.outbound))
            .chain(self.spectators.iter().map(|(id, tx)| (*id, tx)))
    }

    fn check_attachable(
        &self,
        id: SessionId,
        conn_id: ConnectionId,
    ) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed(id));
        }
        if self.is_attached(&conn_id) {
            return Err(SessionError::AlreadyAttached(conn_id));
        }
        Ok(())
    }
}

/// One game: an engine, up to two players, any number of spectators,
/// and the history needed to bring late joiners up to date.
///
/// Sessions are created by the [`SessionRegistry`](crate::SessionRegistry)
/// and shared as [`SessionHandle`](crate::SessionHandle)s.
pub struct Session<E: GameEngine> {
    id: SessionId,
    play_token: Token,
    watch_token: Token,
    state: Mutex<SessionState<E>>,
}

impl<E: GameEngine> Session<E> {
    pub(crate) fn new(
        id: SessionId,
        play_token: Token,
        watch_token: Token,
        engine: E,
    ) -> Self {
        Self {
            id,
            play_token,
            watch_token,
            state: Mutex::new(SessionState {
                engine,
                players: HashMap::new(),
                spectators: HashMap::new(),
                move_log: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Returns the session's internal ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The token that admits the second player.
    pub fn play_token(&self) -> &Token {
        &self.play_token
    }

    /// The token that admits spectators.
    pub fn watch_token(&self) -> &Token {
        &self.watch_token
    }

    /// Attaches a connection to the first free player slot.
    ///
    /// The move log so far is queued on `outbound` before the connection
    /// starts receiving live broadcasts.
    ///
    /// # Errors
    /// - [`SessionError::Closed`]: the session has already ended
    /// - [`SessionError::AlreadyAttached`]: `conn_id` is already a participant
    /// - [`SessionError::Full`]: both slots are taken
    pub async fn attach_player(
        &self,
        conn_id: ConnectionId,
        outbound: Outbound,
    ) -> Result<Player, SessionError> {
        let mut state = self.state.lock().await;
        state.check_attachable(self.id, conn_id)?;

        let taken: Vec<Player> =
            state.players.values().map(|slot| slot.player).collect();
        let player = Player::ALL
            .into_iter()
            .find(|p| !taken.contains(p))
            .ok_or(SessionError::Full)?;

        replay(&state.move_log, &outbound);
        state
            .players
            .insert(conn_id, PlayerSlot { player, outbound });

        tracing::info!(
            session_id = %self.id,
            %conn_id,
            %player,
            replayed = state.move_log.len(),
            "player attached"
        );
        Ok(player)
    }

    /// Attaches a connection as a spectator.
    ///
    /// Like [`attach_player`](Self::attach_player), the move log is
    /// replayed first.
    ///
    /// # Errors
    /// - [`SessionError::Closed`]: the session has already ended
    /// - [`SessionError::AlreadyAttached`]: `conn_id` is already a participant
    pub async fn attach_spectator(
        &self,
        conn_id: ConnectionId,
        outbound: Outbound,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        state.check_attachable(self.id, conn_id)?;

        replay(&state.move_log, &outbound);
        state.spectators.insert(conn_id, outbound);

        tracing::info!(
            session_id = %self.id,
            %conn_id,
            replayed = state.move_log.len(),
            spectators = state.spectators.len(),
            "spectator attached"
        );
        Ok(())
    }

    /// Submits `player`'s move to the engine.
    ///
    /// On success the move is appended to the log and broadcast to every
    /// participant as a `play` message, followed by a `win` message if the
    /// engine now reports a winner.
    ///
    /// # Errors
    /// Returns the engine's rejection unchanged. A rejected move is neither
    /// logged nor broadcast.
    pub async fn play(
        &self,
        player: Player,
        column: i32,
    ) -> Result<MoveRecord, E::Error> {
        let mut state = self.state.lock().await;
        let row = state.engine.play(player, column)?;

        let record = MoveRecord {
            player,
            column,
            row,
        };
        state.move_log.push(record);

        let delivered = broadcast(state.recipients(), &record.to_message());
        tracing::debug!(
            session_id = %self.id,
            %player,
            column,
            row,
            delivered,
            "move accepted"
        );

        if let Some(winner) = state.engine.winner() {
            broadcast(
                state.recipients(),
                &ServerMessage::Win { player: winner },
            );
            tracing::info!(session_id = %self.id, %winner, "game won");
        }

        Ok(record)
    }

    /// Removes a connection from whichever participant set holds it.
    ///
    /// Returns `true` if the session has no participants left, in which
    /// case it is now closed and the caller should unregister it.
    /// Detaching a connection that isn't attached changes nothing and
    /// returns `false`.
    pub async fn detach(&self, conn_id: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        let role = if let Some(slot) = state.players.remove(&conn_id) {
            Some(Role::Player(slot.player))
        } else {
            state
                .spectators
                .remove(&conn_id)
                .map(|_| Role::Spectator)
        };

        let now_empty = role.is_some()
            && state.players.is_empty()
            && state.spectators.is_empty();
        if now_empty {
            state.closed = true;
        }

        tracing::info!(
            session_id = %self.id,
            %conn_id,
            ?role,
            now_empty,
            "participant detached"
        );
        now_empty
    }

    /// Closes the session to new participants without detaching anyone.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
    }

    /// Returns `true` once the session has ended.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// A snapshot of the move log, oldest first.
    pub async fn move_log(&self) -> Vec<MoveRecord> {
        self.state.lock().await.move_log.clone()
    }

    /// The engine's current winner.
    pub async fn winner(&self) -> Option<Player> {
        self.state.lock().await.engine.winner()
    }

    /// Number of attached players and spectators.
    pub async fn participant_counts(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.players.len(), state.spectators.len())
    }
}
