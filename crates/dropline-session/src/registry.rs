//! The session registry: capability tokens → live sessions.
//!
//! Two independent maps exist, one per token namespace. Both point at
//! the same [`Session`] for a given game, so a session is reachable
//! through up to two tokens at once.
//!
//! # Concurrency note
//!
//! The maps are `DashMap`s, so any connection task may create, look up
//! or destroy sessions without a registry-wide lock. A lookup that races
//! with `destroy` simply misses, which callers treat as an ordinary
//! "not found".

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dropline_engine::GameEngine;

use crate::{Session, SessionId, Token};

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a live session.
pub type SessionHandle<E> = Arc<Session<E>>;

/// Maps play tokens and watch tokens to live sessions.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ [registered under play + watch token] ──→ destroy()
///                  │                                        │
///                  ▼                                        ▼
///        lookup_by_*_token() hits                 lookups miss forever
/// ```
///
/// One registry lives for the whole server process; it is drained when
/// the server shuts down.
pub struct SessionRegistry<E: GameEngine> {
    play: DashMap<Token, SessionHandle<E>>,
    watch: DashMap<Token, SessionHandle<E>>,
}

impl<E: GameEngine> SessionRegistry<E> {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self {
            play: DashMap::new(),
            watch: DashMap::new(),
        }
    }

    /// Creates a session around `engine` and registers it under two fresh
    /// tokens.
    ///
    /// Returns `(play_token, watch_token, handle)`.
    pub fn create(&self, engine: E) -> (Token, Token, SessionHandle<E>) {
        let id = SessionId::new(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        let play_token = fresh_token(&self.play);
        let watch_token = fresh_token(&self.watch);

        let session = Arc::new(Session::new(
            id,
            play_token.clone(),
            watch_token.clone(),
            engine,
        ));
        self.play.insert(play_token.clone(), Arc::clone(&session));
        self.watch.insert(watch_token.clone(), Arc::clone(&session));

        tracing::info!(session_id = %id, "session created");
        (play_token, watch_token, session)
    }

    /// Finds the session that `token` admits a second player to.
    pub fn lookup_by_play_token(&self, token: &str) -> Option<SessionHandle<E>> {
        self.play.get(token).map(|entry| Arc::clone(entry.value()))
    }

    /// Finds the session that `token` admits spectators to.
    pub fn lookup_by_watch_token(&self, token: &str) -> Option<SessionHandle<E>> {
        self.watch.get(token).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes both registry entries of `session`.
    ///
    /// Idempotent: destroying a session that is no longer registered is a
    /// no-op. Returns `true` if anything was removed.
    pub fn destroy(&self, session: &Session<E>) -> bool {
        let is_this = |_: &Token, s: &SessionHandle<E>| {
            std::ptr::eq(Arc::as_ptr(s), session)
        };
        let play = self.play.remove_if(session.play_token().as_str(), is_this);
        let watch = self
            .watch
            .remove_if(session.watch_token().as_str(), is_this);

        let removed = play.is_some() || watch.is_some();
        if removed {
            tracing::info!(session_id = %session.id(), "session destroyed");
        }
        removed
    }

    /// Unregisters every session and returns their handles.
    pub fn drain(&self) -> Vec<SessionHandle<E>> {
        let sessions: Vec<SessionHandle<E>> = self
            .play
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.play.clear();
        self.watch.clear();
        sessions
    }

    /// Returns the number of registered sessions.
    pub fn len(&self) -> usize {
        self.play.len()
    }

    /// Returns `true` if no session is registered.
    pub fn is_empty(&self) -> bool {
        self.play.is_empty()
    }
}

impl<E: GameEngine> Default for SessionRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a token not currently present in `map`.
fn fresh_token<V>(map: &DashMap<Token, V>) -> Token {
    loop {
        let token = Token::generate();
        if !map.contains_key(token.as_str()) {
            return token;
        }
    }
}
