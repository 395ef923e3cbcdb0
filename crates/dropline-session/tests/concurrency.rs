//! Integration tests for sessions under concurrent access, using a mock
//! engine that accepts every move.

use std::sync::Arc;

use dropline_engine::GameEngine;
use dropline_protocol::{Player, ServerMessage};
use dropline_session::{SessionError, SessionRegistry};
use dropline_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Mock engine: no turn order, no win, every column is bottomless.
// =========================================================================

#[derive(Default)]
struct OpenBoard {
    heights: std::collections::HashMap<i32, usize>,
}

#[derive(Debug, thiserror::Error)]
#[error("negative column")]
struct Negative;

impl GameEngine for OpenBoard {
    type Error = Negative;

    fn play(&mut self, _player: Player, column: i32) -> Result<usize, Negative> {
        if column < 0 {
            return Err(Negative);
        }
        let height = self.heights.entry(column).or_insert(0);
        let row = *height;
        *height += 1;
        Ok(row)
    }

    fn winner(&self) -> Option<Player> {
        None
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spectators_joining_mid_stream_see_each_move_exactly_once() {
    const MOVES: i32 = 200;
    const SPECTATORS: u64 = 16;

    let registry = SessionRegistry::<OpenBoard>::new();
    let (_, watch, session) = registry.create(OpenBoard::default());

    let player = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            for i in 0..MOVES {
                session.play(Player::Red, i % 7).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut joiners = Vec::new();
    for n in 0..SPECTATORS {
        let found = registry
            .lookup_by_watch_token(watch.as_str())
            .expect("session registered");
        joiners.push(tokio::spawn(async move {
            for _ in 0..n {
                tokio::task::yield_now().await;
            }
            let (tx, rx) = mpsc::unbounded_channel();
            found
                .attach_spectator(ConnectionId::new(100 + n), tx)
                .await
                .unwrap();
            rx
        }));
    }

    let mut receivers = Vec::new();
    for joiner in joiners {
        receivers.push(joiner.await.unwrap());
    }
    player.await.unwrap();

    let log = session.move_log().await;
    assert_eq!(log.len(), MOVES as usize);
    let expected: Vec<ServerMessage> =
        log.iter().map(|record| record.to_message()).collect();

    for mut rx in receivers {
        assert_eq!(drain(&mut rx), expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_players_moves_are_logged_in_broadcast_order() {
    let registry = SessionRegistry::<OpenBoard>::new();
    let (_, _, session) = registry.create(OpenBoard::default());

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .attach_spectator(ConnectionId::new(1), tx)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for player in Player::ALL {
        let session = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            for column in 0..50 {
                session.play(player, column).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let seen = drain(&mut rx);
    let logged: Vec<ServerMessage> = session
        .move_log()
        .await
        .iter()
        .map(|record| record.to_message())
        .collect();
    assert_eq!(seen.len(), 100);
    assert_eq!(seen, logged);
}

#[tokio::test]
async fn test_rejected_move_changes_nothing() {
    let registry = SessionRegistry::<OpenBoard>::new();
    let (_, _, session) = registry.create(OpenBoard::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .attach_player(ConnectionId::new(1), tx)
        .await
        .unwrap();

    let err = session.play(Player::Red, -1).await.unwrap_err();

    assert_eq!(err.to_string(), "negative column");
    assert!(session.move_log().await.is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_lookup_after_destroy_misses_and_stale_handle_is_closed() {
    let registry = SessionRegistry::<OpenBoard>::new();
    let (play, _, session) = registry.create(OpenBoard::default());
    let stale = registry.lookup_by_play_token(play.as_str()).unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    session
        .attach_player(ConnectionId::new(1), tx)
        .await
        .unwrap();
    if session.detach(ConnectionId::new(1)).await {
        registry.destroy(&session);
    }

    assert!(registry.lookup_by_play_token(play.as_str()).is_none());
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = stale.attach_player(ConnectionId::new(2), tx).await;
    assert!(matches!(result, Err(SessionError::Closed(_))));
}
