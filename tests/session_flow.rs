//! WebSocket protocol flow tests, driven against the session router's packet
//! handlers with an in-memory store.

use std::sync::Arc;

use kingfall::api::AppState;
use kingfall::board::{Board, Color, GameResult, PieceType, StateHeader};
use kingfall::store::Store;
use kingfall::ws::{self, JoinedSession, Registry};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

async fn test_state() -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("failed to create test database");
    let store = Store::new(pool);
    store.init_schema().await.expect("failed to initialize schema");
    AppState { store, registry: Arc::new(Registry::new()) }
}

struct Player {
    session: Uuid,
    email: &'static str,
}

async fn seat_players(store: &Store) -> (Uuid, Player, Player) {
    for email in ["alice@example.com", "bob@example.com"] {
        store.create_user(email, "not-a-real-hash").await.unwrap();
    }
    let alice = Player {
        session: store.create_session("alice@example.com").await.unwrap(),
        email: "alice@example.com",
    };
    let bob = Player {
        session: store.create_session("bob@example.com").await.unwrap(),
        email: "bob@example.com",
    };
    let game = store.create_game(alice.email).await.unwrap();
    store.join_game(game, bob.email).await.unwrap();
    (game, alice, bob)
}

fn join_packet(game: Uuid, session: Uuid) -> Vec<u8> {
    let mut packet = Vec::with_capacity(ws::JOIN_PACKET_LEN);
    packet.extend_from_slice(game.as_bytes());
    packet.extend_from_slice(session.as_bytes());
    packet
}

struct Connection {
    session: JoinedSession,
    frames: Vec<Vec<u8>>,
    tx: UnboundedSender<Vec<u8>>,
    rx: UnboundedReceiver<Vec<u8>>,
}

async fn join(state: &AppState, game: Uuid, session: Uuid) -> Connection {
    let (tx, rx) = mpsc::unbounded_channel();
    let (session, frames) = ws::handle_join(state, &join_packet(game, session), tx.clone())
        .await
        .expect("join should succeed");
    Connection { session, frames, tx, rx }
}

#[tokio::test]
async fn joining_as_white_yields_the_starting_snapshot() {
    let state = test_state().await;
    let (game, alice, _bob) = seat_players(&state.store).await;

    let conn = join(&state, game, alice.session).await;
    assert_eq!(conn.session.color, Color::White);
    assert_eq!(conn.frames.len(), 3);
    assert_eq!(conn.frames[0], vec![b'w']);
    assert_eq!(conn.frames[1], [b"o".as_slice(), b"bob@example.com"].concat());
    // Zero moves and a White joiner: the turn flag is set.
    assert_eq!(conn.frames[2], Board::starting().encode(true).to_vec());
}

#[tokio::test]
async fn joining_as_black_flips_ack_and_turn_flag() {
    let state = test_state().await;
    let (game, _alice, bob) = seat_players(&state.store).await;

    let conn = join(&state, game, bob.session).await;
    assert_eq!(conn.session.color, Color::Black);
    assert_eq!(conn.frames[0], vec![b'b']);
    assert_eq!(conn.frames[1], [b"o".as_slice(), b"alice@example.com"].concat());
    assert_eq!(conn.frames[2], Board::starting().encode(false).to_vec());
}

#[tokio::test]
async fn opponent_push_is_empty_before_black_is_seated() {
    let state = test_state().await;
    state.store.create_user("alice@example.com", "not-a-real-hash").await.unwrap();
    let session = state.store.create_session("alice@example.com").await.unwrap();
    let game = state.store.create_game("alice@example.com").await.unwrap();

    let conn = join(&state, game, session).await;
    assert_eq!(conn.session.color, Color::White);
    assert_eq!(conn.frames[1], vec![b'o']);
}

#[tokio::test]
async fn join_is_refused_for_unknown_sessions_and_foreign_games() {
    let state = test_state().await;
    let (game, alice, _bob) = seat_players(&state.store).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let bad_session = ws::handle_join(&state, &join_packet(game, Uuid::new_v4()), tx.clone()).await;
    assert!(bad_session.is_err());

    let bad_game =
        ws::handle_join(&state, &join_packet(Uuid::new_v4(), alice.session), tx.clone()).await;
    assert!(bad_game.is_err());

    // A registered player seated in neither chair is refused too.
    state.store.create_user("carol@example.com", "not-a-real-hash").await.unwrap();
    let carol = state.store.create_session("carol@example.com").await.unwrap();
    let outsider = ws::handle_join(&state, &join_packet(game, carol), tx).await;
    assert!(outsider.is_err());
}

#[tokio::test]
async fn accepted_move_broadcasts_to_the_opponent_only() {
    let state = test_state().await;
    let (game, alice, bob) = seat_players(&state.store).await;
    let mut white = join(&state, game, alice.session).await;
    let mut black = join(&state, game, bob.session).await;

    // White pawn 12 -> 20.
    ws::handle_packet(&state, &white.session, &white.tx, &[12, 20]).await;

    let frame = black.rx.try_recv().expect("opponent should receive the new snapshot");
    let board = Board::decode(&frame, Vec::new()).unwrap();
    assert_eq!(board.piece_at(20), Some((Color::White, PieceType::Pawn)));
    assert_eq!(board.result(), GameResult::Ongoing);
    // After White's move the flag addressed to Black is set.
    let header = StateHeader::decode(frame[24]).unwrap();
    assert!(header.my_turn);

    // The mover is not echoed to.
    assert_eq!(white.rx.try_recv().unwrap_err(), TryRecvError::Empty);

    // The move is persisted.
    let stored = state.store.load_game(game).await.unwrap();
    assert_eq!(stored.moves().len(), 1);
    assert_eq!(stored.to_move(), Color::Black);
}

#[tokio::test]
async fn rejected_move_resyncs_the_sender_only() {
    let state = test_state().await;
    let (game, alice, bob) = seat_players(&state.store).await;
    let mut white = join(&state, game, alice.session).await;
    let mut black = join(&state, game, bob.session).await;

    // Black may not open the game.
    ws::handle_packet(&state, &black.session, &black.tx, &[48, 40]).await;

    let frame = black.rx.try_recv().expect("sender should be resynced");
    assert_eq!(frame, Board::starting().encode(false).to_vec());
    assert_eq!(white.rx.try_recv().unwrap_err(), TryRecvError::Empty);

    // Nothing was persisted.
    let stored = state.store.load_game(game).await.unwrap();
    assert!(stored.moves().is_empty());
}

#[tokio::test]
async fn malformed_packets_are_ignored() {
    let state = test_state().await;
    let (game, alice, _bob) = seat_players(&state.store).await;
    let mut white = join(&state, game, alice.session).await;

    ws::handle_packet(&state, &white.session, &white.tx, &[1, 2, 3]).await;
    assert_eq!(white.rx.try_recv().unwrap_err(), TryRecvError::Empty);

    let stored = state.store.load_game(game).await.unwrap();
    assert!(stored.moves().is_empty());
}
