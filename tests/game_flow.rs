//! End-to-end game flow: two seated players trade moves through the session
//! router until a king is captured.

use std::sync::Arc;

use kingfall::api::AppState;
use kingfall::board::{Board, Color, GameResult, StateHeader, BLACK_KING_SLOT};
use kingfall::store::Store;
use kingfall::ws::{self, Registry};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::mpsc;
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

async fn seated_game(store: &Store) -> (Uuid, Uuid, Uuid) {
    store.create_user("alice@example.com", "not-a-real-hash").await.unwrap();
    store.create_user("bob@example.com", "not-a-real-hash").await.unwrap();
    let white = store.create_session("alice@example.com").await.unwrap();
    let black = store.create_session("bob@example.com").await.unwrap();
    let game = store.create_game("alice@example.com").await.unwrap();
    store.join_game(game, "bob@example.com").await.unwrap();
    (game, white, black)
}

fn join_packet(game: Uuid, session: Uuid) -> Vec<u8> {
    let mut packet = Vec::with_capacity(ws::JOIN_PACKET_LEN);
    packet.extend_from_slice(game.as_bytes());
    packet.extend_from_slice(session.as_bytes());
    packet
}

#[tokio::test]
async fn knight_hunts_down_the_black_king() {
    let state = test_state().await;
    let (game, white_session, black_session) = seated_game(&state.store).await;

    let (white_tx, mut white_rx) = mpsc::unbounded_channel();
    let (white, _frames) =
        ws::handle_join(&state, &join_packet(game, white_session), white_tx.clone())
            .await
            .unwrap();
    let (black_tx, mut black_rx) = mpsc::unbounded_channel();
    let (black, _frames) =
        ws::handle_join(&state, &join_packet(game, black_session), black_tx.clone())
            .await
            .unwrap();

    // A white knight walks 1 -> 16 -> 26 -> 36 -> 42 and takes the king on
    // 59 while Black shuffles kingside pawns.
    let script: &[(Color, u8, u8)] = &[
        (Color::White, 1, 16),
        (Color::Black, 55, 47),
        (Color::White, 16, 26),
        (Color::Black, 47, 39),
        (Color::White, 26, 36),
        (Color::Black, 54, 46),
        (Color::White, 36, 42),
        (Color::Black, 46, 38),
        (Color::White, 42, 59),
    ];
    for &(mover, start, end) in script {
        let (session, tx) = match mover {
            Color::White => (&white, &white_tx),
            Color::Black => (&black, &black_tx),
        };
        ws::handle_packet(&state, session, tx, &[start, end]).await;
    }

    // Every accepted move reached the opponent; none were rejected.
    let white_frames: Vec<Vec<u8>> = std::iter::from_fn(|| white_rx.try_recv().ok()).collect();
    let black_frames: Vec<Vec<u8>> = std::iter::from_fn(|| black_rx.try_recv().ok()).collect();
    assert_eq!(white_frames.len(), 4);
    assert_eq!(black_frames.len(), 5);

    let final_frame = black_frames.last().unwrap();
    let header = StateHeader::decode(final_frame[24]).unwrap();
    assert_eq!(header.result, GameResult::WhiteWins);

    let stored = state.store.load_game(game).await.unwrap();
    assert_eq!(stored.result(), GameResult::WhiteWins);
    assert_eq!(stored.positions()[BLACK_KING_SLOT], None);
    assert_eq!(stored.moves().len(), script.len());

    // The stored snapshot and a fresh wire snapshot agree.
    let decoded = Board::decode(&stored.encode(true), stored.moves().to_vec()).unwrap();
    assert_eq!(decoded, stored);
}
