//! WebSocket session router.
//!
//! Each connection speaks a small binary protocol: a 32-byte join packet
//! (game UUID + session UUID) authenticates the socket and registers it into
//! its game's broadcast group, after which 2-byte move packets drive the
//! engine. An accepted move is persisted and fanned out to the other
//! connections of the game; a rejected move answers the sender with the
//! unchanged snapshot so the client can resync.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::board::Color;
use crate::engine;
use crate::error::AppError;

pub const JOIN_PACKET_LEN: usize = 32;
pub const MOVE_PACKET_LEN: usize = 2;

const COLOR_ACK_WHITE: u8 = b'w';
const COLOR_ACK_BLACK: u8 = b'b';
const OPPONENT_PREFIX: u8 = b'o';

struct Peer {
    id: u64,
    color: Color,
    tx: UnboundedSender<Vec<u8>>,
}

struct GameGroup {
    peers: Vec<Peer>,
    /// Serializes load-validate-apply-persist for the game.
    move_lock: Arc<tokio::sync::Mutex<()>>,
}

/// All broadcast groups, keyed by game. The outer lock is held only for
/// registration, lookup and fan-out, never across an await point.
#[derive(Default)]
pub struct Registry {
    games: Mutex<HashMap<Uuid, GameGroup>>,
    next_peer: AtomicU64,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    fn register(&self, game: Uuid, color: Color, tx: UnboundedSender<Vec<u8>>) -> u64 {
        let id = self.next_peer.fetch_add(1, Ordering::Relaxed);
        let mut games = self.games.lock().unwrap();
        let group = games.entry(game).or_insert_with(|| GameGroup {
            peers: Vec::new(),
            move_lock: Arc::new(tokio::sync::Mutex::new(())),
        });
        group.peers.push(Peer { id, color, tx });
        id
    }

    fn unregister(&self, game: Uuid, peer: u64) {
        let mut games = self.games.lock().unwrap();
        if let Some(group) = games.get_mut(&game) {
            group.peers.retain(|p| p.id != peer);
            if group.peers.is_empty() {
                games.remove(&game);
            }
        }
    }

    fn move_lock(&self, game: Uuid) -> Option<Arc<tokio::sync::Mutex<()>>> {
        self.games.lock().unwrap().get(&game).map(|group| group.move_lock.clone())
    }

    /// Sends a per-recipient frame to every other connection of the game.
    fn broadcast_others(&self, game: Uuid, sender: u64, frame: impl Fn(Color) -> Vec<u8>) {
        let games = self.games.lock().unwrap();
        if let Some(group) = games.get(&game) {
            for peer in group.peers.iter().filter(|peer| peer.id != sender) {
                // a dropped receiver is cleaned up by its own teardown
                let _ = peer.tx.send(frame(peer.color));
            }
        }
    }
}

/// An authenticated connection.
#[derive(Clone, Copy, Debug)]
pub struct JoinedSession {
    pub game: Uuid,
    pub peer: u64,
    pub color: Color,
}

pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_connection(state, socket))
}

async fn serve_connection(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Binary(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session: Option<JoinedSession> = None;
    while let Some(Ok(message)) = stream.next().await {
        let data = match message {
            Message::Binary(data) => data,
            Message::Close(_) => break,
            _ => continue,
        };
        if let Some(joined) = &session {
            handle_packet(&state, joined, &tx, &data).await;
            continue;
        }
        if data.len() != JOIN_PACKET_LEN {
            warn!(len = data.len(), "packet before join, ignoring");
            continue;
        }
        match handle_join(&state, &data, tx.clone()).await {
            Ok((joined, frames)) => {
                info!(game = %joined.game, color = ?joined.color, "player joined");
                for frame in frames {
                    let _ = tx.send(frame);
                }
                session = Some(joined);
            }
            Err(e) => {
                warn!("join refused: {e}");
                break;
            }
        }
    }

    if let Some(joined) = &session {
        state.registry.unregister(joined.game, joined.peer);
        debug!(game = %joined.game, "connection left");
    }
    writer.abort();
}

/// Authenticates a join packet and registers the connection. Returns the
/// joined session plus the greeting frames in send order: color ack,
/// opponent identity, initial snapshot.
pub async fn handle_join(
    state: &AppState,
    data: &[u8],
    tx: UnboundedSender<Vec<u8>>,
) -> Result<(JoinedSession, Vec<Vec<u8>>), AppError> {
    let (game, session_id) = parse_join_packet(data).ok_or(AppError::Unauthorized)?;
    let seat = state
        .store
        .validate_session(session_id, game)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let board = state.store.load_game(game).await?;
    let peer = state.registry.register(game, seat.color, tx);

    let color_ack = match seat.color {
        Color::White => vec![COLOR_ACK_WHITE],
        Color::Black => vec![COLOR_ACK_BLACK],
    };
    let mut opponent = vec![OPPONENT_PREFIX];
    opponent.extend_from_slice(seat.opponent().as_bytes());
    let snapshot = board.encode(board.is_turn_of(seat.color)).to_vec();

    let joined = JoinedSession { game, peer, color: seat.color };
    Ok((joined, vec![color_ack, opponent, snapshot]))
}

fn parse_join_packet(data: &[u8]) -> Option<(Uuid, Uuid)> {
    if data.len() != JOIN_PACKET_LEN {
        return None;
    }
    let game = Uuid::from_slice(&data[..16]).ok()?;
    let session = Uuid::from_slice(&data[16..]).ok()?;
    Some((game, session))
}

/// Handles one packet on a joined connection. Malformed lengths are logged
/// and ignored; a storage failure abandons the message but keeps the
/// connection.
pub async fn handle_packet(
    state: &AppState,
    session: &JoinedSession,
    tx: &UnboundedSender<Vec<u8>>,
    data: &[u8],
) {
    if data.len() != MOVE_PACKET_LEN {
        warn!(game = %session.game, len = data.len(), "malformed packet, ignoring");
        return;
    }
    if let Err(e) = handle_move(state, session, tx, data[0], data[1]).await {
        error!(game = %session.game, "move processing failed: {e}");
    }
}

async fn handle_move(
    state: &AppState,
    session: &JoinedSession,
    tx: &UnboundedSender<Vec<u8>>,
    start: u8,
    end: u8,
) -> Result<(), AppError> {
    let Some(lock) = state.registry.move_lock(session.game) else {
        return Ok(());
    };
    let _guard = lock.lock().await;
    let mut board = state.store.load_game(session.game).await?;
    match engine::apply_move(&mut board, session.color, start, end) {
        Err(rejection) => {
            debug!(game = %session.game, start, end, %rejection, "move rejected");
            let _ = tx.send(board.encode(board.is_turn_of(session.color)).to_vec());
        }
        Ok(_) => {
            state.store.save_game(session.game, &board).await?;
            state.registry.broadcast_others(session.game, session.peer, |color| {
                board.encode(board.is_turn_of(color)).to_vec()
            });
        }
    }
    Ok(())
}
