//! SQLite persistence: users, sessions and games.
//!
//! Game state is stored as the same 25-byte snapshot that goes over the wire,
//! next to a JSON move list. Boards are loaded fresh before every move and
//! written back after, so nothing here caches state across moves.

use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::board::{Board, Color, Move};
use crate::error::AppError;

#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

/// A player's seat in a game, resolved from a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seat {
    pub color: Color,
    pub player_white: String,
    pub player_black: Option<String>,
}

impl Seat {
    /// Identity pushed to the peer after a join; empty until Black is seated.
    pub fn opponent(&self) -> &str {
        match self.color {
            Color::White => self.player_black.as_deref().unwrap_or(""),
            Color::Black => &self.player_white,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GameSummary {
    pub id: String,
    pub player_white: String,
    pub player_black: Option<String>,
    pub result: String,
    pub created_at: chrono::NaiveDateTime,
}

impl Store {
    pub fn new(pool: Pool<Sqlite>) -> Store {
        Store { pool }
    }

    /// Creates the schema on startup; idempotent.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                player_white TEXT NOT NULL,
                player_black TEXT,
                moves TEXT NOT NULL DEFAULT '[]',
                snapshot BLOB NOT NULL,
                result TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        let result = sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(&id)
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(id),
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Err(AppError::Conflict("email already registered"))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn password_hash(&self, email: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("password_hash")))
    }

    /// Issues a fresh session for an authenticated player.
    pub async fn create_session(&self, email: &str) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO sessions (id, email) VALUES ($1, $2)")
            .bind(id.to_string())
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn session_email(&self, session: Uuid) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT email FROM sessions WHERE id = $1")
            .bind(session.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("email")))
    }

    /// Resolves a join packet: the session must exist and its player must be
    /// seated in the game.
    pub async fn validate_session(
        &self,
        session: Uuid,
        game: Uuid,
    ) -> Result<Option<Seat>, AppError> {
        let Some(email) = self.session_email(session).await? else {
            return Ok(None);
        };
        let row = sqlx::query("SELECT player_white, player_black FROM games WHERE id = $1")
            .bind(game.to_string())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let player_white: String = row.get("player_white");
        let player_black: Option<String> = row.get("player_black");
        let color = if email == player_white {
            Color::White
        } else if player_black.as_deref() == Some(email.as_str()) {
            Color::Black
        } else {
            return Ok(None);
        };
        Ok(Some(Seat { color, player_white, player_black }))
    }

    /// Creates a game with the creator seated as White and the standard
    /// starting position.
    pub async fn create_game(&self, white_email: &str) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let board = Board::starting();
        sqlx::query(
            "INSERT INTO games (id, player_white, snapshot, result) VALUES ($1, $2, $3, $4)",
        )
        .bind(id.to_string())
        .bind(white_email)
        .bind(board.encode(true).to_vec())
        .bind(board.result().as_str())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Seats the second player as Black.
    pub async fn join_game(&self, game: Uuid, black_email: &str) -> Result<(), AppError> {
        let updated = sqlx::query(
            "UPDATE games SET player_black = $1
             WHERE id = $2 AND player_black IS NULL AND player_white <> $1",
        )
        .bind(black_email)
        .bind(game.to_string())
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT id FROM games WHERE id = $1")
                .bind(game.to_string())
                .fetch_optional(&self.pool)
                .await?;
            return Err(if exists.is_some() {
                AppError::Conflict("seat is taken")
            } else {
                AppError::NotFound
            });
        }
        Ok(())
    }

    pub async fn load_game(&self, game: Uuid) -> Result<Board, AppError> {
        let row = sqlx::query("SELECT moves, snapshot FROM games WHERE id = $1")
            .bind(game.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)?;
        let moves_json: String = row.get("moves");
        let moves: Vec<Move> = serde_json::from_str(&moves_json)?;
        let snapshot: Vec<u8> = row.get("snapshot");
        Ok(Board::decode(&snapshot, moves)?)
    }

    /// Persists an accepted move: snapshot, move list and result in one
    /// statement.
    pub async fn save_game(&self, game: Uuid, board: &Board) -> Result<(), AppError> {
        let moves = serde_json::to_string(board.moves())?;
        let updated = sqlx::query("UPDATE games SET snapshot = $1, moves = $2, result = $3 WHERE id = $4")
            .bind(board.encode(true).to_vec())
            .bind(moves)
            .bind(board.result().as_str())
            .bind(game.to_string())
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// A player's games, newest first.
    pub async fn list_games(
        &self,
        email: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<GameSummary>, i64), AppError> {
        let limit = limit.clamp(1, 50) as i64;
        let offset = (i64::from(page.max(1)) - 1) * limit;
        let rows = sqlx::query(
            "SELECT id, player_white, player_black, result, created_at FROM games
             WHERE player_white = $1 OR player_black = $1
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(email)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let games = rows
            .into_iter()
            .map(|row| GameSummary {
                id: row.get("id"),
                player_white: row.get("player_white"),
                player_black: row.get("player_black"),
                result: row.get("result"),
                created_at: row.get("created_at"),
            })
            .collect();
        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM games WHERE player_white = $1 OR player_black = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?
        .get("total");
        Ok((games, total))
    }
}
