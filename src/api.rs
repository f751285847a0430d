//! HTTP surface: auth, game management and the WebSocket upgrade.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::error::AppError;
use crate::store::{GameSummary, Store};
use crate::ws::{self, Registry};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub registry: Arc<Registry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/games", post(create_game).get(list_games))
        .route("/games/{id}/join", post(join_game))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

#[derive(Serialize)]
struct CreateGameResponse {
    game_id: Uuid,
}

async fn create_game(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<CreateGameResponse>), AppError> {
    let email = auth::authenticate(&state.store, &headers).await?;
    let game_id = state.store.create_game(&email).await?;
    Ok((StatusCode::CREATED, Json(CreateGameResponse { game_id })))
}

async fn join_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let email = auth::authenticate(&state.store, &headers).await?;
    state.store.join_game(game_id, &email).await?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

#[derive(Serialize)]
struct GameListResponse {
    games: Vec<GameSummary>,
    total: i64,
}

async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Json<GameListResponse>, AppError> {
    let email = auth::authenticate(&state.store, &headers).await?;
    let (games, total) = state.store.list_games(&email, query.page, query.limit).await?;
    Ok(Json(GameListResponse { games, total }))
}
