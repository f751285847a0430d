//! Move validation and application.
//!
//! Every precondition is checked before the board is touched: a rejected move
//! leaves the board exactly as loaded and the caller answers the client with
//! an unchanged snapshot. There is deliberately no check detection; the game
//! ends when a king is captured.

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::board::{row_col, Board, Color, GameResult, Move, BLACK_KING_SLOT, WHITE_KING_SLOT};
use crate::movement;

/// Why a proposed move was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("square index out of range")]
    OffBoard,
    #[error("no piece on the start square")]
    EmptySquare,
    #[error("piece belongs to the opponent")]
    NotYourPiece,
    #[error("not your turn")]
    NotYourTurn,
    #[error("piece cannot move that way")]
    IllegalGeometry,
    #[error("path is obstructed")]
    Obstructed,
    #[error("destination holds your own piece")]
    FriendlyCapture,
}

/// Validates `mover`'s move from `start` to `end` and applies it. On success
/// the board is mutated, the result recomputed and the applied move recorded
/// and returned; on rejection the board is untouched.
pub fn apply_move(
    board: &mut Board,
    mover: Color,
    start: u8,
    end: u8,
) -> Result<Move, MoveRejection> {
    if start > 63 || end > 63 {
        return Err(MoveRejection::OffBoard);
    }
    let (color, piece) = board.piece_at(start).ok_or(MoveRejection::EmptySquare)?;
    if color != mover {
        return Err(MoveRejection::NotYourPiece);
    }
    if board.to_move() != mover {
        return Err(MoveRejection::NotYourTurn);
    }

    let from = row_col(start);
    let to = row_col(end);
    let direction = mover.forward();
    let target = board.piece_at(end);
    let target_capturable = target.is_some_and(|(c, _)| c != mover);

    let geometry_ok = movement::rules_for(piece)
        .iter()
        .any(|rule| rule.matches(from, to, direction, target_capturable));
    if !geometry_ok {
        return Err(MoveRejection::IllegalGeometry);
    }
    if has_obstruction(board, from, to) {
        return Err(MoveRejection::Obstructed);
    }
    if target.is_some() && !target_capturable {
        return Err(MoveRejection::FriendlyCapture);
    }

    board.relocate(start, end);
    board.set_result(compute_result(board));
    let mv = Move {
        start,
        end,
        color: mover,
        piece,
        timestamp: Utc::now(),
    };
    board.record_move(mv.clone());
    debug!(?mover, ?piece, start, end, "move applied");
    Ok(mv)
}

/// Walks the squares strictly between `from` and `to` along a straight or
/// diagonal path. Knight moves are not collinear and have no path to walk;
/// single-step moves have an empty one. A pawn double-step does pass over its
/// intermediate square and is blocked by it.
fn has_obstruction(board: &Board, from: (i8, i8), to: (i8, i8)) -> bool {
    let d_row = to.0 - from.0;
    let d_col = to.1 - from.1;
    let collinear = d_row == 0 || d_col == 0 || d_row.abs() == d_col.abs();
    if !collinear {
        return false;
    }
    let step = (d_row.signum(), d_col.signum());
    let (mut row, mut col) = (from.0 + step.0, from.1 + step.1);
    while (row, col) != to {
        if board.piece_at((row * 8 + col) as u8).is_some() {
            return true;
        }
        row += step.0;
        col += step.1;
    }
    false
}

fn compute_result(board: &Board) -> GameResult {
    if board.positions()[BLACK_KING_SLOT].is_none() {
        GameResult::WhiteWins
    } else if board.positions()[WHITE_KING_SLOT].is_none() {
        GameResult::BlackWins
    } else {
        GameResult::Ongoing
    }
}
