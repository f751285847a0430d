//! Movement geometry for the simplified rule set.
//!
//! Each piece type owns a fixed list of movement rules; a move is
//! geometrically legal when any rule in the list matches. The rules are pure
//! predicates over the from/to coordinates, the mover's forward direction and
//! whether the destination holds a capturable piece.

use crate::board::PieceType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementRule {
    /// Any distance along a rank or file.
    Straight,
    /// Any nonzero distance along a diagonal.
    Diagonal,
    /// One square diagonally.
    DiagonalStep,
    /// One square along a rank or file.
    OrthogonalStep,
    /// Two squares one axis, one square the other.
    KnightJump,
    /// One square toward the opposing side.
    ForwardStep,
    /// Two squares toward the opposing side, from the pawn rank only.
    DoubleStep,
    /// One square diagonally forward, onto an enemy piece.
    DiagonalCapture,
}

impl MovementRule {
    pub fn matches(
        self,
        from: (i8, i8),
        to: (i8, i8),
        direction: i8,
        target_capturable: bool,
    ) -> bool {
        let d_row = to.0 - from.0;
        let d_col = to.1 - from.1;
        match self {
            MovementRule::Straight => from.0 == to.0 || from.1 == to.1,
            MovementRule::Diagonal => d_row.abs() == d_col.abs() && d_row != 0,
            MovementRule::DiagonalStep => d_row.abs() == 1 && d_col.abs() == 1,
            MovementRule::OrthogonalStep => {
                (d_row == 0 && d_col.abs() == 1) || (d_row.abs() == 1 && d_col == 0)
            }
            MovementRule::KnightJump => {
                matches!((d_row.abs(), d_col.abs()), (2, 1) | (1, 2))
            }
            MovementRule::ForwardStep => d_row == direction && d_col == 0,
            MovementRule::DoubleStep => {
                let pawn_rank = if direction == 1 { 1 } else { 6 };
                from.0 == pawn_rank && d_row == 2 * direction && d_col == 0
            }
            MovementRule::DiagonalCapture => {
                target_capturable && d_row == direction && d_col.abs() == 1
            }
        }
    }
}

/// The fixed rule list of a piece type.
pub fn rules_for(piece: PieceType) -> &'static [MovementRule] {
    match piece {
        PieceType::Rook => &[MovementRule::Straight],
        PieceType::Knight => &[MovementRule::KnightJump],
        PieceType::Bishop => &[MovementRule::Diagonal],
        PieceType::Queen => &[MovementRule::Straight, MovementRule::Diagonal],
        PieceType::King => &[MovementRule::DiagonalStep, MovementRule::OrthogonalStep],
        PieceType::Pawn => &[
            MovementRule::ForwardStep,
            MovementRule::DoubleStep,
            MovementRule::DiagonalCapture,
        ],
    }
}
