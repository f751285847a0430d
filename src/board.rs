//! Canonical board representation and its 25-byte wire encoding.
//!
//! All 32 pieces live in fixed slots: per color, slots 0-7 are pawns, 8-9
//! rooks, 10-11 knights, 12-13 bishops, 14 the king and 15 the queen; White
//! owns slots 0-15, Black 16-31. A slot's piece identity never changes, only
//! the square it stands on (or `None` once captured).
//!
//! On the wire a captured slot packs as 0, which collides with a piece
//! legitimately standing on square 0. Byte 24 resolves the collision by
//! naming the color and type of the slot occupying square 0, and also carries
//! the turn flag and the game result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec;

/// Wire length of a full board snapshot: 24 packed bytes plus the header byte.
pub const SNAPSHOT_LEN: usize = 25;

pub const WHITE_KING_SLOT: usize = 14;
pub const BLACK_KING_SLOT: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Row delta of a forward pawn move: White advances toward row 7.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceType {
    pub fn code(self) -> u8 {
        match self {
            PieceType::King => 0,
            PieceType::Queen => 1,
            PieceType::Rook => 2,
            PieceType::Bishop => 3,
            PieceType::Knight => 4,
            PieceType::Pawn => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<PieceType> {
        match code {
            0 => Some(PieceType::King),
            1 => Some(PieceType::Queen),
            2 => Some(PieceType::Rook),
            3 => Some(PieceType::Bishop),
            4 => Some(PieceType::Knight),
            5 => Some(PieceType::Pawn),
            _ => None,
        }
    }
}

/// Header code meaning "no piece stands on square 0".
const NO_ZERO_PIECE: u8 = 7;

/// Per-color slot ordering; the slot index modulo 16 indexes into this.
pub const SLOT_SEQUENCE: [PieceType; 16] = [
    PieceType::Pawn,
    PieceType::Pawn,
    PieceType::Pawn,
    PieceType::Pawn,
    PieceType::Pawn,
    PieceType::Pawn,
    PieceType::Pawn,
    PieceType::Pawn,
    PieceType::Rook,
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Bishop,
    PieceType::King,
    PieceType::Queen,
];

/// Slot-to-square assignment of the standard starting position. The king
/// stands on column 3 and the queen on column 4 of each back rank.
pub const STARTING_POSITIONS: [u8; codec::SLOT_COUNT] = [
    8, 9, 10, 11, 12, 13, 14, 15, // white pawns
    0, 7, // white rooks
    1, 6, // white knights
    2, 5, // white bishops
    3,  // white king
    4,  // white queen
    48, 49, 50, 51, 52, 53, 54, 55, // black pawns
    56, 63, // black rooks
    57, 62, // black knights
    58, 61, // black bishops
    59, // black king
    60, // black queen
];

/// Permanent identity of a slot: color from the slot's half, type from the
/// canonical sequence.
pub fn slot_identity(slot: usize) -> (Color, PieceType) {
    let color = if slot < 16 { Color::White } else { Color::Black };
    (color, SLOT_SEQUENCE[slot % 16])
}

pub fn row_col(square: u8) -> (i8, i8) {
    ((square / 8) as i8, (square % 8) as i8)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    Waiting,
    Ongoing,
    Abandoned,
    Draw,
    BlackWins,
    WhiteWins,
}

impl GameResult {
    pub fn code(self) -> u8 {
        match self {
            GameResult::Waiting => 0,
            GameResult::Ongoing => 1,
            GameResult::Abandoned => 2,
            GameResult::Draw => 3,
            GameResult::BlackWins => 4,
            GameResult::WhiteWins => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<GameResult> {
        match code {
            0 => Some(GameResult::Waiting),
            1 => Some(GameResult::Ongoing),
            2 => Some(GameResult::Abandoned),
            3 => Some(GameResult::Draw),
            4 => Some(GameResult::BlackWins),
            5 => Some(GameResult::WhiteWins),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameResult::Waiting => "waiting",
            GameResult::Ongoing => "ongoing",
            GameResult::Abandoned => "abandoned",
            GameResult::Draw => "draw",
            GameResult::BlackWins => "black-wins",
            GameResult::WhiteWins => "white-wins",
        }
    }

    pub fn parse(value: &str) -> Option<GameResult> {
        match value {
            "waiting" => Some(GameResult::Waiting),
            "ongoing" => Some(GameResult::Ongoing),
            "abandoned" => Some(GameResult::Abandoned),
            "draw" => Some(GameResult::Draw),
            "black-wins" => Some(GameResult::BlackWins),
            "white-wins" => Some(GameResult::WhiteWins),
            _ => None,
        }
    }
}

/// One played move, in the order appended to the game's move list. The list
/// length's parity decides whose turn is next; turn state is never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub start: u8,
    pub end: u8,
    pub color: Color,
    pub piece: PieceType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("snapshot must be {SNAPSHOT_LEN} bytes, got {0}")]
    Length(usize),
    #[error("unknown game result code {0}")]
    Result(u8),
}

/// The fields packed into byte 24 of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateHeader {
    /// Identity of the slot occupying square 0, if any.
    pub zero: Option<(Color, PieceType)>,
    /// Whether it is the addressed player's turn.
    pub my_turn: bool,
    pub result: GameResult,
}

impl StateHeader {
    pub fn encode(&self) -> u8 {
        let mut byte = 0u8;
        match self.zero {
            Some((color, piece)) => {
                byte |= matches!(color, Color::Black) as u8;
                byte |= piece.code() << 1;
            }
            None => byte |= NO_ZERO_PIECE << 1,
        }
        byte |= (self.my_turn as u8) << 4;
        byte |= self.result.code() << 5;
        byte
    }

    pub fn decode(byte: u8) -> Result<StateHeader, WireError> {
        let color = if byte & 1 == 0 { Color::White } else { Color::Black };
        let zero = PieceType::from_code((byte >> 1) & 0b111).map(|piece| (color, piece));
        let result_code = (byte >> 5) & 0b111;
        Ok(StateHeader {
            zero,
            my_turn: (byte >> 4) & 1 == 1,
            result: GameResult::from_code(result_code).ok_or(WireError::Result(result_code))?,
        })
    }
}

/// Full game state as loaded from and written back to storage.
#[derive(Clone, Debug, PartialEq)]
pub struct Board {
    positions: [Option<u8>; codec::SLOT_COUNT],
    moves: Vec<Move>,
    result: GameResult,
}

impl Board {
    /// A fresh game: standard starting assignment, no moves, `Waiting`.
    pub fn starting() -> Board {
        Board {
            positions: STARTING_POSITIONS.map(Some),
            moves: Vec::new(),
            result: GameResult::Waiting,
        }
    }

    pub fn from_parts(
        positions: [Option<u8>; codec::SLOT_COUNT],
        moves: Vec<Move>,
        result: GameResult,
    ) -> Board {
        Board { positions, moves, result }
    }

    pub fn positions(&self) -> &[Option<u8>; codec::SLOT_COUNT] {
        &self.positions
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    /// Whose turn it is, derived from move-list parity. White moves first.
    pub fn to_move(&self) -> Color {
        if self.moves.len() % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Turn flag for a snapshot addressed to `color`.
    pub fn is_turn_of(&self, color: Color) -> bool {
        self.to_move() == color
    }

    fn slot_at(&self, square: u8) -> Option<usize> {
        self.positions.iter().position(|p| *p == Some(square))
    }

    pub fn piece_at(&self, square: u8) -> Option<(Color, PieceType)> {
        self.slot_at(square).map(slot_identity)
    }

    /// Moves the slot occupying `start` onto `end`, capturing whatever stood
    /// there. Callers have already validated the move.
    pub(crate) fn relocate(&mut self, start: u8, end: u8) {
        let from_slot = self.slot_at(start);
        let to_slot = self.slot_at(end);
        if let Some(slot) = to_slot {
            self.positions[slot] = None;
        }
        if let Some(slot) = from_slot {
            self.positions[slot] = Some(end);
        }
    }

    pub(crate) fn set_result(&mut self, result: GameResult) {
        self.result = result;
    }

    pub(crate) fn record_move(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    /// Encodes the snapshot with the turn flag addressed to one recipient.
    pub fn encode(&self, my_turn: bool) -> [u8; SNAPSHOT_LEN] {
        let values: Vec<u8> = self.positions.iter().map(|p| p.unwrap_or(0)).collect();
        let header = StateHeader {
            zero: self.slot_at(0).map(slot_identity),
            my_turn,
            result: self.result,
        };
        let mut out = [0u8; SNAPSHOT_LEN];
        out[..codec::PACKED_LEN].copy_from_slice(&codec::pack(&values));
        out[codec::PACKED_LEN] = header.encode();
        out
    }

    /// Decodes a snapshot. The move list is not part of the wire format and
    /// is supplied by the caller; the embedded turn flag is recipient-relative
    /// and therefore discarded.
    pub fn decode(bytes: &[u8], moves: Vec<Move>) -> Result<Board, WireError> {
        if bytes.len() != SNAPSHOT_LEN {
            return Err(WireError::Length(bytes.len()));
        }
        let header = StateHeader::decode(bytes[codec::PACKED_LEN])?;
        let values = codec::unpack(&bytes[..codec::PACKED_LEN], codec::SLOT_COUNT);
        // The designated square-0 occupant is the first slot of the header's
        // identity whose packed value is 0; every other packed 0 is a capture.
        let zero_slot = header.zero.and_then(|identity| {
            (0..codec::SLOT_COUNT).find(|&i| slot_identity(i) == identity && values[i] == 0)
        });
        let mut positions = [None; codec::SLOT_COUNT];
        for (slot, &value) in values.iter().enumerate() {
            positions[slot] = if value != 0 || zero_slot == Some(slot) {
                Some(value)
            } else {
                None
            };
        }
        Ok(Board { positions, moves, result: header.result })
    }
}
