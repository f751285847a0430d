//! Two-player real-time chess backend.
//!
//! Clients connect over a WebSocket, authenticate with a 32-byte join packet,
//! submit moves as 2-byte packets and receive the full board back as a
//! 25-byte binary snapshot after every change. The rule set is deliberately
//! simplified: no check detection, no castling, no en passant, no promotion;
//! the game ends when a king is captured.

pub mod api;
pub mod auth;
pub mod board;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod movement;
pub mod store;
pub mod ws;
