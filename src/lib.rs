//! Multi-room server for Singaporean-style mahjong.
//!
//! The crate is split along its trust boundaries: [`round`] is the
//! authoritative state machine for a single round, [`room`] serializes
//! player actions around it and fans out per-seat views to subscribers
//! (bots included), and [`server`] puts an HTTP/SSE surface on top.

pub mod bag;
pub mod hand;
pub mod meld;
pub mod room;
pub mod round;
pub mod server;
pub mod tile;

pub use bag::TileBag;
pub use hand::Hand;
pub use meld::Meld;
pub use tile::{Direction, Suit, Tile};
