use serde::{Deserialize, Serialize};

use crate::tile::Tile;

/// Milliseconds since the Unix epoch, the time representation used on the
/// wire and for claim-window arithmetic.
pub type UnixMillis = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Draw,
    Discard,
    Chi,
    Pong,
    Gang,
    Hu,
    End,
}

/// One entry of a round's append-only transcript. Everything in here has
/// already been observed publicly; in particular a draw event never names the
/// drawn tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub seat: usize,
    pub time: UnixMillis,
    pub tiles: Vec<Tile>,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, seat: usize, time: UnixMillis, tiles: Vec<Tile>) -> Self {
        Self {
            kind,
            seat,
            time,
            tiles,
        }
    }
}
