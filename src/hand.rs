use serde::{Deserialize, Serialize};

use crate::bag::TileBag;
use crate::meld::Meld;
use crate::tile::Tile;

/// One seat's tiles: revealed bonus tiles, revealed melds, the concealed
/// multiset, and the frozen winning tiles once the seat has won.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    pub flowers: Vec<Tile>,
    pub revealed: Vec<Meld>,
    pub concealed: TileBag,
    pub finished: Vec<Tile>,
}

/// Concealed tiles as seen by a viewer: identities for the owner's own hand,
/// bare cardinality for everyone else's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Concealed {
    Tiles(Vec<Tile>),
    Count(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandView {
    pub flowers: Vec<Tile>,
    pub revealed: Vec<Meld>,
    pub concealed: Concealed,
    pub finished: Vec<Tile>,
}

impl Hand {
    /// Number of tiles this seat controls towards the 13-tile invariant:
    /// concealed plus tiles locked up in revealed melds.
    #[must_use]
    pub fn tiles_in_play(&self) -> usize {
        let melded: usize = self
            .revealed
            .iter()
            .map(|meld| match meld {
                Meld::Chi(_) | Meld::Pong(_) => 3,
                Meld::Gang(_) => 4,
                Meld::Eyes(_) => 2,
            })
            .sum();
        self.concealed.len() + melded
    }

    #[must_use]
    pub fn view(&self, own: bool) -> HandView {
        HandView {
            flowers: self.flowers.clone(),
            revealed: self.revealed.clone(),
            concealed: if own {
                Concealed::Tiles(self.concealed.tiles().collect())
            } else {
                Concealed::Count(self.concealed.len())
            },
            finished: self.finished.clone(),
        }
    }
}
