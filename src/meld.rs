use std::cmp::Ordering;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tile::Tile;

/// A melded set. Chi carries its three tiles in ascending order; the other
/// variants are fully described by a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Meld {
    Chi([Tile; 3]),
    Pong(Tile),
    Gang(Tile),
    Eyes(Tile),
}

impl Meld {
    /// Builds a chi from three tiles in any order.
    #[must_use]
    pub fn chi(a: Tile, b: Tile, c: Tile) -> Self {
        let mut tiles = [a, b, c];
        tiles.sort_unstable();
        Self::Chi(tiles)
    }

    #[must_use]
    pub const fn first_tile(&self) -> Tile {
        match self {
            Self::Chi([t, _, _]) | Self::Pong(t) | Self::Gang(t) | Self::Eyes(t) => *t,
        }
    }

    /// The full tile list covered by this meld.
    #[must_use]
    pub fn tiles(&self) -> Vec<Tile> {
        match *self {
            Self::Chi(tiles) => tiles.to_vec(),
            Self::Pong(t) => vec![t; 3],
            Self::Gang(t) => vec![t; 4],
            Self::Eyes(t) => vec![t; 2],
        }
    }

    const fn kind_str(&self) -> &'static str {
        match self {
            Self::Chi(_) => "chi",
            Self::Pong(_) => "pong",
            Self::Gang(_) => "gang",
            Self::Eyes(_) => "eyes",
        }
    }

    const fn kind_rank(&self) -> u8 {
        match self {
            Self::Chi(_) => 0,
            Self::Pong(_) => 1,
            Self::Gang(_) => 2,
            Self::Eyes(_) => 3,
        }
    }
}

impl PartialOrd for Meld {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Meld {
    fn cmp(&self, other: &Self) -> Ordering {
        self.first_tile()
            .cmp(&other.first_tile())
            .then_with(|| self.kind_rank().cmp(&other.kind_rank()))
    }
}

#[derive(Serialize, Deserialize)]
struct MeldWire {
    #[serde(rename = "type")]
    kind: String,
    tiles: Vec<Tile>,
}

impl Serialize for Meld {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let tiles = match *self {
            Self::Chi(tiles) => tiles.to_vec(),
            Self::Pong(t) | Self::Gang(t) | Self::Eyes(t) => vec![t],
        };
        MeldWire {
            kind: self.kind_str().to_owned(),
            tiles,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Meld {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = MeldWire::deserialize(deserializer)?;
        match (wire.kind.as_str(), wire.tiles.as_slice()) {
            ("chi", &[a, b, c]) => Ok(Self::chi(a, b, c)),
            ("pong", &[t]) => Ok(Self::Pong(t)),
            ("gang", &[t]) => Ok(Self::Gang(t)),
            ("eyes", &[t]) => Ok(Self::Eyes(t)),
            (kind, tiles) => Err(de::Error::custom(format!(
                "invalid meld: type {kind:?} with {} tiles",
                tiles.len(),
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chi_sorts_tiles() {
        let meld = Meld::chi(Tile::DOTS_3, Tile::DOTS_1, Tile::DOTS_2);
        assert_eq!(meld, Meld::Chi([Tile::DOTS_1, Tile::DOTS_2, Tile::DOTS_3]));
        assert_eq!(meld.first_tile(), Tile::DOTS_1);
    }

    #[test]
    fn tiles_expand() {
        assert_eq!(Meld::Pong(Tile::EAST).tiles(), vec![Tile::EAST; 3]);
        assert_eq!(Meld::Gang(Tile::RED).tiles(), vec![Tile::RED; 4]);
        assert_eq!(Meld::Eyes(Tile::DOTS_9).tiles(), vec![Tile::DOTS_9; 2]);
        assert_eq!(
            Meld::chi(Tile::BAMBOO_1, Tile::BAMBOO_2, Tile::BAMBOO_3).tiles().len(),
            3,
        );
    }

    #[test]
    fn ordering_by_first_tile() {
        let mut melds = vec![
            Meld::Pong(Tile::EAST),
            Meld::chi(Tile::DOTS_1, Tile::DOTS_2, Tile::DOTS_3),
            Meld::Eyes(Tile::BAMBOO_5),
        ];
        melds.sort();
        assert_eq!(melds[0].first_tile(), Tile::DOTS_1);
        assert_eq!(melds[1].first_tile(), Tile::BAMBOO_5);
        assert_eq!(melds[2].first_tile(), Tile::EAST);
    }

    #[test]
    fn serde_wire_format() {
        let pong = Meld::Pong(Tile::RED);
        let json = serde_json::to_string(&pong).unwrap();
        assert_eq!(json, r#"{"type":"pong","tiles":["44红中"]}"#);
        assert_eq!(serde_json::from_str::<Meld>(&json).unwrap(), pong);

        let chi = Meld::chi(Tile::DOTS_1, Tile::DOTS_2, Tile::DOTS_3);
        let json = serde_json::to_string(&chi).unwrap();
        assert_eq!(json, r#"{"type":"chi","tiles":["13一筒","14二筒","15三筒"]}"#);
        assert_eq!(serde_json::from_str::<Meld>(&json).unwrap(), chi);

        serde_json::from_str::<Meld>(r#"{"type":"chi","tiles":["13一筒"]}"#).unwrap_err();
        serde_json::from_str::<Meld>(r#"{"type":"kong","tiles":["44红中"]}"#).unwrap_err();
    }
}
