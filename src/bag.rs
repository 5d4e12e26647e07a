use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tile::{Tile, TILE_KINDS};

/// A multiset of tiles, stored as a histogram over tile kinds.
///
/// Serializes as a sorted list of tile strings so that a player's own
/// concealed hand can go straight onto the wire.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TileBag([u8; TILE_KINDS]);

impl Default for TileBag {
    fn default() -> Self {
        Self([0; TILE_KINDS])
    }
}

impl TileBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tile: Tile) {
        self.0[tile.as_usize()] += 1;
    }

    /// Removes one copy. No-op returning false when absent.
    pub fn remove(&mut self, tile: Tile) -> bool {
        self.remove_n(tile, 1)
    }

    /// Removes `n` copies, or nothing at all if fewer than `n` are present.
    pub fn remove_n(&mut self, tile: Tile, n: u8) -> bool {
        let count = &mut self.0[tile.as_usize()];
        if *count < n {
            return false;
        }
        *count -= n;
        true
    }

    #[must_use]
    pub fn contains(&self, tile: Tile) -> bool {
        self.0[tile.as_usize()] > 0
    }

    #[must_use]
    pub fn count(&self, tile: Tile) -> u8 {
        self.0[tile.as_usize()]
    }

    /// Total number of tiles, counting multiplicity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.iter().map(|&c| c as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }

    /// Number of distinct kinds present.
    #[must_use]
    pub fn kinds(&self) -> usize {
        self.0.iter().filter(|&&c| c > 0).count()
    }

    /// Distinct kinds with their counts, in ascending tile order.
    pub fn distinct(&self) -> impl Iterator<Item = (Tile, u8)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(id, &c)| (Tile::try_from(id).unwrap(), c))
    }

    /// Every tile with multiplicity, in ascending order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.distinct()
            .flat_map(|(tile, count)| std::iter::repeat(tile).take(count as usize))
    }
}

impl FromIterator<Tile> for TileBag {
    fn from_iter<I: IntoIterator<Item = Tile>>(iter: I) -> Self {
        let mut bag = Self::new();
        for tile in iter {
            bag.add(tile);
        }
        bag
    }
}

impl Extend<Tile> for TileBag {
    fn extend<I: IntoIterator<Item = Tile>>(&mut self, iter: I) {
        for tile in iter {
            self.add(tile);
        }
    }
}

impl fmt::Debug for TileBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tiles()).finish()
    }
}

impl Serialize for TileBag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.tiles())
    }
}

impl<'de> Deserialize<'de> for TileBag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tiles = Vec::<Tile>::deserialize(deserializer)?;
        Ok(tiles.into_iter().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_remove_count() {
        let mut bag = TileBag::new();
        assert!(bag.is_empty());

        bag.add(Tile::DOTS_1);
        bag.add(Tile::DOTS_1);
        bag.add(Tile::EAST);
        assert_eq!(bag.len(), 3);
        assert_eq!(bag.kinds(), 2);
        assert_eq!(bag.count(Tile::DOTS_1), 2);
        assert!(bag.contains(Tile::EAST));
        assert!(!bag.contains(Tile::WEST));

        assert!(bag.remove(Tile::DOTS_1));
        assert_eq!(bag.count(Tile::DOTS_1), 1);
        assert!(!bag.remove(Tile::WEST));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn remove_n_is_atomic() {
        let mut bag: TileBag = [Tile::BAMBOO_3, Tile::BAMBOO_3].into_iter().collect();
        assert!(!bag.remove_n(Tile::BAMBOO_3, 3));
        assert_eq!(bag.count(Tile::BAMBOO_3), 2);
        assert!(bag.remove_n(Tile::BAMBOO_3, 2));
        assert!(bag.is_empty());
    }

    #[test]
    fn tiles_are_sorted() {
        let bag: TileBag = [Tile::WEST, Tile::DOTS_1, Tile::WEST, Tile::BAMBOO_2]
            .into_iter()
            .collect();
        let tiles: Vec<Tile> = bag.tiles().collect();
        assert_eq!(tiles, vec![Tile::DOTS_1, Tile::BAMBOO_2, Tile::WEST, Tile::WEST]);
    }

    #[test]
    fn serde_round_trip() {
        let bag: TileBag = [Tile::RED, Tile::DOTS_5, Tile::DOTS_5].into_iter().collect();
        let json = serde_json::to_string(&bag).unwrap();
        assert_eq!(json, r#"["17五筒","17五筒","44红中"]"#);
        let back: TileBag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bag);
    }
}
