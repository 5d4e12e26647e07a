use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use ahash::AHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of distinct tile kinds: 12 bonus tiles plus the 34 tiles that make
/// up the wall proper.
pub const TILE_KINDS: usize = 46;

/// Wire strings for every tile. The two-digit prefix doubles as the sort key,
/// so the `u8` id order and the string order always agree.
const TILE_STRINGS: [&str; TILE_KINDS] = [
    "01猫", "02老鼠", "03公鸡", "04蜈蚣", // animals
    "05梅", "06兰", "07菊", "08竹", // gentlemen
    "09春", "10夏", "11秋", "12冬", // seasons
    "13一筒", "14二筒", "15三筒", "16四筒", "17五筒", "18六筒", "19七筒", "20八筒", "21九筒",
    "22一索", "23二索", "24三索", "25四索", "26五索", "27六索", "28七索", "29八索", "30九索",
    "31一万", "32二万", "33三万", "34四万", "35五万", "36六万", "37七万", "38八万", "39九万",
    "40东风", "41南风", "42西风", "43北风", // winds
    "44红中", "45青发", "46白板", // dragons
];

static TILE_STRINGS_MAP: LazyLock<AHashMap<&'static str, Tile>> = LazyLock::new(|| {
    TILE_STRINGS
        .iter()
        .enumerate()
        .map(|(id, &s)| (s, Tile(id as u8)))
        .collect()
});

/// A single mahjong tile, identified by its position in the display order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tile(u8);

#[derive(Debug)]
pub enum InvalidTile {
    Number(usize),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    Flowers,
    Dots,
    Bamboo,
    Characters,
    Winds,
    Dragons,
}

impl Tile {
    pub const CAT: Self = Self(0);
    pub const RAT: Self = Self(1);
    pub const ROOSTER: Self = Self(2);
    pub const CENTIPEDE: Self = Self(3);
    pub const GENTLEMAN_1: Self = Self(4);
    pub const GENTLEMAN_2: Self = Self(5);
    pub const GENTLEMAN_3: Self = Self(6);
    pub const GENTLEMAN_4: Self = Self(7);
    pub const SEASON_1: Self = Self(8);
    pub const SEASON_2: Self = Self(9);
    pub const SEASON_3: Self = Self(10);
    pub const SEASON_4: Self = Self(11);
    pub const DOTS_1: Self = Self(12);
    pub const DOTS_2: Self = Self(13);
    pub const DOTS_3: Self = Self(14);
    pub const DOTS_4: Self = Self(15);
    pub const DOTS_5: Self = Self(16);
    pub const DOTS_6: Self = Self(17);
    pub const DOTS_7: Self = Self(18);
    pub const DOTS_8: Self = Self(19);
    pub const DOTS_9: Self = Self(20);
    pub const BAMBOO_1: Self = Self(21);
    pub const BAMBOO_2: Self = Self(22);
    pub const BAMBOO_3: Self = Self(23);
    pub const BAMBOO_4: Self = Self(24);
    pub const BAMBOO_5: Self = Self(25);
    pub const BAMBOO_6: Self = Self(26);
    pub const BAMBOO_7: Self = Self(27);
    pub const BAMBOO_8: Self = Self(28);
    pub const BAMBOO_9: Self = Self(29);
    pub const CHARACTERS_1: Self = Self(30);
    pub const CHARACTERS_2: Self = Self(31);
    pub const CHARACTERS_3: Self = Self(32);
    pub const CHARACTERS_4: Self = Self(33);
    pub const CHARACTERS_5: Self = Self(34);
    pub const CHARACTERS_6: Self = Self(35);
    pub const CHARACTERS_7: Self = Self(36);
    pub const CHARACTERS_8: Self = Self(37);
    pub const CHARACTERS_9: Self = Self(38);
    pub const EAST: Self = Self(39);
    pub const SOUTH: Self = Self(40);
    pub const WEST: Self = Self(41);
    pub const NORTH: Self = Self(42);
    pub const RED: Self = Self(43);
    pub const GREEN: Self = Self(44);
    pub const WHITE: Self = Self(45);

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// All 46 tile kinds in display order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..TILE_KINDS as u8).map(Self)
    }

    /// The 12 bonus tiles, which appear once each in the wall.
    pub fn flowers() -> impl Iterator<Item = Self> {
        (0..12).map(Self)
    }

    /// The 34 tiles that appear four times each in the wall.
    pub fn wall_tiles() -> impl Iterator<Item = Self> {
        (12..TILE_KINDS as u8).map(Self)
    }

    #[inline]
    #[must_use]
    pub const fn suit(self) -> Suit {
        match self.0 {
            0..=11 => Suit::Flowers,
            12..=20 => Suit::Dots,
            21..=29 => Suit::Bamboo,
            30..=38 => Suit::Characters,
            39..=42 => Suit::Winds,
            _ => Suit::Dragons,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_flower(self) -> bool {
        self.0 < 12
    }

    #[inline]
    #[must_use]
    pub const fn is_animal(self) -> bool {
        self.0 < 4
    }

    /// True for dots, bamboo and characters.
    #[inline]
    #[must_use]
    pub const fn is_suited(self) -> bool {
        matches!(self.suit(), Suit::Dots | Suit::Bamboo | Suit::Characters)
    }

    #[inline]
    #[must_use]
    pub const fn is_honor(self) -> bool {
        matches!(self.suit(), Suit::Winds | Suit::Dragons)
    }

    /// Rank 1-9 for suited tiles, `None` otherwise.
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self.suit() {
            Suit::Dots => Some(self.0 - 11),
            Suit::Bamboo => Some(self.0 - 20),
            Suit::Characters => Some(self.0 - 29),
            _ => None,
        }
    }

    /// The pairs of tiles that complete a run with this tile. Empty for
    /// flowers and honors.
    #[must_use]
    pub fn sequence_partners(self) -> &'static [(Tile, Tile)] {
        &SEQUENCE_PARTNERS[self.as_usize()]
    }
}

static SEQUENCE_PARTNERS: LazyLock<[Vec<(Tile, Tile)>; TILE_KINDS]> = LazyLock::new(|| {
    std::array::from_fn(|id| {
        let tile = Tile(id as u8);
        let Some(rank) = tile.rank() else {
            return Vec::new();
        };
        let at = |r: u8| Tile(tile.0 + r - rank);
        let mut partners = Vec::new();
        if rank >= 3 {
            partners.push((at(rank - 2), at(rank - 1)));
        }
        if (2..=8).contains(&rank) {
            partners.push((at(rank - 1), at(rank + 1)));
        }
        if rank <= 7 {
            partners.push((at(rank + 1), at(rank + 2)));
        }
        partners
    })
});

/// True iff the three tiles, in any order, form a run of the same suit.
#[must_use]
pub fn is_valid_sequence(a: Tile, b: Tile, c: Tile) -> bool {
    if !a.is_suited() || a.suit() != b.suit() || a.suit() != c.suit() {
        return false;
    }
    let mut ranks = [a.rank().unwrap(), b.rank().unwrap(), c.rank().unwrap()];
    ranks.sort_unstable();
    ranks[0] + 1 == ranks[1] && ranks[1] + 1 == ranks[2]
}

impl TryFrom<u8> for Tile {
    type Error = InvalidTile;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::try_from(v as usize)
    }
}

impl TryFrom<usize> for Tile {
    type Error = InvalidTile;

    fn try_from(v: usize) -> Result<Self, Self::Error> {
        if v >= TILE_KINDS {
            Err(InvalidTile::Number(v))
        } else {
            Ok(Self(v as u8))
        }
    }
}

impl FromStr for Tile {
    type Err = InvalidTile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TILE_STRINGS_MAP
            .get(s)
            .copied()
            .ok_or_else(|| InvalidTile::String(s.to_owned()))
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self, f)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(TILE_STRINGS[self.0 as usize])
    }
}

impl<'de> Deserialize<'de> for Tile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tile = String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)?;
        Ok(tile)
    }
}

impl Serialize for Tile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl fmt::Display for InvalidTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "not a valid tile id: {n}"),
            Self::String(s) => write!(f, "not a valid tile: \"{s}\""),
        }
    }
}

impl std::error::Error for InvalidTile {}

/// Seat and prevailing winds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

impl Direction {
    /// The wind tile matching this direction.
    #[must_use]
    pub const fn tile(self) -> Tile {
        match self {
            Self::East => Tile::EAST,
            Self::South => Tile::SOUTH,
            Self::West => Tile::WEST,
            Self::North => Tile::NORTH,
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
            Self::North => Self::East,
        }
    }
}

impl From<u8> for Direction {
    fn from(val: u8) -> Self {
        match val % 4 {
            0 => Self::East,
            1 => Self::South,
            2 => Self::West,
            _ => Self::North,
        }
    }
}

impl Serialize for Direction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = u8::deserialize(deserializer)?;
        if v > 3 {
            return Err(serde::de::Error::custom(format!("invalid direction: {v}")));
        }
        Ok(Self::from(v))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn convert() {
        "40东风".parse::<Tile>().unwrap();
        "01猫".parse::<Tile>().unwrap();
        "46白板".parse::<Tile>().unwrap();
        Tile::try_from(0_u8).unwrap();
        Tile::try_from(45_u8).unwrap();

        "".parse::<Tile>().unwrap_err();
        "东风".parse::<Tile>().unwrap_err();
        "47猫".parse::<Tile>().unwrap_err();
        Tile::try_from(46_u8).unwrap_err();
        Tile::try_from(u8::MAX).unwrap_err();

        for tile in Tile::all() {
            let s = tile.to_string();
            assert_eq!(s.parse::<Tile>().unwrap(), tile);
        }
    }

    #[test]
    fn order_matches_prefix() {
        let mut tiles: Vec<Tile> = Tile::all().collect();
        tiles.sort();
        let strings: Vec<String> = tiles.iter().map(Tile::to_string).collect();
        let mut sorted = strings.clone();
        sorted.sort();
        assert_eq!(strings, sorted);
    }

    #[test]
    fn suits() {
        assert_eq!(Tile::CAT.suit(), Suit::Flowers);
        assert_eq!(Tile::SEASON_4.suit(), Suit::Flowers);
        assert_eq!(Tile::DOTS_1.suit(), Suit::Dots);
        assert_eq!(Tile::BAMBOO_9.suit(), Suit::Bamboo);
        assert_eq!(Tile::CHARACTERS_5.suit(), Suit::Characters);
        assert_eq!(Tile::NORTH.suit(), Suit::Winds);
        assert_eq!(Tile::WHITE.suit(), Suit::Dragons);

        assert_eq!(Tile::flowers().count(), 12);
        assert_eq!(Tile::wall_tiles().count(), 34);
        assert!(Tile::wall_tiles().all(|t| !t.is_flower()));
    }

    #[test]
    fn ranks() {
        assert_eq!(Tile::DOTS_1.rank(), Some(1));
        assert_eq!(Tile::DOTS_9.rank(), Some(9));
        assert_eq!(Tile::BAMBOO_5.rank(), Some(5));
        assert_eq!(Tile::CHARACTERS_9.rank(), Some(9));
        assert_eq!(Tile::EAST.rank(), None);
        assert_eq!(Tile::CAT.rank(), None);
    }

    #[test]
    fn sequences() {
        assert!(is_valid_sequence(Tile::DOTS_1, Tile::DOTS_2, Tile::DOTS_3));
        assert!(is_valid_sequence(Tile::DOTS_3, Tile::DOTS_1, Tile::DOTS_2));
        assert!(is_valid_sequence(
            Tile::CHARACTERS_7,
            Tile::CHARACTERS_9,
            Tile::CHARACTERS_8,
        ));
        assert!(!is_valid_sequence(Tile::DOTS_1, Tile::DOTS_2, Tile::DOTS_4));
        assert!(!is_valid_sequence(Tile::DOTS_1, Tile::BAMBOO_2, Tile::DOTS_3));
        assert!(!is_valid_sequence(Tile::EAST, Tile::SOUTH, Tile::WEST));
        assert!(!is_valid_sequence(Tile::DOTS_8, Tile::DOTS_9, Tile::BAMBOO_1));
    }

    #[test]
    fn partners() {
        assert_eq!(
            Tile::DOTS_1.sequence_partners(),
            &[(Tile::DOTS_2, Tile::DOTS_3)],
        );
        assert_eq!(
            Tile::DOTS_2.sequence_partners(),
            &[(Tile::DOTS_1, Tile::DOTS_3), (Tile::DOTS_3, Tile::DOTS_4)],
        );
        assert_eq!(
            Tile::BAMBOO_5.sequence_partners(),
            &[
                (Tile::BAMBOO_3, Tile::BAMBOO_4),
                (Tile::BAMBOO_4, Tile::BAMBOO_6),
                (Tile::BAMBOO_6, Tile::BAMBOO_7),
            ],
        );
        assert_eq!(
            Tile::CHARACTERS_9.sequence_partners(),
            &[(Tile::CHARACTERS_7, Tile::CHARACTERS_8)],
        );
        assert!(Tile::EAST.sequence_partners().is_empty());
        assert!(Tile::CAT.sequence_partners().is_empty());
    }

    #[test]
    fn direction_wraps() {
        assert_eq!(Direction::from(0), Direction::East);
        assert_eq!(Direction::from(5), Direction::South);
        assert_eq!(Direction::North.next(), Direction::East);
        assert_eq!(Direction::East.tile(), Tile::EAST);
    }
}
