use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::meld::Meld;
use crate::tile::{Direction, Suit, Tile};

/// Scoring rules for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    /// When set, the discarder alone pays for a win off a discard.
    pub shooter: bool,
    /// Limit-hand value; also caps the points used for the payout.
    pub limit: i32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            shooter: false,
            limit: 5,
        }
    }
}

const DRAGONS: [Tile; 3] = [Tile::RED, Tile::GREEN, Tile::WHITE];
const WINDS: [Tile; 4] = [Tile::EAST, Tile::SOUTH, Tile::WEST, Tile::NORTH];
const TERMINALS_AND_HONORS: [Tile; 13] = [
    Tile::DOTS_1,
    Tile::DOTS_9,
    Tile::BAMBOO_1,
    Tile::BAMBOO_9,
    Tile::CHARACTERS_1,
    Tile::CHARACTERS_9,
    Tile::EAST,
    Tile::SOUTH,
    Tile::WEST,
    Tile::NORTH,
    Tile::RED,
    Tile::GREEN,
    Tile::WHITE,
];

/// Context the scorer needs from the round: wind state and the winner's
/// revealed bonus tiles. The melds themselves are authoritative for the hand.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScoreContext<'a> {
    pub prevailing: Direction,
    pub seat: usize,
    pub seat_wind: Direction,
    pub flowers: &'a [Tile],
}

const GENTLEMEN: [Tile; 4] = [
    Tile::GENTLEMAN_1,
    Tile::GENTLEMAN_2,
    Tile::GENTLEMAN_3,
    Tile::GENTLEMAN_4,
];
const SEASONS: [Tile; 4] = [Tile::SEASON_1, Tile::SEASON_2, Tile::SEASON_3, Tile::SEASON_4];

/// Animals match every seat; gentlemen and seasons match the seat of the
/// same index.
fn flower_matches_seat(flower: Tile, seat: usize) -> bool {
    flower.is_animal() || flower == GENTLEMEN[seat] || flower == SEASONS[seat]
}

fn gentlemen_set(flowers: &[Tile]) -> bool {
    GENTLEMEN.iter().all(|g| flowers.contains(g))
}

fn seasons_set(flowers: &[Tile]) -> bool {
    SEASONS.iter().all(|s| flowers.contains(s))
}

fn is_thirteen_wonders(tiles: &AHashMap<Tile, u8>) -> bool {
    let mut total = 0u8;
    for tile in TERMINALS_AND_HONORS {
        match tiles.get(&tile) {
            None => return false,
            Some(&count) => total += count,
        }
    }
    total == 14
}

/// Scores a complete winning hand (revealed melds plus one enumerated
/// decomposition of the concealed portion). Categories are additive except
/// for limit hands, which short-circuit to the configured limit.
pub(crate) fn score(rules: Rules, ctx: ScoreContext<'_>, melds: &[Meld]) -> i32 {
    let mut tally = 0;

    let mut chis = 0;
    let mut pongs_and_gangs = 0;
    let mut suits: Vec<Suit> = Vec::new();
    let mut tiles: AHashMap<Tile, u8> = AHashMap::new();
    for meld in melds {
        match meld {
            Meld::Chi(_) => chis += 1,
            Meld::Pong(_) | Meld::Gang(_) => pongs_and_gangs += 1,
            Meld::Eyes(_) => {}
        }
        let suit = meld.first_tile().suit();
        if !suits.contains(&suit) {
            suits.push(suit);
        }
        for tile in meld.tiles() {
            *tiles.entry(tile).or_default() += 1;
        }
    }

    // Suit purity. A full flush is a single ordinary suit with no honors;
    // one ordinary suit padded with honors is a half flush.
    let suited: Vec<Suit> = suits
        .iter()
        .copied()
        .filter(|s| matches!(s, Suit::Dots | Suit::Bamboo | Suit::Characters))
        .collect();
    let honors = suits.iter().any(|s| matches!(s, Suit::Winds | Suit::Dragons));
    if suited.len() == 1 {
        tally += if honors { 2 } else { 4 };
    }

    if chis == 4 {
        tally += if ctx.flowers.is_empty() { 4 } else { 1 };
    }
    if pongs_and_gangs == 4 {
        tally += 2;
    }

    for &flower in ctx.flowers {
        if flower_matches_seat(flower, ctx.seat) {
            tally += 1;
        }
    }
    match (gentlemen_set(ctx.flowers), seasons_set(ctx.flowers)) {
        (true, true) => return rules.limit,
        (true, false) | (false, true) => tally += 1,
        (false, false) => {}
    }

    let triplet_of = |tile: Tile| {
        melds
            .iter()
            .any(|m| matches!(m, Meld::Pong(t) | Meld::Gang(t) if *t == tile))
    };
    if DRAGONS.into_iter().all(triplet_of) {
        tally += 2; // on top of the per-dragon point below
    }
    if WINDS.into_iter().all(triplet_of) {
        return rules.limit;
    }
    if is_thirteen_wonders(&tiles) {
        return rules.limit;
    }

    for meld in melds {
        if let Meld::Pong(tile) | Meld::Gang(tile) = *meld {
            if DRAGONS.contains(&tile) {
                tally += 1;
            }
            if tile == ctx.seat_wind.tile() {
                tally += 1;
            }
            if tile == ctx.prevailing.tile() {
                tally += 1;
            }
        }
    }

    tally
}

/// Returns the score delta for each seat after a win. A self-draw is paid
/// double by everyone; a win off a discard is paid double by the discarder
/// and single by the rest, unless shooter rules put the whole bill on the
/// discarder.
pub(crate) fn winnings(rules: Rules, winner: usize, loser: i8, points: i32) -> [i32; 4] {
    let limit = if rules.limit > 0 { rules.limit } else { 5 };
    let delta = 1 << (points.min(limit) - 1);

    let mut deltas = [0; 4];
    for seat in 0..4 {
        if seat == winner {
            continue;
        }
        let payment = if loser == -1 {
            2 * delta
        } else if seat as i8 == loser {
            if rules.shooter {
                4 * delta
            } else {
                2 * delta
            }
        } else if rules.shooter {
            0
        } else {
            delta
        };
        deltas[seat] -= payment;
        deltas[winner] += payment;
    }
    deltas
}
