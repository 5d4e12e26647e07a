use ahash::AHashSet;

use crate::bag::TileBag;
use crate::meld::Meld;
use crate::tile::Tile;

/// Enumerates every decomposition of `tiles` (plus an optional claimed tile)
/// into triples and a pair. Each result is a sorted meld list covering the
/// concealed portion only; revealed melds are the caller's business.
///
/// All decompositions are returned rather than just one, because different
/// decompositions of the same tiles can score differently.
pub(crate) fn winning_hands(tiles: &TileBag, extra: Option<Tile>) -> Vec<Vec<Meld>> {
    let mut initial = tiles.clone();
    if let Some(tile) = extra {
        initial.add(tile);
    }

    let mut results = Vec::new();
    let mut seen: AHashSet<(Vec<Meld>, TileBag)> = AHashSet::new();
    let mut stack = vec![(initial, Vec::new())];

    while let Some((bag, melds)) = stack.pop() {
        let mut key = melds.clone();
        key.sort_unstable();
        if !seen.insert((key, bag.clone())) {
            continue;
        }

        // Down to a single kind with two copies: the eyes complete the hand.
        if bag.kinds() == 1 {
            if let Some((tile, 2)) = bag.distinct().next() {
                let mut done = melds.clone();
                done.push(Meld::Eyes(tile));
                done.sort_unstable();
                results.push(done);
            }
        }

        for (tile, count) in bag.distinct() {
            if count >= 3 {
                let mut next_bag = bag.clone();
                next_bag.remove_n(tile, 3);
                let mut next_melds = melds.clone();
                next_melds.push(Meld::Pong(tile));
                stack.push((next_bag, next_melds));
            }
            for &(a, b) in tile.sequence_partners() {
                if bag.contains(a) && bag.contains(b) {
                    let mut next_bag = bag.clone();
                    next_bag.remove(tile);
                    next_bag.remove(a);
                    next_bag.remove(b);
                    let mut next_melds = melds.clone();
                    next_melds.push(Meld::chi(tile, a, b));
                    stack.push((next_bag, next_melds));
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod test {
    use super::*;

    fn bag(tiles: &[Tile]) -> TileBag {
        tiles.iter().copied().collect()
    }

    #[test]
    fn all_chi_hand() {
        let tiles = bag(&[
            Tile::DOTS_1,
            Tile::DOTS_2,
            Tile::DOTS_3,
            Tile::DOTS_4,
            Tile::DOTS_5,
            Tile::DOTS_6,
            Tile::BAMBOO_1,
            Tile::BAMBOO_2,
            Tile::BAMBOO_3,
            Tile::CHARACTERS_7,
            Tile::CHARACTERS_8,
            Tile::CHARACTERS_9,
            Tile::EAST,
            Tile::EAST,
        ]);
        let hands = winning_hands(&tiles, None);
        assert_eq!(hands.len(), 1);
        let melds = &hands[0];
        assert_eq!(melds.len(), 5);
        assert_eq!(
            melds.iter().filter(|m| matches!(m, Meld::Chi(_))).count(),
            4,
        );
        assert!(melds.contains(&Meld::Eyes(Tile::EAST)));
    }

    #[test]
    fn claimed_tile_completes_hand() {
        let tiles = bag(&[
            Tile::DOTS_1,
            Tile::DOTS_2,
            Tile::DOTS_3,
            Tile::BAMBOO_4,
            Tile::BAMBOO_5,
            Tile::BAMBOO_6,
            Tile::WEST,
            Tile::WEST,
            Tile::WEST,
            Tile::RED,
            Tile::RED,
            Tile::RED,
            Tile::DOTS_9,
        ]);
        assert!(winning_hands(&tiles, None).is_empty());
        let hands = winning_hands(&tiles, Some(Tile::DOTS_9));
        assert_eq!(hands.len(), 1);
        assert!(hands[0].contains(&Meld::Eyes(Tile::DOTS_9)));
    }

    #[test]
    fn ambiguous_hand_yields_every_decomposition() {
        // 111222333 dots decomposes as three pongs or three identical runs.
        let tiles = bag(&[
            Tile::DOTS_1,
            Tile::DOTS_1,
            Tile::DOTS_1,
            Tile::DOTS_2,
            Tile::DOTS_2,
            Tile::DOTS_2,
            Tile::DOTS_3,
            Tile::DOTS_3,
            Tile::DOTS_3,
            Tile::CHARACTERS_1,
            Tile::CHARACTERS_2,
            Tile::CHARACTERS_3,
            Tile::NORTH,
            Tile::NORTH,
        ]);
        let hands = winning_hands(&tiles, None);
        assert_eq!(hands.len(), 2);
        assert!(hands
            .iter()
            .any(|melds| melds.contains(&Meld::Pong(Tile::DOTS_1))));
        assert!(hands.iter().any(|melds| {
            melds
                .iter()
                .filter(|m| **m == Meld::chi(Tile::DOTS_1, Tile::DOTS_2, Tile::DOTS_3))
                .count()
                == 3
        }));
    }

    #[test]
    fn incomplete_hands_find_nothing() {
        assert!(winning_hands(&bag(&[Tile::DOTS_1]), None).is_empty());
        assert!(winning_hands(&bag(&[]), None).is_empty());

        let thirteen_orphans = bag(&[
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
            Tile::WHITE,
        ]);
        assert!(winning_hands(&thirteen_orphans, None).is_empty());
    }

    #[test]
    fn concealed_quad_is_not_a_meld() {
        // Four of a kind in the concealed hand cannot be split into a pong
        // plus a stray tile and still complete.
        let tiles = bag(&[
            Tile::DOTS_1,
            Tile::DOTS_1,
            Tile::DOTS_1,
            Tile::DOTS_1,
            Tile::BAMBOO_2,
            Tile::BAMBOO_3,
            Tile::BAMBOO_4,
            Tile::WEST,
            Tile::WEST,
            Tile::WEST,
            Tile::GREEN,
            Tile::GREEN,
            Tile::GREEN,
            Tile::RED,
        ]);
        assert!(winning_hands(&tiles, None).is_empty());
    }
}
