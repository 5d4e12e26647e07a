use std::collections::VecDeque;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::hand::Hand;
use crate::tile::Tile;

/// Total tiles in a fresh wall: each of the 12 bonus tiles once, each of the
/// 34 ordinary tiles four times.
pub const TOTAL_TILES: usize = 148;

/// Builds a shuffled wall from a seed. The same seed always produces the same
/// wall, which is what makes rounds replayable.
#[must_use]
pub fn new_wall(seed: u64) -> VecDeque<Tile> {
    let mut tiles: Vec<Tile> = Tile::flowers().collect();
    for tile in Tile::wall_tiles() {
        tiles.extend([tile; 4]);
    }
    debug_assert_eq!(tiles.len(), TOTAL_TILES);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tiles.shuffle(&mut rng);
    tiles.into()
}

/// Deals starting hands from the wall. The dealer receives 14 tiles, the
/// other seats 13, then bonus tiles are swapped out for replacements drawn
/// from the back of the wall until no concealed flower remains.
pub(crate) fn deal(wall: &mut VecDeque<Tile>, dealer: usize) -> [Hand; 4] {
    let mut hands: [Hand; 4] = Default::default();
    let order = [dealer, (dealer + 1) % 4, (dealer + 2) % 4, (dealer + 3) % 4];

    // Three rounds of four tiles, then one more each, then the dealer's extra.
    for _ in 0..3 {
        for &seat in &order {
            hands[seat].concealed.extend(wall.drain(..4));
        }
    }
    for &seat in &order {
        let tile = wall.pop_front().expect("wall exhausted during deal");
        hands[seat].concealed.add(tile);
    }
    let tile = wall.pop_front().expect("wall exhausted during deal");
    hands[dealer].concealed.add(tile);

    // Flower replacement walks the seats in deal order. A seat whose
    // replacement was itself a flower is queued for another pass.
    let mut queue: VecDeque<usize> = order.into();
    while let Some(seat) = queue.pop_front() {
        let flowers: Vec<Tile> = hands[seat]
            .concealed
            .tiles()
            .filter(|t| t.is_flower())
            .collect();
        let mut again = false;
        for flower in flowers {
            hands[seat].concealed.remove(flower);
            hands[seat].flowers.push(flower);
            let replacement = wall.pop_back().expect("wall exhausted during deal");
            if replacement.is_flower() {
                again = true;
            }
            hands[seat].concealed.add(replacement);
        }
        if again {
            queue.push_back(seat);
        }
    }

    hands
}
