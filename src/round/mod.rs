//! A single round of the game: the authoritative state machine that owns the
//! wall, the four hands, the discard pile and the event transcript.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bag::TileBag;
use crate::hand::{Hand, HandView};
use crate::meld::Meld;
use crate::tile::{is_valid_sequence, Direction, Tile};

mod event;
mod score;
mod search;
pub(crate) mod wall;


pub use event::{Event, EventKind, UnixMillis};
pub use score::Rules;
pub use wall::{new_wall, TOTAL_TILES};

use score::ScoreContext;

/// Size of the dead wall. A round dries up once only these tiles remain:
/// drawing needs strictly more, discarding needs at least this many.
pub const MIN_TILES_LEFT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundError {
    WrongTurn,
    WrongPhase,
    MissingTiles,
    InvalidSequence,
    NoDiscards,
    ReservedDuration,
    NoDrawsLeft,
    DrawsRemaining,
    RoundFinished,
    TooLate,
    NoPrecedence,
    NoTai,
    Unfinished,
    NoMoreRounds,
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::WrongTurn => "wrong turn",
            Self::WrongPhase => "wrong phase",
            Self::MissingTiles => "missing tiles",
            Self::InvalidSequence => "invalid sequence",
            Self::NoDiscards => "no discards",
            Self::ReservedDuration => "cannot claim during reserved duration",
            Self::NoDrawsLeft => "no draws left",
            Self::DrawsRemaining => "some draws remaining",
            Self::RoundFinished => "round finished",
            Self::TooLate => "too late to claim",
            Self::NoPrecedence => "no precedence",
            Self::NoTai => "no tai",
            Self::Unfinished => "round not finished",
            Self::NoMoreRounds => "no more rounds",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for RoundError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Draw,
    Discard,
    Finished,
}

/// Outcome of a round. `winner`/`loser` of −1 mean a drawn round and a
/// self-draw win respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub dealer: usize,
    pub wind: Direction,
    pub winner: i8,
    pub loser: i8,
    pub points: i32,
    pub winning_tiles: Vec<Tile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub scores: [i32; 4],
    pub hands: [Hand; 4],
    pub wall: VecDeque<Tile>,
    pub discards: Vec<Tile>,
    pub wind: Direction,
    pub dealer: usize,
    pub turn: usize,
    pub phase: Phase,
    pub events: Vec<Event>,
    pub result: Option<RoundResult>,
    pub rules: Rules,
    pub finished: bool,
    /// Set once a discard has been claimed for a win, so that a claimant
    /// with higher precedence can contest the same tile.
    pub winning_tile: Option<Tile>,
    pub last_action_time: UnixMillis,
    pub reserved_duration: UnixMillis,
}

/// A seat's view of a round. Only the viewer's own concealed tiles are
/// listed; every other hand is reduced to a count. The wall never appears,
/// only the number of draws it has left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundView {
    pub seat: i8,
    pub scores: [i32; 4],
    pub hands: [HandView; 4],
    pub draws_left: i64,
    pub discards: Vec<Tile>,
    pub wind: Direction,
    pub dealer: usize,
    pub turn: usize,
    pub phase: Phase,
    pub events: Vec<Event>,
    pub result: Option<RoundResult>,
    pub last_action_time: UnixMillis,
    pub reserved_duration: UnixMillis,
    pub finished: bool,
}

impl Round {
    #[must_use]
    pub fn new(rules: Rules, reserved_duration: UnixMillis) -> Self {
        Self {
            scores: [0; 4],
            hands: Default::default(),
            wall: VecDeque::new(),
            discards: Vec::new(),
            wind: Direction::East,
            dealer: 0,
            turn: 0,
            phase: Phase::Discard,
            events: Vec::new(),
            result: None,
            rules,
            finished: false,
            winning_tile: None,
            last_action_time: 0,
            reserved_duration,
        }
    }

    /// Builds the wall from the seed and deals the starting hands. The
    /// dealer opens with 14 tiles and the round begins in its discard phase.
    pub fn start(&mut self, seed: u64, now: UnixMillis) {
        let mut wall = wall::new_wall(seed);
        self.hands = wall::deal(&mut wall, self.dealer);
        self.wall = wall;
        self.discards = Vec::new();
        self.turn = self.dealer;
        self.phase = Phase::Discard;
        self.result = None;
        self.finished = false;
        self.winning_tile = None;
        self.last_action_time = now;
        self.events = vec![Event::new(EventKind::Start, 0, now, Vec::new())];
    }

    fn last_discard(&self) -> Option<Tile> {
        self.discards.last().copied()
    }

    fn pop_last_discard(&mut self) -> Tile {
        self.discards.pop().expect("discard pile is empty")
    }

    fn previous_turn(&self) -> usize {
        (self.turn + 3) % 4
    }

    fn seat_wind(&self, seat: usize) -> Direction {
        Direction::from(((seat + 4 - self.dealer) % 4) as u8)
    }

    fn in_claim_window(&self, now: UnixMillis) -> bool {
        now < self.last_action_time + self.reserved_duration
    }

    /// Draws a replacement tile from the back of the wall, skimming off any
    /// flowers drawn along the way.
    fn replace_tile(&mut self) -> Result<(Tile, Vec<Tile>), RoundError> {
        let mut flowers = Vec::new();
        let mut drawn = self.wall.pop_back().ok_or(RoundError::NoDrawsLeft)?;
        while drawn.is_flower() {
            flowers.push(drawn);
            drawn = self.wall.pop_back().ok_or(RoundError::NoDrawsLeft)?;
        }
        Ok((drawn, flowers))
    }

    /// Draws from the front of the wall, replacing flowers from the back.
    /// Returns the tile that went into the hand and any flowers revealed.
    pub fn draw(&mut self, seat: usize, now: UnixMillis) -> Result<(Tile, Vec<Tile>), RoundError> {
        if self.turn != seat {
            return Err(RoundError::WrongTurn);
        }
        if self.phase != Phase::Draw {
            return Err(RoundError::WrongPhase);
        }
        if self.in_claim_window(now) {
            return Err(RoundError::ReservedDuration);
        }
        if self.wall.len() <= MIN_TILES_LEFT {
            return Err(RoundError::NoDrawsLeft);
        }
        let mut flowers = Vec::new();
        let mut drawn = self.wall.pop_front().ok_or(RoundError::NoDrawsLeft)?;
        while drawn.is_flower() {
            flowers.push(drawn);
            drawn = self.wall.pop_back().ok_or(RoundError::NoDrawsLeft)?;
        }
        let hand = &mut self.hands[seat];
        hand.concealed.add(drawn);
        hand.flowers.extend(flowers.iter().copied());
        self.phase = Phase::Discard;
        self.events
            .push(Event::new(EventKind::Draw, seat, now, Vec::new()));
        self.last_action_time = now;
        Ok((drawn, flowers))
    }

    pub fn discard(&mut self, seat: usize, now: UnixMillis, tile: Tile) -> Result<(), RoundError> {
        if self.turn != seat {
            return Err(RoundError::WrongTurn);
        }
        if self.phase != Phase::Discard {
            return Err(RoundError::WrongPhase);
        }
        if !self.hands[seat].concealed.contains(tile) {
            return Err(RoundError::MissingTiles);
        }
        if self.wall.len() < MIN_TILES_LEFT {
            return Err(RoundError::NoDrawsLeft);
        }
        self.hands[seat].concealed.remove(tile);
        self.discards.push(tile);
        self.turn = (seat + 1) % 4;
        self.phase = Phase::Draw;
        self.events
            .push(Event::new(EventKind::Discard, seat, now, vec![tile]));
        self.last_action_time = now;
        Ok(())
    }

    /// Claims the last discard to complete a run with `tile1` and `tile2`
    /// from the hand. Only the seat whose turn it is may chi, and only after
    /// the claim window has passed.
    pub fn chi(
        &mut self,
        seat: usize,
        now: UnixMillis,
        tile1: Tile,
        tile2: Tile,
    ) -> Result<(), RoundError> {
        if self.finished {
            return Err(RoundError::RoundFinished);
        }
        if self.turn != seat {
            return Err(RoundError::WrongTurn);
        }
        if self.phase != Phase::Draw {
            return Err(RoundError::WrongPhase);
        }
        let tile0 = self.last_discard().ok_or(RoundError::NoDiscards)?;
        if !is_valid_sequence(tile0, tile1, tile2) {
            return Err(RoundError::InvalidSequence);
        }
        let hand = &self.hands[seat];
        if !hand.concealed.contains(tile1) || !hand.concealed.contains(tile2) {
            return Err(RoundError::MissingTiles);
        }
        if self.in_claim_window(now) {
            return Err(RoundError::ReservedDuration);
        }
        self.pop_last_discard();
        let hand = &mut self.hands[seat];
        hand.concealed.remove(tile1);
        hand.concealed.remove(tile2);
        let meld = Meld::chi(tile0, tile1, tile2);
        hand.revealed.push(meld);
        self.phase = Phase::Discard;
        self.events
            .push(Event::new(EventKind::Chi, seat, now, meld.tiles()));
        self.last_action_time = now;
        Ok(())
    }

    /// Claims the last discard for a pong. Any seat but the discarder may
    /// pong, taking over the turn.
    pub fn pong(&mut self, seat: usize, now: UnixMillis) -> Result<(), RoundError> {
        if self.finished {
            return Err(RoundError::RoundFinished);
        }
        if seat == self.previous_turn() {
            return Err(RoundError::WrongTurn);
        }
        if self.phase != Phase::Draw {
            return Err(RoundError::WrongPhase);
        }
        let tile = self.last_discard().ok_or(RoundError::NoDiscards)?;
        if self.hands[seat].concealed.count(tile) < 2 {
            return Err(RoundError::MissingTiles);
        }
        self.pop_last_discard();
        let hand = &mut self.hands[seat];
        hand.concealed.remove_n(tile, 2);
        hand.revealed.push(Meld::Pong(tile));
        self.events
            .push(Event::new(EventKind::Pong, seat, now, vec![tile]));
        self.turn = seat;
        self.phase = Phase::Discard;
        self.last_action_time = now;
        Ok(())
    }

    /// Claims the last discard for a gang, then draws a replacement from the
    /// back of the wall.
    pub fn gang_from_discard(
        &mut self,
        seat: usize,
        now: UnixMillis,
    ) -> Result<(Tile, Vec<Tile>), RoundError> {
        if self.finished {
            return Err(RoundError::RoundFinished);
        }
        if seat == self.previous_turn() {
            return Err(RoundError::WrongTurn);
        }
        if self.phase != Phase::Draw {
            return Err(RoundError::WrongPhase);
        }
        let tile = self.last_discard().ok_or(RoundError::NoDiscards)?;
        if self.hands[seat].concealed.count(tile) < 3 {
            return Err(RoundError::MissingTiles);
        }
        self.pop_last_discard();
        self.hands[seat].concealed.remove_n(tile, 3);
        self.hands[seat].revealed.push(Meld::Gang(tile));
        let (replacement, flowers) = self.replace_tile()?;
        let hand = &mut self.hands[seat];
        hand.flowers.extend(flowers.iter().copied());
        hand.concealed.add(replacement);
        self.events
            .push(Event::new(EventKind::Gang, seat, now, vec![tile]));
        self.turn = seat;
        self.phase = Phase::Discard;
        self.last_action_time = now;
        Ok((replacement, flowers))
    }

    /// Declares a gang from the hand: either four concealed copies, or one
    /// concealed copy promoting an already revealed pong.
    pub fn gang_from_hand(
        &mut self,
        seat: usize,
        now: UnixMillis,
        tile: Tile,
    ) -> Result<(Tile, Vec<Tile>), RoundError> {
        if self.finished {
            return Err(RoundError::RoundFinished);
        }
        if self.turn != seat {
            return Err(RoundError::WrongTurn);
        }
        if self.phase != Phase::Discard {
            return Err(RoundError::WrongPhase);
        }
        if self.hands[seat].concealed.count(tile) >= 4 {
            self.hands[seat].concealed.remove_n(tile, 4);
            self.hands[seat].revealed.push(Meld::Gang(tile));
        } else {
            let promoted = self.hands[seat]
                .revealed
                .iter()
                .position(|m| *m == Meld::Pong(tile));
            match promoted {
                Some(i) if self.hands[seat].concealed.contains(tile) => {
                    self.hands[seat].concealed.remove(tile);
                    self.hands[seat].revealed[i] = Meld::Gang(tile);
                }
                _ => return Err(RoundError::MissingTiles),
            }
        }
        let (replacement, flowers) = self.replace_tile()?;
        let hand = &mut self.hands[seat];
        hand.flowers.extend(flowers.iter().copied());
        hand.concealed.add(replacement);
        self.events
            .push(Event::new(EventKind::Gang, seat, now, vec![tile]));
        self.last_action_time = now;
        Ok((replacement, flowers))
    }

    /// Scores the concealed hand (plus `extra` for a claimed tile) against
    /// every possible decomposition and keeps the best one.
    fn best_hand(&self, seat: usize, extra: Option<Tile>) -> Option<(Vec<Meld>, i32)> {
        let candidates = search::winning_hands(&self.hands[seat].concealed, extra);
        let ctx = ScoreContext {
            prevailing: self.wind,
            seat,
            seat_wind: self.seat_wind(seat),
            flowers: &self.hands[seat].flowers,
        };
        let mut best: Option<(Vec<Meld>, i32)> = None;
        for decomposition in candidates {
            let mut melds = self.hands[seat].revealed.clone();
            melds.extend(decomposition.iter().copied());
            let points = score::score(self.rules, ctx, &melds);
            if best.as_ref().map_or(true, |(_, p)| points > *p) {
                best = Some((decomposition, points));
            }
        }
        best
    }

    fn tsumo(&self, seat: usize) -> Result<(Vec<Meld>, i32), RoundError> {
        if self.finished {
            return Err(RoundError::RoundFinished);
        }
        let (best, points) = self
            .best_hand(seat, None)
            .ok_or(RoundError::MissingTiles)?;
        if points == 0 {
            return Err(RoundError::NoTai);
        }
        Ok((best, points))
    }

    fn ron(&mut self, seat: usize, now: UnixMillis) -> Result<(Vec<Meld>, i32, i8), RoundError> {
        let loser = self.previous_turn();
        let mut standing_winner = None;
        if self.finished {
            let result = self.result.as_ref().ok_or(RoundError::RoundFinished)?;
            // Only a win off a discard can be contested, and only by a
            // closer seat within the claim window.
            if result.loser == -1 {
                return Err(RoundError::RoundFinished);
            }
            if !self.in_claim_window(now) {
                return Err(RoundError::TooLate);
            }
            let winner_precedence = (result.winner as usize + 3 - loser) % 4;
            let precedence = (seat + 3 - loser) % 4;
            if precedence >= winner_precedence {
                return Err(RoundError::NoPrecedence);
            }
            standing_winner = Some(result.winner as usize);
        }
        let winning_tile = match self.winning_tile {
            Some(tile) => tile,
            None => self.last_discard().ok_or(RoundError::NoDiscards)?,
        };
        let (best, points) = self
            .best_hand(seat, Some(winning_tile))
            .ok_or(RoundError::MissingTiles)?;
        if points == 0 {
            return Err(RoundError::NoTai);
        }
        if let Some(winner) = standing_winner {
            // Take the contested tile back from the previous winner.
            let pile = &mut self.hands[winner].finished;
            if let Some(i) = pile.iter().position(|&t| t == winning_tile) {
                pile.remove(i);
            }
        } else {
            let tile = self.pop_last_discard();
            self.winning_tile = Some(tile);
        }
        Ok((best, points, loser as i8))
    }

    /// Declares a win: on the seat's own discard phase a self-draw,
    /// otherwise a claim on the last discard. A finished round still accepts
    /// a hu from a higher-precedence claimant inside the claim window, which
    /// reverses the earlier payout before applying its own.
    pub fn hu(&mut self, seat: usize, now: UnixMillis) -> Result<(), RoundError> {
        if seat == self.previous_turn() {
            return Err(RoundError::WrongTurn);
        }
        if self.turn != seat && self.phase == Phase::Discard {
            return Err(RoundError::WrongTurn);
        }
        let (best, points, loser) = if self.phase == Phase::Discard {
            let (best, points) = self.tsumo(seat)?;
            (best, points, -1)
        } else {
            self.ron(seat, now)?
        };

        self.hands[seat].concealed = TileBag::new();
        self.hands[seat].finished = best.iter().flat_map(Meld::tiles).collect();

        if let Some(prev) = &self.result {
            let deltas = score::winnings(self.rules, prev.winner as usize, prev.loser, prev.points);
            for (score, delta) in self.scores.iter_mut().zip(deltas) {
                *score -= delta;
            }
        }

        let mut all_melds = self.hands[seat].revealed.clone();
        all_melds.extend(best.iter().copied());
        all_melds.sort_unstable();
        let mut winning_tiles = self.hands[seat].flowers.clone();
        winning_tiles.extend(all_melds.iter().flat_map(Meld::tiles));

        self.result = Some(RoundResult {
            dealer: self.dealer,
            wind: self.wind,
            winner: seat as i8,
            loser,
            points,
            winning_tiles,
        });
        let deltas = score::winnings(self.rules, seat, loser, points);
        for (score, delta) in self.scores.iter_mut().zip(deltas) {
            *score += delta;
        }
        self.events
            .push(Event::new(EventKind::Hu, seat, now, Vec::new()));
        self.last_action_time = now;
        self.finished = true;
        self.phase = Phase::Finished;
        Ok(())
    }

    /// Ends a dried-up round in a draw. Only the seat holding the turn may
    /// do so, and only once the wall is down to its dead tiles.
    pub fn end(&mut self, seat: usize, now: UnixMillis) -> Result<(), RoundError> {
        if self.turn != seat {
            return Err(RoundError::WrongTurn);
        }
        if self.phase != Phase::Discard {
            return Err(RoundError::WrongPhase);
        }
        if self.wall.len() > MIN_TILES_LEFT {
            return Err(RoundError::DrawsRemaining);
        }
        self.finished = true;
        self.phase = Phase::Finished;
        self.result = Some(RoundResult {
            dealer: self.dealer,
            wind: self.wind,
            winner: -1,
            loser: -1,
            points: 0,
            winning_tiles: Vec::new(),
        });
        self.events
            .push(Event::new(EventKind::End, seat, now, Vec::new()));
        self.last_action_time = now;
        Ok(())
    }

    /// Produces the follow-up round. The dealer keeps the deal on a win;
    /// otherwise the deal passes on, advancing the prevailing wind after
    /// every full rotation, until the North round's North dealer closes the
    /// game.
    pub fn next(&self) -> Result<Round, RoundError> {
        if !self.finished {
            return Err(RoundError::Unfinished);
        }
        let result = self.result.as_ref().ok_or(RoundError::Unfinished)?;
        let mut dealer = self.dealer;
        let mut wind = self.wind;
        if result.winner != dealer as i8 {
            if dealer == 3 && wind == Direction::North {
                return Err(RoundError::NoMoreRounds);
            }
            dealer = (dealer + 1) % 4;
            if dealer == 0 {
                wind = wind.next();
            }
        }
        let mut round = Round::new(self.rules, self.reserved_duration);
        round.scores = self.scores;
        round.dealer = dealer;
        round.wind = wind;
        Ok(round)
    }

    /// Projects the round for one seat. Seats outside 0..=3 get a
    /// bystander's view with every hand masked.
    #[must_use]
    pub fn view(&self, seat: i8) -> RoundView {
        let hands: [HandView; 4] = std::array::from_fn(|i| self.hands[i].view(seat == i as i8));
        RoundView {
            seat,
            scores: self.scores,
            hands,
            draws_left: self.wall.len() as i64 - MIN_TILES_LEFT as i64,
            discards: self.discards.clone(),
            wind: self.wind,
            dealer: self.dealer,
            turn: self.turn,
            phase: self.phase,
            events: self.events.clone(),
            result: self.result.clone(),
            last_action_time: self.last_action_time,
            reserved_duration: self.reserved_duration,
            finished: self.finished,
        }
    }
}
