//! The concurrency boundary around the round engine: a room serializes
//! actions from its players, versions its state with a nonce, and fans out
//! per-seat views to every subscriber.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::round::{Round, RoundError, RoundResult, RoundView, Rules, UnixMillis};
use crate::tile::Tile;

mod bot;
mod repo;
mod service;


pub use bot::{Bot, DiscardLowest, Policy, BOT_NAMES};
pub use repo::{MemoryRepository, RoomRepository};
pub use service::RoomService;

/// Claim window for new rounds, in milliseconds.
pub const RESERVED_DURATION: UnixMillis = 2_000;

#[derive(Debug)]
pub enum RoomError {
    Forbidden,
    InvalidNonce,
    NameTaken,
    RoomFull,
    NotEnoughPlayers,
    TilesRequired,
    NoRound,
    NotFound,
    Round(RoundError),
    Internal(anyhow::Error),
}

impl fmt::Display for RoomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden => f.write_str("forbidden"),
            Self::InvalidNonce => f.write_str("invalid nonce"),
            Self::NameTaken => f.write_str("name already taken"),
            Self::RoomFull => f.write_str("room full"),
            Self::NotEnoughPlayers => f.write_str("not enough players"),
            Self::TilesRequired => f.write_str("tiles is required"),
            Self::NoRound => f.write_str("round not started"),
            Self::NotFound => f.write_str("room not found"),
            Self::Round(err) => err.fmt(f),
            Self::Internal(_) => f.write_str("internal error"),
        }
    }
}

impl std::error::Error for RoomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Round(err) => Some(err),
            Self::Internal(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<RoundError> for RoomError {
    fn from(err: RoundError) -> Self {
        Self::Round(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    #[default]
    Lobby,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
}

/// The player list as shown to clients: names only, IDs stay private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub name: String,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Next,
    Draw,
    Discard,
    Chi,
    Pong,
    Gang,
    Hu,
    End,
}

/// A client action. The nonce must match the room's current nonce or the
/// action is rejected without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub nonce: u64,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub tiles: Vec<Tile>,
}

/// A player's view of a room, the unit of the subscription stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomView {
    pub id: String,
    pub nonce: u64,
    pub phase: RoomPhase,
    pub players: Vec<PlayerView>,
    pub inside: bool,
    pub round: Option<RoundView>,
    pub results: Vec<RoundResult>,
}

struct Client {
    token: u64,
    player_id: String,
    tx: mpsc::UnboundedSender<RoomView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub nonce: u64,
    pub phase: RoomPhase,
    pub players: Vec<Player>,
    pub round: Option<Round>,
    pub results: Vec<RoundResult>,
    #[serde(skip)]
    clients: Vec<Client>,
    #[serde(skip)]
    next_token: u64,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("token", &self.token)
            .field("player_id", &self.player_id)
            .finish_non_exhaustive()
    }
}

impl Room {
    #[must_use]
    pub fn new(host: Player) -> Self {
        Self {
            id: String::new(),
            nonce: 0,
            phase: RoomPhase::Lobby,
            players: vec![host],
            round: None,
            results: Vec::new(),
            clients: Vec::new(),
            next_token: 0,
        }
    }

    #[must_use]
    pub fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    /// A player's view of the room. Unknown players get a bystander's view.
    #[must_use]
    pub fn view(&self, player_id: &str) -> RoomView {
        let seat = self.seat_of(player_id);
        RoomView {
            id: self.id.clone(),
            nonce: self.nonce,
            phase: self.phase,
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    name: p.name.clone(),
                    is_bot: p.is_bot,
                })
                .collect(),
            inside: seat.is_some(),
            round: self
                .round
                .as_ref()
                .map(|round| round.view(seat.map_or(-1, |s| s as i8))),
            results: self.results.clone(),
        }
    }

    /// Seats a player. Re-joining under the same name is a no-op; a taken
    /// name or a full room is an error.
    pub fn add_player(&mut self, player: Player) -> Result<(), RoomError> {
        for existing in &self.players {
            if existing.name == player.name {
                if existing.id == player.id {
                    return Ok(());
                }
                return Err(RoomError::NameTaken);
            }
        }
        if self.players.len() == 4 {
            return Err(RoomError::RoomFull);
        }
        self.players.push(player);
        self.broadcast();
        Ok(())
    }

    pub fn remove_player(&mut self, player_id: &str) {
        let before = self.players.len();
        self.players.retain(|p| p.id != player_id);
        if self.players.len() != before {
            self.broadcast();
        }
    }

    /// Subscribes a channel to this room's view stream and immediately
    /// delivers the current snapshot. Returns a token for removal.
    pub fn add_client(&mut self, player_id: String, tx: mpsc::UnboundedSender<RoomView>) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        let view = self.view(&player_id);
        let _ = tx.send(view);
        self.clients.push(Client {
            token,
            player_id,
            tx,
        });
        token
    }

    pub fn remove_client(&mut self, token: u64) {
        self.clients.retain(|c| c.token != token);
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Sends every subscriber its own view of the current state. Closed
    /// channels are dropped from the registry.
    fn broadcast(&mut self) {
        let mut live = Vec::with_capacity(self.clients.len());
        for client in std::mem::take(&mut self.clients) {
            let view = self.view(&client.player_id);
            if client.tx.send(view).is_ok() {
                live.push(client);
            } else {
                debug!(token = client.token, "dropping closed subscriber");
            }
        }
        self.clients = live;
    }

    /// Validates and applies one action, bumping the nonce and fanning out
    /// fresh views on success. Rejected actions change nothing.
    pub fn reduce(
        &mut self,
        player_id: &str,
        action: &Action,
        now: UnixMillis,
    ) -> Result<(), RoomError> {
        let seat = self.seat_of(player_id).ok_or(RoomError::Forbidden)?;
        if action.nonce != self.nonce {
            return Err(RoomError::InvalidNonce);
        }
        self.apply(seat, action, now)?;
        self.nonce += 1;
        self.broadcast();
        Ok(())
    }

    fn apply(&mut self, seat: usize, action: &Action, now: UnixMillis) -> Result<(), RoomError> {
        if action.kind == ActionKind::Next {
            return self.next_round(now);
        }
        let round = self.round.as_mut().ok_or(RoomError::NoRound)?;
        match action.kind {
            ActionKind::Next => unreachable!(),
            ActionKind::Draw => {
                round.draw(seat, now)?;
            }
            ActionKind::Discard => {
                let &tile = action.tiles.first().ok_or(RoomError::TilesRequired)?;
                round.discard(seat, now, tile)?;
            }
            ActionKind::Chi => {
                if action.tiles.len() < 2 {
                    return Err(RoomError::TilesRequired);
                }
                round.chi(seat, now, action.tiles[0], action.tiles[1])?;
            }
            ActionKind::Pong => {
                round.pong(seat, now)?;
            }
            ActionKind::Gang => {
                if let Some(&tile) = action.tiles.first() {
                    round.gang_from_hand(seat, now, tile)?;
                } else {
                    round.gang_from_discard(seat, now)?;
                }
            }
            ActionKind::Hu => {
                round.hu(seat, now)?;
            }
            ActionKind::End => {
                round.end(seat, now)?;
            }
        }
        Ok(())
    }

    /// Starts the first round, or chains to the next one. When the game is
    /// over, the room moves to its finished phase instead.
    fn next_round(&mut self, now: UnixMillis) -> Result<(), RoomError> {
        match &self.round {
            None => {
                if self.players.len() < 4 {
                    return Err(RoomError::NotEnoughPlayers);
                }
                let mut round = Round::new(Rules::default(), RESERVED_DURATION);
                round.start(rand::random(), now);
                self.round = Some(round);
                self.phase = RoomPhase::InProgress;
                Ok(())
            }
            Some(round) => match round.next() {
                Ok(mut next) => {
                    if let Some(result) = &round.result {
                        self.results.push(result.clone());
                    }
                    next.start(rand::random(), now);
                    self.round = Some(next);
                    Ok(())
                }
                Err(RoundError::NoMoreRounds) => {
                    if let Some(result) = &round.result {
                        self.results.push(result.clone());
                    }
                    self.round = None;
                    self.phase = RoomPhase::Finished;
                    Ok(())
                }
                Err(err) => Err(err.into()),
            },
        }
    }
}
