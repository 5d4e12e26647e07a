use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Action, ActionKind, Room, RoomError, RoomService, RoomView};
use crate::hand::Concealed;
use crate::round::Phase;

/// Names handed out to bots as they join, doubling as their player IDs.
pub const BOT_NAMES: [&str; 3] = ["Bamboo Bot", "Lotus Bot", "Crane Bot"];

/// Decides on an action for a view, or stays quiet. The returned action
/// carries the view's nonce, so a decision made from a stale view is simply
/// rejected downstream.
pub trait Policy: Send + Sync {
    fn act(&self, view: &RoomView) -> Option<Action>;
}

/// The reference policy: draw when it is our turn, end the round when the
/// wall is dry, otherwise discard the lowest concealed tile.
pub struct DiscardLowest;

impl Policy for DiscardLowest {
    fn act(&self, view: &RoomView) -> Option<Action> {
        let round = view.round.as_ref()?;
        if round.seat < 0 || round.turn != round.seat as usize {
            return None;
        }
        let action = |kind, tiles| {
            Some(Action {
                nonce: view.nonce,
                kind,
                tiles,
            })
        };
        match round.phase {
            Phase::Draw => action(ActionKind::Draw, Vec::new()),
            Phase::Discard => {
                if round.draws_left <= 0 {
                    return action(ActionKind::End, Vec::new());
                }
                let Concealed::Tiles(tiles) = &round.hands[round.seat as usize].concealed else {
                    return None;
                };
                let tile = *tiles.first()?;
                action(ActionKind::Discard, vec![tile])
            }
            Phase::Finished => None,
        }
    }
}

/// A bot is an ordinary subscriber plus a policy: it reads the view stream
/// and re-enters the orchestrator through the same dispatch path as any
/// human client.
pub struct Bot {
    player_id: String,
    policy: Arc<dyn Policy>,
    rx: mpsc::UnboundedReceiver<RoomView>,
}

/// Subscribes a new bot to the room and drives it on its own task.
pub(crate) fn spawn(service: Arc<RoomService>, room: Arc<Mutex<Room>>, player_id: String) {
    let (tx, rx) = mpsc::unbounded_channel();
    room.lock().add_client(player_id.clone(), tx);
    let bot = Bot {
        player_id,
        policy: Arc::new(DiscardLowest),
        rx,
    };
    tokio::spawn(bot.run(service, room));
}

impl Bot {
    pub async fn run(mut self, service: Arc<RoomService>, room: Arc<Mutex<Room>>) {
        while let Some(view) = self.rx.recv().await {
            let policy = self.policy.clone();
            let service = service.clone();
            let room = room.clone();
            let player_id = self.player_id.clone();
            // Each view is handled on its own task so that waiting out a
            // claim window never blocks the stream.
            tokio::spawn(async move {
                let Some(action) = policy.act(&view) else {
                    return;
                };
                if action.kind == ActionKind::Draw {
                    let reserved = view.round.as_ref().map_or(0, |r| r.reserved_duration);
                    let wait = (reserved + 1_000).max(0) as u64;
                    tokio::time::sleep(Duration::from_millis(wait)).await;
                }
                match service.dispatch(&room, &player_id, action) {
                    Ok(()) => {}
                    Err(RoomError::InvalidNonce) => {
                        debug!(player = %player_id, "view went stale, waiting for the next one");
                    }
                    Err(err) => {
                        warn!(player = %player_id, error = %err, "bot action rejected");
                    }
                }
            });
        }
    }
}
