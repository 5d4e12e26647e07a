use std::sync::Arc;

use ahash::AHashMap;
use chrono::Utc;
use parking_lot::Mutex;

use super::bot;
use super::{Action, Player, Room, RoomError, RoomRepository, BOT_NAMES};

/// Front door for everything that touches a room: lookup with an in-process
/// cache over the repository, and mutation under the room's own lock with a
/// write-through save.
pub struct RoomService {
    repo: Arc<dyn RoomRepository>,
    cache: Mutex<AHashMap<String, Arc<Mutex<Room>>>>,
}

impl RoomService {
    #[must_use]
    pub fn new(repo: Arc<dyn RoomRepository>) -> Self {
        Self {
            repo,
            cache: Mutex::new(AHashMap::new()),
        }
    }

    fn save(&self, room: &mut Room) -> Result<(), RoomError> {
        self.repo.save(room).map_err(RoomError::Internal)
    }

    pub fn create(&self, host: Player) -> Result<Arc<Mutex<Room>>, RoomError> {
        let mut room = Room::new(host);
        self.save(&mut room)?;
        let id = room.id.clone();
        let room = Arc::new(Mutex::new(room));
        self.cache.lock().insert(id, room.clone());
        Ok(room)
    }

    /// Fetches a room, reading through to the repository on a cache miss.
    /// Rooms loaded from storage get their bot players running again.
    pub fn get(self: &Arc<Self>, id: &str) -> Result<Arc<Mutex<Room>>, RoomError> {
        let id = id.to_uppercase();
        if let Some(room) = self.cache.lock().get(&id) {
            return Ok(room.clone());
        }
        let room = self
            .repo
            .get(&id)
            .map_err(RoomError::Internal)?
            .ok_or(RoomError::NotFound)?;
        let room = Arc::new(Mutex::new(room));
        self.cache.lock().insert(id, room.clone());

        let bots: Vec<String> = room
            .lock()
            .players
            .iter()
            .filter(|p| p.is_bot)
            .map(|p| p.id.clone())
            .collect();
        for player_id in bots {
            bot::spawn(self.clone(), room.clone(), player_id);
        }
        Ok(room)
    }

    pub fn add_player(&self, room: &Arc<Mutex<Room>>, player: Player) -> Result<(), RoomError> {
        let mut room = room.lock();
        room.add_player(player)?;
        self.save(&mut room)
    }

    pub fn remove_player(&self, room: &Arc<Mutex<Room>>, player_id: &str) -> Result<(), RoomError> {
        let mut room = room.lock();
        room.remove_player(player_id);
        self.save(&mut room)
    }

    /// Applies one client action under the room lock. The nonce check and
    /// every broadcast happen inside, so subscribers observe the exact
    /// order in which actions were accepted.
    pub fn dispatch(
        &self,
        room: &Arc<Mutex<Room>>,
        player_id: &str,
        action: Action,
    ) -> Result<(), RoomError> {
        let now = Utc::now().timestamp_millis();
        let mut room = room.lock();
        room.reduce(player_id, &action, now)?;
        self.save(&mut room)
    }

    /// Seats a bot. The caller must be seated; the bot subscribes to the
    /// room like any other client and runs until its channel closes.
    pub fn add_bot(self: &Arc<Self>, room: &Arc<Mutex<Room>>, player_id: &str) -> Result<(), RoomError> {
        let bot_id;
        {
            let mut r = room.lock();
            if r.seat_of(player_id).is_none() {
                return Err(RoomError::Forbidden);
            }
            if r.players.len() >= 4 {
                return Err(RoomError::RoomFull);
            }
            let name = BOT_NAMES[r.players.len() - 1];
            bot_id = name.to_owned();
            r.players.push(Player {
                id: bot_id.clone(),
                name: bot_id.clone(),
                is_bot: true,
            });
            r.broadcast();
            self.save(&mut r)?;
        }
        bot::spawn(self.clone(), room.clone(), bot_id);
        Ok(())
    }
}
