use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use rand::Rng;

use super::Room;

/// Storage contract for rooms. `save` allocates a fresh ID when the room has
/// none yet; `get` looks rooms up case-insensitively.
pub trait RoomRepository: Send + Sync {
    fn save(&self, room: &mut Room) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<Room>>;
}

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn new_room_id(rng: &mut impl Rng) -> String {
    (0..4)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect()
}

/// In-process store keeping each room as its serialized encoding, so that
/// every load exercises the same round trip a durable backend would.
#[derive(Default)]
pub struct MemoryRepository {
    rooms: Mutex<AHashMap<String, String>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomRepository for MemoryRepository {
    fn save(&self, room: &mut Room) -> Result<()> {
        let mut rooms = self.rooms.lock();
        if room.id.is_empty() {
            let mut rng = rand::thread_rng();
            room.id = loop {
                let id = new_room_id(&mut rng);
                if !rooms.contains_key(&id) {
                    break id;
                }
            };
        }
        let encoded = serde_json::to_string(room).context("error encoding room")?;
        rooms.insert(room.id.clone(), encoded);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Room>> {
        let id = id.to_uppercase();
        let rooms = self.rooms.lock();
        let Some(encoded) = rooms.get(&id) else {
            return Ok(None);
        };
        let room = serde_json::from_str(encoded)
            .map_err(|err| anyhow!("error decoding room {id}: {err}"))?;
        Ok(Some(room))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::room::Player;

    fn host() -> Player {
        Player {
            id: "p1".to_owned(),
            name: "Alice".to_owned(),
            is_bot: false,
        }
    }

    #[test]
    fn save_allocates_an_id() {
        let repo = MemoryRepository::new();
        let mut room = Room::new(host());
        repo.save(&mut room).unwrap();
        assert_eq!(room.id.len(), 4);
        assert!(room.id.chars().all(|c| c.is_ascii_uppercase()));

        let mut other = Room::new(host());
        repo.save(&mut other).unwrap();
        assert_ne!(room.id, other.id);
    }

    #[test]
    fn get_is_case_insensitive() {
        let repo = MemoryRepository::new();
        let mut room = Room::new(host());
        repo.save(&mut room).unwrap();

        let found = repo.get(&room.id.to_lowercase()).unwrap().unwrap();
        assert_eq!(found.id, room.id);
        assert_eq!(found.players, room.players);

        assert!(repo.get("ZZZZ").unwrap().is_none());
    }

    #[test]
    fn stored_encoding_round_trips() {
        let repo = MemoryRepository::new();
        let mut room = Room::new(host());
        room.nonce = 7;
        repo.save(&mut room).unwrap();

        let loaded = repo.get(&room.id).unwrap().unwrap();
        assert_eq!(
            serde_json::to_string(&loaded).unwrap(),
            serde_json::to_string(&room).unwrap(),
        );
    }
}
