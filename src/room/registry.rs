use super::{Room, RoomStats};
use crate::app::config::RoomSettings;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Every live room by name. Rooms remove themselves once their loop ends.
#[derive(Debug)]
pub struct Registry {
    rooms: DashMap<String, Arc<Room>>,
    settings: RoomSettings,
    closed_tx: mpsc::UnboundedSender<Arc<Room>>,
}

impl Registry {
    pub fn new(settings: RoomSettings) -> Arc<Self> {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            rooms: DashMap::new(),
            settings,
            closed_tx,
        });
        tokio::spawn(reap_closed_rooms(Arc::downgrade(&registry), closed_rx));
        registry
    }

    #[cfg(test)]
    pub fn find(&self, id: &str) -> Option<Arc<Room>> {
        self.rooms.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the room named `id`, creating it with `password` when absent.
    /// The flag is true when this call created it.
    pub fn find_or_create(&self, id: &str, password: &str) -> (Arc<Room>, bool) {
        match self.rooms.entry(id.to_string()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let room = Room::spawn(
                    id.to_string(),
                    password.to_string(),
                    self.settings,
                    self.closed_tx.clone(),
                );
                entry.insert(Arc::clone(&room));
                tracing::info!(room_id = id, locked = !password.is_empty(), "room created");
                (room, true)
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn overview(&self) -> Vec<RoomStats> {
        let mut stats: Vec<RoomStats> = self.snapshot().iter().map(|room| room.stats()).collect();
        stats.sort_by(|a, b| a.id.cmp(&b.id));
        stats
    }

    /// Closes every room and waits until each has said goodbye.
    pub async fn shutdown(&self) {
        let rooms = self.snapshot();
        tracing::info!(rooms = rooms.len(), "closing all rooms");
        for room in &rooms {
            room.close();
        }
        for room in rooms {
            room.wait_closed().await;
        }
    }

    fn snapshot(&self) -> Vec<Arc<Room>> {
        self.rooms
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

async fn reap_closed_rooms(
    registry: Weak<Registry>,
    mut closed_rx: mpsc::UnboundedReceiver<Arc<Room>>,
) {
    while let Some(room) = closed_rx.recv().await {
        let Some(registry) = registry.upgrade() else {
            break;
        };
        // A newer room may already own the name.
        let removed = registry
            .rooms
            .remove_if(room.id(), |_, current| Arc::ptr_eq(current, &room))
            .is_some();
        if removed {
            tracing::info!(room_id = room.id(), "room deleted");
        }
    }
}
