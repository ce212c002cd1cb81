//! Room registry: owns all rooms and connected peers, relays messages

use dashmap::DashMap;
use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::RoomStore;
use crate::ws::protocol::{InputState, NetworkSnapshot, PlayerSide, ServerMsg};

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Rejections surfaced to the requesting peer verbatim
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound,
    #[error("Room is full or active")]
    FullOrActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Active,
}

/// One room: creator first, joiner second
#[derive(Debug, Clone)]
struct Room {
    room_id: String,
    occupants: Vec<Uuid>,
    status: RoomStatus,
}

/// Outbound channel to one connected peer
#[derive(Clone)]
struct PeerHandle {
    tx: mpsc::Sender<ServerMsg>,
}

/// The owned room/connection store. Mutated only by the lifecycle handlers
/// below; the WebSocket layer never touches rooms directly.
pub struct RoomRegistry {
    rooms: DashMap<String, Room>,
    peers: DashMap<Uuid, PeerHandle>,
    room_of: DashMap<Uuid, String>,
    store: RoomStore,
}

impl RoomRegistry {
    pub fn new(store: RoomStore) -> Self {
        Self {
            rooms: DashMap::new(),
            peers: DashMap::new(),
            room_of: DashMap::new(),
            store,
        }
    }

    /// Register a freshly connected peer's outbound channel
    pub fn register_peer(&self, conn_id: Uuid, tx: mpsc::Sender<ServerMsg>) {
        self.peers.insert(conn_id, PeerHandle { tx });
    }

    /// Peer disconnected: tear down its room, notify the other occupant.
    /// Fatal to that match only.
    pub async fn unregister_peer(&self, conn_id: Uuid) {
        self.peers.remove(&conn_id);

        let Some((_, room_id)) = self.room_of.remove(&conn_id) else {
            return;
        };
        let Some((_, room)) = self.rooms.remove(&room_id) else {
            return;
        };

        info!(room_id = %room_id, conn_id = %conn_id, "occupant left, closing room");

        for occupant in room.occupants.iter().filter(|id| **id != conn_id) {
            self.room_of.remove(occupant);
            self.send_to(*occupant, ServerMsg::PlayerDisconnected).await;
        }

        self.store.record_closed(&room_id);
    }

    /// Allocate a room with the sender as sole occupant
    pub async fn create_room(&self, conn_id: Uuid) -> String {
        let room_id = self.generate_room_code();
        let room = Room {
            room_id: room_id.clone(),
            occupants: vec![conn_id],
            status: RoomStatus::Waiting,
        };
        self.rooms.insert(room_id.clone(), room);
        self.room_of.insert(conn_id, room_id.clone());

        info!(room_id = %room_id, conn_id = %conn_id, "room created");
        self.store.record_created(&room_id);

        self.send_to(
            conn_id,
            ServerMsg::RoomCreated {
                room_id: room_id.clone(),
            },
        )
        .await;

        room_id
    }

    /// Join an existing room. On success both occupants receive `GameStart`
    /// with their assigned roles (creator hosts as p1).
    pub async fn join_room(&self, conn_id: Uuid, room_id: &str) -> Result<(), RoomError> {
        let creator = {
            let mut room = self.rooms.get_mut(room_id).ok_or(RoomError::NotFound)?;
            if room.status != RoomStatus::Waiting || room.occupants.len() >= 2 {
                return Err(RoomError::FullOrActive);
            }
            room.occupants.push(conn_id);
            room.status = RoomStatus::Active;
            room.occupants[0]
        };

        self.room_of.insert(conn_id, room_id.to_string());

        info!(room_id = %room_id, conn_id = %conn_id, "room filled, starting match");
        self.store.record_activated(room_id);

        self.send_to(
            creator,
            ServerMsg::GameStart {
                role: PlayerSide::P1,
                opponent: conn_id,
                initial_state: None,
            },
        )
        .await;
        self.send_to(
            conn_id,
            ServerMsg::GameStart {
                role: PlayerSide::P2,
                opponent: creator,
                initial_state: None,
            },
        )
        .await;

        Ok(())
    }

    /// Relay a peer's input snapshot to the other occupant verbatim
    pub async fn relay_input(&self, conn_id: Uuid, room_id: &str, input_state: InputState) {
        self.relay(conn_id, room_id, ServerMsg::RemoteInput { input_state })
            .await;
    }

    /// Relay the host's state broadcast to the non-host
    pub async fn relay_sync(&self, conn_id: Uuid, room_id: &str, state: NetworkSnapshot) {
        self.relay(conn_id, room_id, ServerMsg::SyncState { state })
            .await;
    }

    /// Relay the host's round verdict to the non-host
    pub async fn relay_round_result(
        &self,
        conn_id: Uuid,
        room_id: &str,
        winner: Option<PlayerSide>,
    ) {
        self.relay(conn_id, room_id, ServerMsg::RoundResult { winner })
            .await;
    }

    async fn relay(&self, sender: Uuid, room_id: &str, msg: ServerMsg) {
        let Some(other) = self.other_occupant(sender, room_id) else {
            return;
        };
        self.send_to(other, msg).await;
    }

    fn other_occupant(&self, sender: Uuid, room_id: &str) -> Option<Uuid> {
        let room = self.rooms.get(room_id)?;
        if !room.occupants.contains(&sender) {
            return None;
        }
        room.occupants.iter().copied().find(|id| *id != sender)
    }

    async fn send_to(&self, conn_id: Uuid, msg: ServerMsg) {
        let Some(handle) = self.peers.get(&conn_id).map(|p| p.value().clone()) else {
            return;
        };
        if handle.tx.send(msg).await.is_err() {
            warn!(conn_id = %conn_id, "peer channel closed, dropping message");
        }
    }

    fn generate_room_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..ROOM_CODE_LEN)
                .map(|_| ROOM_CODE_CHARS[rng.gen_range(0..ROOM_CODE_CHARS.len())] as char)
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn connected_peers(&self) -> usize {
        self.peers.len()
    }
}
