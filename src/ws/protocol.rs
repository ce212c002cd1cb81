//! WebSocket protocol message definitions
//! These are the wire types for peer-relay-registry communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::fighter::FighterState;

/// Which fighter slot a peer controls. P1 is always the match host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSide {
    P1,
    P2,
}

impl PlayerSide {
    pub fn other(self) -> Self {
        match self {
            Self::P1 => Self::P2,
            Self::P2 => Self::P1,
        }
    }

    /// P1's simulation is ground truth for the match
    pub fn is_host(self) -> bool {
        self == Self::P1
    }
}

/// The tracked action keys, as booleans. Doubles as the held-key snapshot and
/// the just-pressed set inside [`InputState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionKeySet {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub dash: bool,
    pub block: bool,
    pub light: bool,
    pub heavy: bool,
    pub special: bool,
}

impl ActionKeySet {
    pub fn any(&self) -> bool {
        self.left
            || self.right
            || self.jump
            || self.dash
            || self.block
            || self.light
            || self.heavy
            || self.special
    }

    /// Accumulate another just-pressed set into this one
    pub fn merge(&mut self, other: &Self) {
        self.left |= other.left;
        self.right |= other.right;
        self.jump |= other.jump;
        self.dash |= other.dash;
        self.block |= other.block;
        self.light |= other.light;
        self.heavy |= other.heavy;
        self.special |= other.special;
    }
}

/// One peer's sampled input for relay: full pressed-key snapshot plus the
/// sub-tick set of just-pressed events
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InputState {
    pub keys: ActionKeySet,
    pub just_pressed: ActionKeySet,
}

/// Point-in-time copy of one fighter, produced only by the host
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FighterSnapshot {
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub state: FighterState,
    pub facing: i32,
}

/// Host-authoritative state broadcast, consumed by the non-host for
/// threshold-gated correction
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub p1: FighterSnapshot,
    pub p2: FighterSnapshot,
    pub timer: f32,
}

/// Messages sent from a peer to the registry/relay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Allocate a room and register the sender as its sole occupant
    CreateRoom,

    /// Join an existing room by code
    JoinRoom { room_id: String },

    /// Input relay, forwarded verbatim to the other occupant
    PlayerInput {
        room_id: String,
        input_state: InputState,
    },

    /// Host state broadcast, forwarded to the non-host
    SyncState {
        room_id: String,
        state: NetworkSnapshot,
    },

    /// Host round arbitration; `None` is a draw
    RoundResult {
        room_id: String,
        winner: Option<PlayerSide>,
    },
}

/// Messages sent from the registry/relay to a peer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Room allocated; sender is waiting for an opponent
    RoomCreated { room_id: String },

    /// Both occupants present: assigns host (p1) vs non-host (p2) and
    /// optionally seeds initial fighter state
    GameStart {
        role: PlayerSide,
        opponent: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_state: Option<NetworkSnapshot>,
    },

    /// The other occupant's relayed input
    RemoteInput { input_state: InputState },

    /// Host state broadcast
    SyncState { state: NetworkSnapshot },

    /// Host round arbitration
    RoundResult { winner: Option<PlayerSide> },

    /// The other occupant disconnected; the match is over
    PlayerDisconnected,

    /// Request rejected; no state changed
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let json = serde_json::to_string(&ClientMsg::JoinRoom {
            room_id: "ABC123".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"join_room""#));
        assert!(json.contains(r#""room_id":"ABC123""#));
    }

    #[test]
    fn fighter_states_serialize_with_attack_step_suffix() {
        let json = serde_json::to_string(&FighterState::AttackLight1).unwrap();
        assert_eq!(json, r#""attack_light_1""#);
        let json = serde_json::to_string(&FighterState::SpecialWindup).unwrap();
        assert_eq!(json, r#""attack_special_windup""#);
    }

    #[test]
    fn missing_keys_deserialize_as_released() {
        let state: InputState = serde_json::from_str(
            r#"{"keys":{"left":true},"just_pressed":{}}"#,
        )
        .unwrap();
        assert!(state.keys.left);
        assert!(!state.keys.block);
        assert!(!state.just_pressed.any());
    }
}
