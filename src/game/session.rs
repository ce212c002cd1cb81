//! Peer-side netplay session: wraps the simulation for one networked peer.
//!
//! A typed message boundary: the embedder feeds inbound [`ServerMsg`] values
//! and local input frames in, and gets outbound [`ClientMsg`] values back.
//! The session never touches a socket.

use tracing::{info, warn};

use super::input::{ActionInputs, NetworkInput};
use super::r#match::{MatchPhase, MatchSim, SimEvent};
use super::sync::{apply_snapshot, build_snapshot, SyncGate};
use crate::util::time::SIMULATION_TPS;
use crate::ws::protocol::{ActionKeySet, ClientMsg, InputState, NetworkSnapshot, PlayerSide, ServerMsg};

/// Relay held-key state every Nth tick to bound the cost of a dropped packet
const INPUT_HOLD_INTERVAL_TICKS: u64 = 3;
/// Heartbeat roughly once per second with no input at all
const INPUT_HEARTBEAT_TICKS: u64 = SIMULATION_TPS as u64;

pub struct NetplaySession {
    room_id: String,
    role: PlayerSide,
    pub sim: MatchSim,
    remote: NetworkInput,
    gate: SyncGate,
    pending_snapshot: Option<NetworkSnapshot>,
    tick_count: u64,
    last_sent_keys: ActionKeySet,
    terminated: bool,
}

impl NetplaySession {
    pub fn new(room_id: String) -> Self {
        Self {
            room_id,
            role: PlayerSide::P2,
            sim: MatchSim::versus(false),
            remote: NetworkInput::new(),
            gate: SyncGate::new(),
            pending_snapshot: None,
            tick_count: 0,
            last_sent_keys: ActionKeySet::default(),
            terminated: false,
        }
    }

    pub fn role(&self) -> PlayerSide {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Buffer an inbound message into session state. Nothing here blocks or
    /// advances the simulation; the next `tick` reads the result.
    pub fn handle_server_msg(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::RoomCreated { room_id } => {
                self.room_id = room_id;
            }
            ServerMsg::GameStart {
                role,
                opponent,
                initial_state,
            } => {
                info!(room_id = %self.room_id, ?role, %opponent, "match starting");
                self.role = role;
                self.sim = MatchSim::versus(role.is_host());
                self.sim.start_match();
                if let Some(state) = initial_state {
                    apply_snapshot(&mut self.sim, &state);
                }
            }
            ServerMsg::RemoteInput { input_state } => {
                self.remote.apply(&input_state);
            }
            ServerMsg::SyncState { state } => {
                if !self.is_host() {
                    self.pending_snapshot = Some(state);
                }
            }
            ServerMsg::RoundResult { winner } => {
                if !self.is_host() {
                    self.sim.force_round_end(winner);
                }
            }
            ServerMsg::PlayerDisconnected => {
                info!(room_id = %self.room_id, "opponent disconnected, terminating match");
                self.sim.terminate();
                self.terminated = true;
            }
            ServerMsg::Error { message } => {
                warn!(room_id = %self.room_id, message = %message, "relay error");
            }
        }
    }

    /// Advance the local simulation one tick and collect outbound messages
    pub fn tick(&mut self, dt: f32, local: InputState) -> Vec<ClientMsg> {
        if self.terminated || matches!(self.sim.phase, MatchPhase::Menu | MatchPhase::Waiting) {
            return Vec::new();
        }

        if let Some(snapshot) = self.pending_snapshot.take() {
            if self.sim.phase == MatchPhase::Fighting {
                apply_snapshot(&mut self.sim, &snapshot);
            }
        }

        let local_actions = ActionInputs::from_state(&local);
        let remote_actions = self.remote.take_actions();
        let (p1_actions, p2_actions) = if self.is_host() {
            (local_actions, remote_actions)
        } else {
            (remote_actions, local_actions)
        };

        let events = self.sim.tick(dt, p1_actions, p2_actions);

        let mut outbound = Vec::new();
        if self.sim.phase == MatchPhase::Fighting {
            self.relay_input(&local, &mut outbound);
        }

        if self.is_host() {
            for event in &events {
                match event {
                    SimEvent::HitResolved { .. } => self.gate.force_next(),
                    SimEvent::RoundEnded { winner } => outbound.push(ClientMsg::RoundResult {
                        room_id: self.room_id.clone(),
                        winner: *winner,
                    }),
                    SimEvent::MatchEnded { .. } => {}
                }
            }
            if self.sim.phase == MatchPhase::Fighting && self.gate.should_send() {
                outbound.push(ClientMsg::SyncState {
                    room_id: self.room_id.clone(),
                    state: build_snapshot(&self.sim),
                });
            }
        }

        self.tick_count += 1;
        outbound
    }

    /// Send on any key change, every few ticks while holding, and as a
    /// periodic heartbeat so one lost packet cannot wedge the remote view.
    fn relay_input(&mut self, local: &InputState, outbound: &mut Vec<ClientMsg>) {
        let changed = local.keys != self.last_sent_keys || local.just_pressed.any();
        let holding = local.keys.any();
        let send = changed
            || (holding && self.tick_count % INPUT_HOLD_INTERVAL_TICKS == 0)
            || self.tick_count % INPUT_HEARTBEAT_TICKS == 0;

        if send {
            outbound.push(ClientMsg::PlayerInput {
                room_id: self.room_id.clone(),
                input_state: *local,
            });
            self.last_sent_keys = local.keys;
        }
    }
}
