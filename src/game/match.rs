//! Match orchestration - rounds, scoring, phase flow

use tracing::info;

use super::ai::{AdaptivePolicy, Observation, RoundStats};
use super::combat::{CombatSystem, HitOutcome, Projectile};
use super::fighter::{Fighter, FighterState};
use super::input::ActionInputs;
use crate::util::time::clamp_frame_delta;
use crate::ws::protocol::PlayerSide;

pub const ROUND_DURATION: f32 = 60.0;
pub const PRE_FIGHT_COUNTDOWN: f32 = 3.0;
pub const ROUND_OVER_HOLD: f32 = 3.0;
/// Best-of-3
pub const MAX_WINS: u32 = 2;

pub const P1_SPAWN_X: f32 = 200.0;
pub const P2_SPAWN_X: f32 = 800.0;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Not in a match
    Menu,
    /// Networked match not yet started
    Waiting,
    /// Countdown before the round
    PreFight,
    /// Round in progress
    Fighting,
    /// Hold before next round or match end
    RoundOver,
    /// Match decided
    MatchOver,
}

/// Side effects of one simulation tick the embedder cares about
#[derive(Debug, Clone, Copy)]
pub enum SimEvent {
    /// A contact resolved this tick (host syncs immediately on these)
    HitResolved {
        attacker: PlayerSide,
        target: PlayerSide,
        damage: i32,
        outcome: HitOutcome,
    },
    RoundEnded {
        winner: Option<PlayerSide>,
    },
    MatchEnded {
        winner: PlayerSide,
    },
}

/// The full two-fighter simulation: fighters, projectiles, round and match
/// bookkeeping, and optionally the AI controlling fighter 2.
pub struct MatchSim {
    pub phase: MatchPhase,
    pub p1: Fighter,
    pub p2: Fighter,
    pub projectiles: Vec<Projectile>,
    pub round: u32,
    pub p1_wins: u32,
    pub p2_wins: u32,
    pub max_wins: u32,
    pub round_timer: f32,
    pub countdown: f32,
    round_over_timer: f32,
    last_round_stats: Option<RoundStats>,
    ai: Option<AdaptivePolicy>,
    /// Whether this simulation decides round outcomes. False on the non-host
    /// peer, which only ends rounds on the host's say-so.
    authoritative: bool,
    prev_p1_state: FighterState,
}

impl MatchSim {
    /// Two externally-controlled fighters (networked play)
    pub fn versus(authoritative: bool) -> Self {
        Self::build(None, authoritative, MatchPhase::Waiting)
    }

    /// Fighter 2 driven by the adaptive AI
    pub fn single_player(seed: u64) -> Self {
        Self::build(Some(AdaptivePolicy::new(seed)), true, MatchPhase::Menu)
    }

    fn build(ai: Option<AdaptivePolicy>, authoritative: bool, phase: MatchPhase) -> Self {
        Self {
            phase,
            p1: Fighter::new(P1_SPAWN_X, 1),
            p2: Fighter::new(P2_SPAWN_X, -1),
            projectiles: Vec::new(),
            round: 1,
            p1_wins: 0,
            p2_wins: 0,
            max_wins: MAX_WINS,
            round_timer: ROUND_DURATION,
            countdown: PRE_FIGHT_COUNTDOWN,
            round_over_timer: 0.0,
            last_round_stats: None,
            ai,
            authoritative,
            prev_p1_state: FighterState::Idle,
        }
    }

    /// Start (or restart) the match from round one
    pub fn start_match(&mut self) {
        self.p1_wins = 0;
        self.p2_wins = 0;
        self.round = 1;
        self.last_round_stats = None;
        self.reset_round();
        self.start_pre_fight();
    }

    /// Wholesale reset after `MatchOver`
    pub fn rematch(&mut self) {
        self.start_match();
    }

    /// Peer disconnect or local abandon: back to a pre-match state
    pub fn terminate(&mut self) {
        self.phase = MatchPhase::Menu;
        self.projectiles.clear();
    }

    fn reset_round(&mut self) {
        self.p1 = Fighter::new(P1_SPAWN_X, 1);
        self.p2 = Fighter::new(P2_SPAWN_X, -1);
        self.projectiles.clear();
        self.round_timer = ROUND_DURATION;
        self.prev_p1_state = FighterState::Idle;

        if let Some(ai) = &mut self.ai {
            ai.set_difficulty(self.round.min(3), self.last_round_stats.as_ref());
        }
    }

    fn start_pre_fight(&mut self) {
        self.phase = MatchPhase::PreFight;
        self.countdown = PRE_FIGHT_COUNTDOWN;
    }

    /// Advance the whole simulation by one tick. The delta is clamped so a
    /// stalled frame cannot produce an unbounded physics step.
    pub fn tick(
        &mut self,
        dt: f32,
        p1_actions: ActionInputs,
        p2_actions: ActionInputs,
    ) -> Vec<SimEvent> {
        let dt = clamp_frame_delta(dt);
        let mut events = Vec::new();

        match self.phase {
            MatchPhase::PreFight => {
                self.countdown -= dt;
                // Held in a non-actionable stance but still physically ticked
                // so spawn positions settle
                self.p1.state = FighterState::Idle;
                self.p2.state = FighterState::Idle;
                let p2_x = self.p2.body.x;
                let p1_x = self.p1.body.x;
                self.p1.update(dt, p2_x, &ActionInputs::default(), false);
                self.p2.update(dt, p1_x, &ActionInputs::default(), false);
                if self.countdown <= 0.0 {
                    self.phase = MatchPhase::Fighting;
                }
            }
            MatchPhase::Fighting => {
                self.round_timer -= dt;
                events.extend(self.tick_fight(dt, p1_actions, p2_actions));
                self.check_round_end(&mut events);
            }
            MatchPhase::RoundOver => {
                self.round_over_timer -= dt;
                if self.round_over_timer <= 0.0 {
                    if self.p1_wins >= self.max_wins || self.p2_wins >= self.max_wins {
                        self.phase = MatchPhase::MatchOver;
                        let winner = if self.p1_wins > self.p2_wins {
                            PlayerSide::P1
                        } else {
                            PlayerSide::P2
                        };
                        events.push(SimEvent::MatchEnded { winner });
                        info!(?winner, "match over");
                    } else {
                        self.round += 1;
                        self.reset_round();
                        self.start_pre_fight();
                    }
                }
            }
            MatchPhase::Menu | MatchPhase::Waiting | MatchPhase::MatchOver => {}
        }

        events
    }

    fn tick_fight(
        &mut self,
        dt: f32,
        p1_actions: ActionInputs,
        p2_actions: ActionInputs,
    ) -> Vec<SimEvent> {
        let p2_actions = match &mut self.ai {
            Some(ai) => ai.decide(&self.p2, &self.p1, dt),
            None => p2_actions,
        };

        let p2_x = self.p2.body.x;
        let p1_x = self.p1.body.x;
        if let Some(mut projectile) = self.p1.update(dt, p2_x, &p1_actions, true) {
            projectile.owner = PlayerSide::P1;
            self.projectiles.push(projectile);
        }
        if let Some(mut projectile) = self.p2.update(dt, p1_x, &p2_actions, true) {
            projectile.owner = PlayerSide::P2;
            self.projectiles.push(projectile);
        }

        // The AI profiles fighter 1 on state transitions
        if let Some(ai) = &mut self.ai {
            if self.p1.state.is_attack() && !self.prev_p1_state.is_attack() {
                ai.observe(Observation::OpponentAttack);
            }
            if self.p1.state == FighterState::Dashing && self.prev_p1_state != FighterState::Dashing
            {
                ai.observe(Observation::OpponentDash);
            }
        }
        self.prev_p1_state = self.p1.state;

        for projectile in &mut self.projectiles {
            projectile.update(dt);
        }

        let hits = CombatSystem::resolve_tick(&mut self.p1, &mut self.p2, &mut self.projectiles);

        let mut events = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(ai) = &mut self.ai {
                if hit.attacker == PlayerSide::P1
                    && hit.target == PlayerSide::P2
                    && hit.outcome != HitOutcome::PerfectBlock
                {
                    ai.observe(Observation::OpponentHit);
                }
            }
            events.push(SimEvent::HitResolved {
                attacker: hit.attacker,
                target: hit.target,
                damage: hit.damage,
                outcome: hit.outcome,
            });
        }
        events
    }

    fn check_round_end(&mut self, events: &mut Vec<SimEvent>) {
        if !self.authoritative || self.phase != MatchPhase::Fighting {
            return;
        }

        if self.p1.dead {
            events.extend(self.end_round(Some(PlayerSide::P2)));
        } else if self.p2.dead {
            events.extend(self.end_round(Some(PlayerSide::P1)));
        } else if self.round_timer <= 0.0 {
            let winner = match self.p1.health.cmp(&self.p2.health) {
                std::cmp::Ordering::Greater => Some(PlayerSide::P1),
                std::cmp::Ordering::Less => Some(PlayerSide::P2),
                std::cmp::Ordering::Equal => None,
            };
            events.extend(self.end_round(winner));
        }
    }

    /// Accept a round outcome decided elsewhere (host arbitration). Forces the
    /// round to end even if the local simulation had not detected it yet.
    pub fn force_round_end(&mut self, winner: Option<PlayerSide>) -> Vec<SimEvent> {
        self.end_round(winner)
    }

    fn end_round(&mut self, winner: Option<PlayerSide>) -> Vec<SimEvent> {
        if matches!(self.phase, MatchPhase::RoundOver | MatchPhase::MatchOver) {
            return Vec::new();
        }

        self.last_round_stats = Some(RoundStats {
            opponent_won: winner == Some(PlayerSide::P1),
            opponent_health: self.p1.health,
        });

        match winner {
            Some(PlayerSide::P1) => self.p1_wins += 1,
            Some(PlayerSide::P2) => self.p2_wins += 1,
            None => {}
        }

        self.phase = MatchPhase::RoundOver;
        self.round_over_timer = ROUND_OVER_HOLD;

        info!(
            round = self.round,
            ?winner,
            p1_wins = self.p1_wins,
            p2_wins = self.p2_wins,
            "round over"
        );

        vec![SimEvent::RoundEnded { winner }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn started_versus() -> MatchSim {
        let mut sim = MatchSim::versus(true);
        sim.start_match();
        sim
    }

    fn tick_idle(sim: &mut MatchSim) -> Vec<SimEvent> {
        sim.tick(DT, ActionInputs::default(), ActionInputs::default())
    }

    fn run_until_fighting(sim: &mut MatchSim) {
        for _ in 0..400 {
            if sim.phase == MatchPhase::Fighting {
                return;
            }
            tick_idle(sim);
        }
        panic!("never reached fighting phase");
    }

    fn round_winners(events: &[SimEvent]) -> Vec<Option<PlayerSide>> {
        events
            .iter()
            .filter_map(|e| match e {
                SimEvent::RoundEnded { winner } => Some(*winner),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn countdown_holds_fighters_then_starts_round() {
        let mut sim = started_versus();
        assert_eq!(sim.phase, MatchPhase::PreFight);

        // Attack input during the countdown is ignored
        let attack = ActionInputs {
            light: true,
            ..Default::default()
        };
        sim.tick(DT, attack, ActionInputs::default());
        assert_eq!(sim.p1.state, FighterState::Idle);

        run_until_fighting(&mut sim);
        assert_eq!(sim.phase, MatchPhase::Fighting);
        assert!(sim.round_timer > ROUND_DURATION - 1.0);
    }

    #[test]
    fn timeout_awards_round_to_higher_health() {
        let mut sim = started_versus();
        run_until_fighting(&mut sim);
        sim.p1.health = 40;
        sim.p2.health = 70;
        sim.round_timer = DT / 2.0;

        let events = tick_idle(&mut sim);
        assert_eq!(round_winners(&events), vec![Some(PlayerSide::P2)]);
        assert_eq!(sim.p2_wins, 1);
        assert_eq!(sim.p1_wins, 0);
        assert_eq!(sim.phase, MatchPhase::RoundOver);
    }

    #[test]
    fn death_awards_round_to_survivor_regardless_of_health() {
        let mut sim = started_versus();
        run_until_fighting(&mut sim);
        sim.p1.health = 90;
        sim.p2.health = 95;
        sim.p1.take_damage(90, 300.0, -400.0, crate::game::combat::HitKind::Special);
        assert!(sim.p1.dead);

        let events = tick_idle(&mut sim);
        assert_eq!(round_winners(&events), vec![Some(PlayerSide::P2)]);
    }

    #[test]
    fn equal_health_timeout_is_a_draw() {
        let mut sim = started_versus();
        run_until_fighting(&mut sim);
        sim.round_timer = DT / 2.0;

        let events = tick_idle(&mut sim);
        assert_eq!(round_winners(&events), vec![None]);
        assert_eq!(sim.p1_wins, 0);
        assert_eq!(sim.p2_wins, 0);
    }

    #[test]
    fn consecutive_draws_keep_advancing_rounds() {
        let mut sim = started_versus();
        for expected_round in 1..=2 {
            run_until_fighting(&mut sim);
            assert_eq!(sim.round, expected_round);
            sim.round_timer = DT / 2.0;
            let events = tick_idle(&mut sim);
            assert_eq!(round_winners(&events), vec![None]);
        }
        run_until_fighting(&mut sim);
        assert_eq!(sim.round, 3);
        assert_eq!(sim.p1_wins + sim.p2_wins, 0);
    }

    #[test]
    fn reaching_max_wins_ends_the_match() {
        let mut sim = started_versus();

        for _ in 0..2 {
            run_until_fighting(&mut sim);
            sim.p2.take_damage(200, 300.0, -400.0, crate::game::combat::HitKind::Special);
            tick_idle(&mut sim);
        }
        assert_eq!(sim.p1_wins, 2);
        assert_eq!(sim.phase, MatchPhase::RoundOver);

        // After the hold the match is decided, not another round
        let mut match_winner = None;
        for _ in 0..400 {
            for event in tick_idle(&mut sim) {
                if let SimEvent::MatchEnded { winner } = event {
                    match_winner = Some(winner);
                }
            }
            if sim.phase == MatchPhase::MatchOver {
                break;
            }
        }
        assert_eq!(sim.phase, MatchPhase::MatchOver);
        assert_eq!(match_winner, Some(PlayerSide::P1));
    }

    #[test]
    fn round_reset_restores_spawns_and_health() {
        let mut sim = started_versus();
        run_until_fighting(&mut sim);
        sim.p1.health = 10;
        sim.p1.body.x = 500.0;
        sim.p2.take_damage(200, 300.0, -400.0, crate::game::combat::HitKind::Special);
        tick_idle(&mut sim);

        // Ride out the round-over hold into the next pre-fight
        for _ in 0..400 {
            if sim.phase == MatchPhase::PreFight {
                break;
            }
            tick_idle(&mut sim);
        }
        assert_eq!(sim.phase, MatchPhase::PreFight);
        assert_eq!(sim.round, 2);
        assert_eq!(sim.p1.health, 100);
        assert_eq!(sim.p2.health, 100);
        assert_eq!(sim.p1.body.x, P1_SPAWN_X);
        assert_eq!(sim.p2.body.x, P2_SPAWN_X);
        assert!(sim.projectiles.is_empty());
    }

    #[test]
    fn non_authoritative_sim_waits_for_arbitration() {
        let mut sim = MatchSim::versus(false);
        sim.start_match();
        run_until_fighting(&mut sim);
        sim.p2.take_damage(200, 300.0, -400.0, crate::game::combat::HitKind::Special);

        let events = tick_idle(&mut sim);
        assert!(round_winners(&events).is_empty());
        assert_eq!(sim.phase, MatchPhase::Fighting);

        // Host's verdict arrives
        let events = sim.force_round_end(Some(PlayerSide::P1));
        assert_eq!(round_winners(&events), vec![Some(PlayerSide::P1)]);
        assert_eq!(sim.phase, MatchPhase::RoundOver);
        assert_eq!(sim.p1_wins, 1);

        // A duplicate verdict is a no-op
        let events = sim.force_round_end(Some(PlayerSide::P1));
        assert!(events.is_empty());
        assert_eq!(sim.p1_wins, 1);
    }

    #[test]
    fn full_timeout_draw_end_to_end() {
        let mut sim = started_versus();
        // Burn through two full scheduled rounds with nobody acting
        for _ in 0..2 {
            run_until_fighting(&mut sim);
            while sim.phase == MatchPhase::Fighting {
                tick_idle(&mut sim);
            }
            assert_eq!(sim.phase, MatchPhase::RoundOver);
        }
        assert_eq!(sim.p1_wins, 0);
        assert_eq!(sim.p2_wins, 0);
        assert_eq!(sim.round, 2);
    }

    #[test]
    fn single_player_ai_takes_over_fighter_two() {
        let mut sim = MatchSim::single_player(42);
        sim.start_match();
        run_until_fighting(&mut sim);

        let start_x = sim.p2.body.x;
        for _ in 0..600 {
            if sim.phase != MatchPhase::Fighting {
                break;
            }
            tick_idle(&mut sim);
        }
        // The AI closed distance (or at least moved) without any p2 input
        assert_ne!(sim.p2.body.x, start_x);
    }

    #[test]
    fn oversized_frame_delta_is_clamped() {
        let mut sim = started_versus();
        run_until_fighting(&mut sim);
        sim.p1.body.vx = 600.0;
        let x_before = sim.p1.body.x;

        // A five-second stall must not integrate a five-second step
        sim.tick(5.0, ActionInputs::default(), ActionInputs::default());
        assert!(sim.p1.body.x - x_before <= 61.0);
    }

    #[test]
    fn rematch_clears_score_and_restarts() {
        let mut sim = started_versus();
        run_until_fighting(&mut sim);
        sim.p1_wins = 2;
        sim.round = 3;
        sim.phase = MatchPhase::MatchOver;

        sim.rematch();
        assert_eq!(sim.phase, MatchPhase::PreFight);
        assert_eq!(sim.p1_wins, 0);
        assert_eq!(sim.p2_wins, 0);
        assert_eq!(sim.round, 1);
        assert_eq!(sim.p1.health, 100);
    }

    #[test]
    fn terminate_returns_to_menu() {
        let mut sim = started_versus();
        run_until_fighting(&mut sim);
        sim.terminate();
        assert_eq!(sim.phase, MatchPhase::Menu);
    }
}
