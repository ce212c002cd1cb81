//! Fighter state machine - physics, timers, combat state

use serde::{Deserialize, Serialize};

use super::combat::{HitKind, Hitbox, Projectile};
use super::input::ActionInputs;

/// Arena playable width
pub const ARENA_WIDTH: f32 = 1024.0;
/// Wall margin on both sides
pub const ARENA_MARGIN: f32 = 30.0;
/// Ground level (y grows downward)
pub const GROUND_Y: f32 = 480.0;

/// Horizontal speed below which a fighter counts as standing still
pub const MOVE_SPEED_THRESHOLD: f32 = 10.0;

/// Window after an attack in which the next step of a combo may be buffered
pub const COMBO_WINDOW: f32 = 0.6;
/// Perfect-block window measured from the moment the guard came up
pub const PERFECT_BLOCK_WINDOW: f32 = 0.2;

const BLOCKSTUN_DURATION: f32 = 0.2;
const GETTING_UP_DURATION: f32 = 0.4;
const POST_HIT_INVULN: f32 = 0.2;

const DASH_DURATION: f32 = 0.2;
const DASH_COOLDOWN: f32 = 2.0;
const DASH_WALL_CANCEL_COOLDOWN: f32 = 0.5;
const DASH_INVULN: f32 = 0.2;

const SPECIAL_COOLDOWN: f32 = 7.0;
const SPECIAL_WINDUP: f32 = 0.6;
const SPECIAL_ACTIVE: f32 = 0.2;
const SPECIAL_RECOVER: f32 = 0.5;

/// Fighter state tags. Also the wire representation inside snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FighterState {
    Idle,
    Moving,
    Jumping,
    Dashing,
    #[serde(rename = "attack_light_1")]
    AttackLight1,
    #[serde(rename = "attack_light_2")]
    AttackLight2,
    #[serde(rename = "attack_light_3")]
    AttackLight3,
    #[serde(rename = "attack_heavy_1")]
    AttackHeavy1,
    #[serde(rename = "attack_heavy_2")]
    AttackHeavy2,
    #[serde(rename = "attack_heavy_3")]
    AttackHeavy3,
    #[serde(rename = "attack_special_windup")]
    SpecialWindup,
    #[serde(rename = "attack_special_active")]
    SpecialActive,
    #[serde(rename = "attack_special_recover")]
    SpecialRecover,
    Blocking,
    Blockstun,
    Hitstun,
    Knockdown,
    GettingUp,
    DashClashStun,
}

impl FighterState {
    /// States in which new actions are accepted
    pub fn can_act(self) -> bool {
        matches!(self, Self::Idle | Self::Moving | Self::Jumping)
    }

    pub fn is_melee_attack(self) -> bool {
        matches!(
            self,
            Self::AttackLight1
                | Self::AttackLight2
                | Self::AttackLight3
                | Self::AttackHeavy1
                | Self::AttackHeavy2
                | Self::AttackHeavy3
        )
    }

    pub fn is_special(self) -> bool {
        matches!(
            self,
            Self::SpecialWindup | Self::SpecialActive | Self::SpecialRecover
        )
    }

    pub fn is_attack(self) -> bool {
        self.is_melee_attack() || self.is_special()
    }

    pub fn is_combo_finisher(self) -> bool {
        matches!(self, Self::AttackLight3 | Self::AttackHeavy3)
    }

    /// Consequence-bearing states that host snapshots always force-apply
    pub fn is_stun(self) -> bool {
        matches!(self, Self::Hitstun | Self::Knockdown | Self::Blockstun)
    }
}

/// Movement tuning shared by both fighters
#[derive(Debug, Clone, Copy)]
pub struct FighterStats {
    pub max_speed: f32,
    pub acceleration: f32,
    pub ground_friction: f32,
    pub air_friction: f32,
    pub gravity: f32,
    pub jump_impulse: f32,
    pub dash_speed: f32,
}

impl Default for FighterStats {
    fn default() -> Self {
        Self {
            max_speed: 600.0,
            acceleration: 2000.0,
            ground_friction: 1500.0,
            air_friction: 200.0,
            gravity: 2000.0,
            jump_impulse: 850.0,
            dash_speed: 1200.0,
        }
    }
}

/// Physics/timer component: integration, ground and wall clamping, friction.
/// Combat state lives in [`Fighter`], which delegates physical stepping here.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub on_ground: bool,
}

impl Body {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            on_ground: false,
        }
    }

    /// Integrate gravity and velocity, then clamp to ground and arena walls
    fn integrate(&mut self, dt: f32, gravity: f32) {
        self.vy += gravity * dt;
        self.x += self.vx * dt;
        self.y += self.vy * dt;

        if self.y >= GROUND_Y {
            self.y = GROUND_Y;
            self.vy = 0.0;
            self.on_ground = true;
        } else {
            self.on_ground = false;
        }

        // Zero vx only when still pushing into the wall
        if self.x < ARENA_MARGIN {
            self.x = ARENA_MARGIN;
            if self.vx < 0.0 {
                self.vx = 0.0;
            }
        }
        if self.x > ARENA_WIDTH - ARENA_MARGIN {
            self.x = ARENA_WIDTH - ARENA_MARGIN;
            if self.vx > 0.0 {
                self.vx = 0.0;
            }
        }
    }

    fn apply_friction(&mut self, dt: f32, friction: f32) {
        if self.vx > 0.0 {
            self.vx = (self.vx - friction * dt).max(0.0);
        } else if self.vx < 0.0 {
            self.vx = (self.vx + friction * dt).min(0.0);
        }
    }
}

/// Which attack chain a combo belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboChain {
    Light,
    Heavy,
}

struct AttackSpec {
    state: FighterState,
    reach: f32,
    damage: i32,
    knockback: f32,
    duration: f32,
    kind: HitKind,
    step_forward: f32,
}

impl AttackSpec {
    fn for_step(chain: ComboChain, step: u8) -> Self {
        use FighterState::*;
        match (chain, step) {
            (ComboChain::Light, 1) => Self {
                state: AttackLight1,
                reach: 50.0,
                damage: 4,
                knockback: 100.0,
                duration: 0.2,
                kind: HitKind::Light,
                step_forward: 50.0,
            },
            (ComboChain::Light, 2) => Self {
                state: AttackLight2,
                reach: 50.0,
                damage: 6,
                knockback: 150.0,
                duration: 0.2,
                kind: HitKind::Light,
                step_forward: 50.0,
            },
            (ComboChain::Light, _) => Self {
                state: AttackLight3,
                reach: 40.0,
                damage: 12,
                knockback: 400.0,
                duration: 0.4,
                kind: HitKind::Knockdown,
                step_forward: 100.0,
            },
            (ComboChain::Heavy, 1) => Self {
                state: AttackHeavy1,
                reach: 70.0,
                damage: 6,
                knockback: 150.0,
                duration: 0.3,
                kind: HitKind::Heavy,
                step_forward: 50.0,
            },
            (ComboChain::Heavy, 2) => Self {
                state: AttackHeavy2,
                reach: 70.0,
                damage: 8,
                knockback: 200.0,
                duration: 0.3,
                kind: HitKind::Heavy,
                step_forward: 50.0,
            },
            (ComboChain::Heavy, _) => Self {
                state: AttackHeavy3,
                reach: 60.0,
                damage: 15,
                knockback: 450.0,
                duration: 0.5,
                kind: HitKind::Knockdown,
                step_forward: 150.0,
            },
        }
    }
}

/// One fighter's full simulation state. Owned by exactly one [`super::MatchSim`];
/// never shared across fighters.
#[derive(Debug, Clone)]
pub struct Fighter {
    pub body: Body,
    pub stats: FighterStats,
    /// +1 faces right, -1 faces left
    pub facing: i32,
    pub health: i32,
    pub dead: bool,
    pub state: FighterState,
    pub state_timer: f32,
    pub combo_step: u8,
    pub combo_timer: f32,
    pub special_cooldown: f32,
    pub dash_cooldown: f32,
    pub invulnerable: f32,
    /// Seconds since the current guard came up, for perfect-block timing
    pub block_timer: f32,
    /// Present only while an attack's active frames are live
    pub hitbox: Option<Hitbox>,
}

impl Fighter {
    pub fn new(x: f32, facing: i32) -> Self {
        Self {
            body: Body::new(x, GROUND_Y),
            stats: FighterStats::default(),
            facing,
            health: 100,
            dead: false,
            state: FighterState::Idle,
            state_timer: 0.0,
            combo_step: 0,
            combo_timer: 0.0,
            special_cooldown: 0.0,
            dash_cooldown: 0.0,
            invulnerable: 0.0,
            block_timer: 0.0,
            hitbox: None,
        }
    }

    /// Advance one simulation tick. Returns a projectile when the special
    /// attack reaches its active frame this tick.
    pub fn update(
        &mut self,
        dt: f32,
        opponent_x: f32,
        actions: &ActionInputs,
        can_control: bool,
    ) -> Option<Projectile> {
        if self.dead {
            return None;
        }

        self.track_opponent(opponent_x);
        self.step_physics(dt);
        let spawned = self.step_special();

        if !can_control {
            return spawned;
        }

        self.apply_actions(dt, actions);
        spawned
    }

    /// Facing auto-tracks the opponent except while committed to a dash,
    /// special, knockdown recovery or clash stun.
    fn track_opponent(&mut self, opponent_x: f32) {
        use FighterState::*;
        if matches!(self.state, Dashing | Knockdown | GettingUp | DashClashStun)
            || self.state.is_special()
        {
            return;
        }
        self.facing = if opponent_x > self.body.x { 1 } else { -1 };
    }

    fn step_physics(&mut self, dt: f32) {
        use FighterState::*;

        self.body.integrate(dt, self.stats.gravity);

        // A wall stops the dash dead; end it early with a reduced cooldown
        if self.state == Dashing && self.body.vx.abs() < MOVE_SPEED_THRESHOLD {
            self.state = Idle;
            self.state_timer = 0.0;
            self.dash_cooldown = DASH_WALL_CANCEL_COOLDOWN;
        }

        if !matches!(self.state, Moving | Dashing | Knockdown | Hitstun | Blockstun) {
            let friction = if self.body.on_ground {
                self.stats.ground_friction
            } else {
                self.stats.air_friction
            };
            self.body.apply_friction(dt, friction);
        }

        self.special_cooldown = (self.special_cooldown - dt).max(0.0);
        self.dash_cooldown = (self.dash_cooldown - dt).max(0.0);
        self.invulnerable = (self.invulnerable - dt).max(0.0);
        if self.state_timer > 0.0 {
            self.state_timer -= dt;
        }

        if self.combo_timer > 0.0 {
            self.combo_timer -= dt;
            if self.combo_timer <= 0.0 {
                self.combo_step = 0;
            }
        }

        if self.state == Blocking {
            self.block_timer += dt;
        }

        if self.state_timer <= 0.0 {
            if self.state.is_melee_attack()
                || matches!(self.state, Hitstun | Blockstun | GettingUp | DashClashStun)
            {
                // Combo step survives here until the combo window closes
                self.state = Idle;
                self.hitbox = None;
            } else if self.state == Knockdown {
                self.state = GettingUp;
                self.state_timer = GETTING_UP_DURATION;
            }
        }

        // Derive moving/idle from horizontal speed
        if self.state == Idle && self.body.vx.abs() > MOVE_SPEED_THRESHOLD {
            self.state = Moving;
        } else if self.state == Moving && self.body.vx.abs() <= MOVE_SPEED_THRESHOLD {
            self.state = Idle;
        }

        // Derive jumping from airborne status
        if !self.body.on_ground && matches!(self.state, Idle | Moving) {
            self.state = Jumping;
        } else if self.body.on_ground && self.state == Jumping {
            self.state = Idle;
        }
    }

    /// Windup -> active (projectile spawn) -> recover -> idle
    fn step_special(&mut self) -> Option<Projectile> {
        use FighterState::*;
        if self.state_timer > 0.0 {
            return None;
        }
        match self.state {
            SpecialWindup => {
                self.state = SpecialActive;
                self.state_timer = SPECIAL_ACTIVE;
                Some(Projectile::spawn(
                    self.body.x + self.facing as f32 * 60.0,
                    self.body.y - 45.0,
                    self.facing,
                ))
            }
            SpecialActive => {
                self.state = SpecialRecover;
                self.state_timer = SPECIAL_RECOVER;
                None
            }
            SpecialRecover => {
                self.state = Idle;
                None
            }
            _ => None,
        }
    }

    /// True during the short input tail of a non-final attack, when the next
    /// combo step may be entered.
    fn in_combo_tail(&self) -> bool {
        use FighterState::*;
        if self.combo_timer <= 0.0 {
            return false;
        }
        match self.state {
            AttackLight1 | AttackLight2 => self.state_timer < 0.1,
            AttackHeavy1 | AttackHeavy2 => self.state_timer < 0.15,
            _ => false,
        }
    }

    fn apply_actions(&mut self, dt: f32, actions: &ActionInputs) {
        use FighterState::*;

        let can_act = self.state.can_act();
        if !can_act && self.state != Blocking && !self.in_combo_tail() {
            return;
        }

        // Guard enter/exit. Blocking is ground-only; releasing the key drops it.
        if actions.block && self.body.on_ground {
            if self.state != Blocking && can_act {
                self.state = Blocking;
                self.block_timer = 0.0;
            }
        } else if self.state == Blocking {
            self.state = Idle;
        }
        let blocking = self.state == Blocking;

        if actions.jump && can_act && !blocking && self.body.on_ground {
            self.body.vy = -self.stats.jump_impulse;
            self.body.on_ground = false;
        }

        if actions.dash && can_act && !blocking && self.dash_cooldown <= 0.0 {
            self.perform_dash(actions.dx);
        } else if actions.special
            && can_act
            && !blocking
            && self.special_cooldown <= 0.0
            && self.body.on_ground
        {
            self.perform_special();
        } else if actions.heavy && !blocking {
            match self.state {
                Idle | Moving => self.perform_attack(ComboChain::Heavy, 1),
                AttackHeavy1 if self.in_combo_tail() => self.perform_attack(ComboChain::Heavy, 2),
                AttackHeavy2 if self.in_combo_tail() => self.perform_attack(ComboChain::Heavy, 3),
                _ => {}
            }
        } else if actions.light && !blocking {
            match self.state {
                Idle | Moving => self.perform_attack(ComboChain::Light, 1),
                AttackLight1 if self.in_combo_tail() => self.perform_attack(ComboChain::Light, 2),
                AttackLight2 if self.in_combo_tail() => self.perform_attack(ComboChain::Light, 3),
                _ => {}
            }
        } else if !self.state.is_attack() && !matches!(self.state, Dashing | Blockstun) {
            let move_speed = if blocking {
                self.stats.max_speed * 0.5
            } else {
                self.stats.max_speed
            };
            if actions.dx != 0.0 {
                self.body.vx += actions.dx * self.stats.acceleration * dt;
                if self.body.vx.abs() > move_speed {
                    self.body.vx = self.body.vx.signum() * move_speed;
                }
            }
        }
    }

    fn perform_dash(&mut self, dx: f32) {
        self.state = FighterState::Dashing;
        self.state_timer = DASH_DURATION;
        self.dash_cooldown = DASH_COOLDOWN;
        self.invulnerable = DASH_INVULN;
        let dir = if dx != 0.0 {
            dx.signum()
        } else {
            self.facing as f32
        };
        self.body.vx = dir * self.stats.dash_speed;
        self.body.vy = 0.0;
    }

    fn perform_attack(&mut self, chain: ComboChain, step: u8) {
        let spec = AttackSpec::for_step(chain, step);
        self.state = spec.state;
        self.state_timer = spec.duration;
        self.combo_step = step;
        self.combo_timer = COMBO_WINDOW;

        let mut hitbox = Hitbox {
            x: self.body.x + self.facing as f32 * 30.0,
            y: self.body.y - 50.0,
            w: spec.reach,
            h: 30.0,
            damage: spec.damage,
            knockback: spec.knockback,
            kind: spec.kind,
        };
        // The rising finisher hits higher and taller
        if spec.state == FighterState::AttackHeavy3 {
            hitbox.y = self.body.y - 80.0;
            hitbox.h = 60.0;
        }
        self.hitbox = Some(hitbox);

        self.body.vx = self.facing as f32 * spec.step_forward;
    }

    fn perform_special(&mut self) {
        self.state = FighterState::SpecialWindup;
        self.state_timer = SPECIAL_WINDUP;
        self.special_cooldown = SPECIAL_COOLDOWN;
        self.body.vx = 0.0;
    }

    /// Apply a resolved hit. No-op while invulnerable, dead, or already down.
    /// A frontal hit on a standing guard is negated here; the finer perfect
    /// vs chip distinction is combat resolution's concern.
    pub fn take_damage(&mut self, amount: i32, knockback_x: f32, knockback_y: f32, kind: HitKind) {
        use FighterState::*;
        if self.invulnerable > 0.0 || self.dead || matches!(self.state, Knockdown | GettingUp) {
            return;
        }

        if self.state == Blocking {
            let hit_from_front = (self.facing == 1 && knockback_x < 0.0)
                || (self.facing == -1 && knockback_x > 0.0);
            if hit_from_front {
                self.body.vx = knockback_x * 0.5;
                self.state = Blockstun;
                self.state_timer = BLOCKSTUN_DURATION;
                return;
            }
        }

        self.health = (self.health - amount).max(0);
        self.body.vx = knockback_x;
        self.body.vy = knockback_y;

        if kind.causes_knockdown() {
            self.state = Knockdown;
            self.state_timer = if kind == HitKind::DashCollision { 1.0 } else { 1.5 };
            self.combo_step = 0;
        } else {
            self.state = Hitstun;
            self.state_timer = if kind == HitKind::Heavy { 0.4 } else { 0.25 };
        }

        self.invulnerable = POST_HIT_INVULN;

        if self.health == 0 {
            self.dead = true;
            self.state = Knockdown;
        }
    }

    /// Reduced damage through a standing (non-perfect) guard
    pub fn take_chip(&mut self, amount: i32, pushback_x: f32) {
        self.health = (self.health - amount).max(0);
        self.body.vx = pushback_x;
        self.body.vy = 0.0;
        self.state = FighterState::Blockstun;
        self.state_timer = BLOCKSTUN_DURATION;
        if self.health == 0 {
            self.dead = true;
            self.state = FighterState::Knockdown;
        }
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).min(100);
    }

    /// Guard is up and still inside the perfect-block window
    pub fn in_perfect_block_window(&self) -> bool {
        self.state == FighterState::Blocking && self.block_timer < PERFECT_BLOCK_WINDOW
    }

    /// Force a stun reaction on the attacker (perfect-block punish)
    pub fn stun(&mut self, duration: f32) {
        self.state = FighterState::Hitstun;
        self.state_timer = duration;
        self.hitbox = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn grounded(x: f32, facing: i32) -> Fighter {
        let mut f = Fighter::new(x, facing);
        f.body.on_ground = true;
        f
    }

    fn idle_tick(f: &mut Fighter, opponent_x: f32) {
        f.update(DT, opponent_x, &ActionInputs::default(), true);
    }

    #[test]
    fn gravity_pulls_airborne_fighter_back_to_ground() {
        let mut f = grounded(200.0, 1);
        f.body.y = GROUND_Y - 100.0;
        f.body.on_ground = false;
        for _ in 0..120 {
            idle_tick(&mut f, 800.0);
        }
        assert_eq!(f.body.y, GROUND_Y);
        assert!(f.body.on_ground);
        assert_eq!(f.body.vy, 0.0);
    }

    #[test]
    fn walls_clamp_position_and_stop_inward_motion() {
        let mut f = grounded(ARENA_MARGIN + 1.0, 1);
        f.body.vx = -2000.0;
        idle_tick(&mut f, 800.0);
        assert_eq!(f.body.x, ARENA_MARGIN);
        assert_eq!(f.body.vx, 0.0);
    }

    #[test]
    fn jump_is_ground_only() {
        let mut f = grounded(200.0, 1);
        let jump = ActionInputs {
            jump: true,
            ..Default::default()
        };
        f.update(DT, 800.0, &jump, true);
        assert!(f.body.vy < 0.0);

        let vy_airborne = f.body.vy;
        f.update(DT, 800.0, &jump, true);
        // Second jump ignored: already airborne
        assert!(f.body.vy > vy_airborne - 1.0);
    }

    #[test]
    fn dash_sets_invulnerability_and_cooldown() {
        let mut f = grounded(200.0, 1);
        let dash = ActionInputs {
            dash: true,
            ..Default::default()
        };
        f.update(DT, 800.0, &dash, true);
        assert_eq!(f.state, FighterState::Dashing);
        assert!(f.invulnerable > 0.0);
        assert!(f.dash_cooldown > 0.0);

        // Dash again immediately: refused by cooldown
        f.update(DT, 800.0, &dash, true);
        assert_eq!(f.state, FighterState::Dashing);
        let timer_before = f.state_timer;
        f.update(DT, 800.0, &dash, true);
        assert!(f.state_timer < timer_before);
    }

    #[test]
    fn wall_stopped_dash_cancels_with_reduced_cooldown() {
        let mut f = grounded(ARENA_MARGIN + 1.0, 1);
        let dash = ActionInputs {
            dash: true,
            dx: -1.0,
            ..Default::default()
        };
        f.update(DT, 800.0, &dash, true);
        assert_eq!(f.state, FighterState::Dashing);
        // Into the wall: vx zeroed, dash cancelled next tick
        idle_tick(&mut f, 800.0);
        assert_ne!(f.state, FighterState::Dashing);
        assert!(f.dash_cooldown <= 0.5);
    }

    #[test]
    fn combo_advances_within_window_and_caps_at_three() {
        let mut f = grounded(200.0, 1);
        let light = ActionInputs {
            light: true,
            ..Default::default()
        };
        f.update(DT, 800.0, &light, true);
        assert_eq!(f.state, FighterState::AttackLight1);
        assert_eq!(f.combo_step, 1);

        // Wait until the tail window opens (state_timer < 0.1)
        while f.state_timer >= 0.1 {
            idle_tick(&mut f, 800.0);
        }
        f.update(DT, 800.0, &light, true);
        assert_eq!(f.state, FighterState::AttackLight2);
        assert_eq!(f.combo_step, 2);

        while f.state_timer >= 0.1 {
            idle_tick(&mut f, 800.0);
        }
        f.update(DT, 800.0, &light, true);
        assert_eq!(f.state, FighterState::AttackLight3);
        assert_eq!(f.combo_step, 3);
        assert_eq!(f.hitbox.as_ref().unwrap().kind, HitKind::Knockdown);

        // Finisher has no further step
        while f.state_timer >= 0.1 {
            idle_tick(&mut f, 800.0);
        }
        f.update(DT, 800.0, &light, true);
        assert!(f.combo_step <= 3);
    }

    #[test]
    fn combo_step_resets_when_window_expires() {
        let mut f = grounded(200.0, 1);
        let light = ActionInputs {
            light: true,
            ..Default::default()
        };
        f.update(DT, 800.0, &light, true);
        assert_eq!(f.combo_step, 1);
        for _ in 0..120 {
            idle_tick(&mut f, 800.0);
        }
        assert_eq!(f.combo_step, 0);
        assert_eq!(f.state, FighterState::Idle);
    }

    #[test]
    fn expired_attack_returns_to_idle_and_drops_hitbox() {
        let mut f = grounded(200.0, 1);
        let heavy = ActionInputs {
            heavy: true,
            ..Default::default()
        };
        f.update(DT, 800.0, &heavy, true);
        assert!(f.hitbox.is_some());
        for _ in 0..30 {
            idle_tick(&mut f, 800.0);
        }
        assert_eq!(f.state, FighterState::Idle);
        assert!(f.hitbox.is_none());
    }

    #[test]
    fn knockdown_recovers_through_getting_up() {
        let mut f = grounded(200.0, 1);
        f.take_damage(10, 300.0, -400.0, HitKind::Knockdown);
        assert_eq!(f.state, FighterState::Knockdown);
        for _ in 0..100 {
            idle_tick(&mut f, 800.0);
        }
        assert_eq!(f.state, FighterState::GettingUp);
        for _ in 0..30 {
            idle_tick(&mut f, 800.0);
        }
        assert_eq!(f.state, FighterState::Idle);
    }

    #[test]
    fn special_walks_windup_active_recover() {
        let mut f = grounded(200.0, 1);
        let special = ActionInputs {
            special: true,
            ..Default::default()
        };
        f.update(DT, 800.0, &special, true);
        assert_eq!(f.state, FighterState::SpecialWindup);
        assert!(f.special_cooldown > 0.0);

        let mut spawned = None;
        for _ in 0..120 {
            if let Some(p) = f.update(DT, 800.0, &ActionInputs::default(), true) {
                spawned = Some(p);
                break;
            }
        }
        let projectile = spawned.expect("active frame spawns a projectile");
        assert!(projectile.vx > 0.0);
        assert_eq!(f.state, FighterState::SpecialActive);

        for _ in 0..120 {
            idle_tick(&mut f, 800.0);
        }
        assert_eq!(f.state, FighterState::Idle);
    }

    #[test]
    fn take_damage_never_drives_health_negative() {
        let mut f = grounded(200.0, 1);
        f.health = 3;
        f.take_damage(50, 300.0, -100.0, HitKind::Light);
        assert_eq!(f.health, 0);
        assert!(f.dead);
        assert_eq!(f.state, FighterState::Knockdown);
    }

    #[test]
    fn invulnerable_fighter_ignores_damage() {
        let mut f = grounded(200.0, 1);
        f.invulnerable = 0.5;
        f.take_damage(20, 300.0, -100.0, HitKind::Light);
        assert_eq!(f.health, 100);
        assert_eq!(f.state, FighterState::Idle);
    }

    #[test]
    fn knockdown_class_hits_floor_the_target() {
        for kind in [
            HitKind::Knockdown,
            HitKind::Special,
            HitKind::SpecialProjectile,
            HitKind::DashCollision,
        ] {
            let mut f = grounded(200.0, 1);
            f.combo_step = 2;
            f.take_damage(10, 300.0, -400.0, kind);
            assert_eq!(f.state, FighterState::Knockdown, "{kind:?}");
            assert_eq!(f.combo_step, 0, "knockdown resets the combo");
        }
        for kind in [HitKind::Light, HitKind::Heavy] {
            let mut f = grounded(200.0, 1);
            f.take_damage(10, 300.0, -100.0, kind);
            assert_eq!(f.state, FighterState::Hitstun, "{kind:?}");
        }
    }

    #[test]
    fn frontal_block_negates_damage_into_blockstun() {
        let mut f = grounded(200.0, 1);
        f.state = FighterState::Blocking;
        // Facing right, knockback pushing left: frontal
        f.take_damage(20, -300.0, -100.0, HitKind::Heavy);
        assert_eq!(f.health, 100);
        assert_eq!(f.state, FighterState::Blockstun);
        assert_eq!(f.body.vx, -150.0);
    }

    #[test]
    fn block_from_behind_is_pierced() {
        let mut f = grounded(200.0, 1);
        f.state = FighterState::Blocking;
        // Knockback pushing right while facing right: hit from behind
        f.take_damage(20, 300.0, -100.0, HitKind::Light);
        assert_eq!(f.health, 80);
        assert_eq!(f.state, FighterState::Hitstun);
    }

    #[test]
    fn dead_fighter_freezes_and_ignores_input() {
        let mut f = grounded(200.0, 1);
        f.take_damage(200, 300.0, -400.0, HitKind::Special);
        assert!(f.dead);
        let light = ActionInputs {
            light: true,
            ..Default::default()
        };
        for _ in 0..120 {
            f.update(DT, 800.0, &light, true);
        }
        assert_eq!(f.state, FighterState::Knockdown);
        assert!(f.hitbox.is_none());
    }

    #[test]
    fn facing_tracks_opponent_except_while_committed() {
        let mut f = grounded(500.0, 1);
        idle_tick(&mut f, 100.0);
        assert_eq!(f.facing, -1);
        idle_tick(&mut f, 900.0);
        assert_eq!(f.facing, 1);

        let dash = ActionInputs {
            dash: true,
            ..Default::default()
        };
        f.update(DT, 900.0, &dash, true);
        assert_eq!(f.state, FighterState::Dashing);
        // Opponent now behind; facing frozen during the dash
        f.update(DT, 100.0, &ActionInputs::default(), true);
        assert_eq!(f.facing, 1);
    }

    #[test]
    fn blocking_is_ground_only_and_released_on_key_up() {
        let mut f = grounded(200.0, 1);
        let block = ActionInputs {
            block: true,
            ..Default::default()
        };
        f.update(DT, 800.0, &block, true);
        assert_eq!(f.state, FighterState::Blocking);
        f.update(DT, 800.0, &ActionInputs::default(), true);
        assert_ne!(f.state, FighterState::Blocking);
    }
}
