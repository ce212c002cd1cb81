//! Combat resolution - hitboxes, projectiles, block rules, clashes

use serde::{Deserialize, Serialize};

use super::fighter::{Fighter, FighterState, ARENA_MARGIN, ARENA_WIDTH};
use crate::ws::protocol::PlayerSide;

/// Health refunded by a perfectly timed block
const PERFECT_BLOCK_REFUND: i32 = 5;
/// Stun inflicted on an attacker whose hit was perfectly blocked
const PERFECT_BLOCK_PUNISH: f32 = 0.5;

const DASH_HIT_DAMAGE: i32 = 8;
const DASH_HIT_KNOCKBACK: f32 = 400.0;
const DASH_CLASH_REBOUND: f32 = 400.0;
const DASH_CLASH_STUN: f32 = 0.5;
const DASH_HIT_COOLDOWN: f32 = 1.0;

/// Minimum horizontal separation between standing fighters
const BODY_MIN_DISTANCE: f32 = 40.0;

/// Hit classification; decides knockdown vs hitstun and the vertical pop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Light,
    Heavy,
    Knockdown,
    Special,
    SpecialProjectile,
    DashCollision,
}

impl HitKind {
    pub fn causes_knockdown(self) -> bool {
        matches!(
            self,
            Self::Knockdown | Self::Special | Self::SpecialProjectile | Self::DashCollision
        )
    }

    /// Upward pop applied alongside horizontal knockback
    fn vertical_pop(self) -> f32 {
        if self.causes_knockdown() {
            -400.0
        } else {
            -100.0
        }
    }
}

/// An attack's active damage region, fixed in arena space when the attack
/// starts.
#[derive(Debug, Clone, Copy)]
pub struct Hitbox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub damage: i32,
    pub knockback: f32,
    pub kind: HitKind,
}

impl Hitbox {
    fn overlaps(&self, other: &Hitbox) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

/// The fixed target-damage region centered on a fighter
fn hurtbox(fighter: &Fighter) -> Hitbox {
    Hitbox {
        x: fighter.body.x - 15.0,
        y: fighter.body.y - 60.0,
        w: 30.0,
        h: 60.0,
        damage: 0,
        knockback: 0.0,
        kind: HitKind::Light,
    }
}

/// Body box used for dash collisions
fn body_box(fighter: &Fighter) -> Hitbox {
    Hitbox {
        x: fighter.body.x - 20.0,
        y: fighter.body.y - 50.0,
        w: 40.0,
        h: 50.0,
        damage: 0,
        knockback: 0.0,
        kind: HitKind::Light,
    }
}

/// Special-attack projectile. Destroyed on expiry or first hit.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub facing: i32,
    pub damage: i32,
    pub lifetime: f32,
    pub active: bool,
    /// Owner side, filled by the orchestrator on spawn (self-hit exclusion)
    pub owner: PlayerSide,
}

impl Projectile {
    const SPEED: f32 = 800.0;
    const DAMAGE: i32 = 25;
    const LIFETIME: f32 = 2.0;
    const WIDTH: f32 = 60.0;
    const HEIGHT: f32 = 40.0;

    /// Spawned by the fighter's special active frame; ownership is stamped by
    /// the orchestrator, which knows which side spawned it.
    pub fn spawn(x: f32, y: f32, facing: i32) -> Self {
        Self {
            x,
            y,
            vx: facing as f32 * Self::SPEED,
            facing,
            damage: Self::DAMAGE,
            lifetime: Self::LIFETIME,
            active: true,
            owner: PlayerSide::P1,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.x += self.vx * dt;
        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            self.active = false;
        }
    }

    fn hitbox(&self) -> Hitbox {
        Hitbox {
            x: self.x - Self::WIDTH / 2.0,
            y: self.y - Self::HEIGHT / 2.0,
            w: Self::WIDTH,
            h: Self::HEIGHT,
            damage: self.damage,
            knockback: 400.0,
            kind: HitKind::SpecialProjectile,
        }
    }
}

/// How a resolved contact landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Clean,
    Chip,
    PerfectBlock,
}

/// A resolved contact, reported to the orchestrator for AI observation and
/// host-side immediate sync.
#[derive(Debug, Clone, Copy)]
pub struct HitEvent {
    pub attacker: PlayerSide,
    pub target: PlayerSide,
    pub damage: i32,
    pub outcome: HitOutcome,
}

/// Runs once per tick after fighters and projectiles have updated
pub struct CombatSystem;

impl CombatSystem {
    pub fn resolve_tick(
        p1: &mut Fighter,
        p2: &mut Fighter,
        projectiles: &mut Vec<Projectile>,
    ) -> Vec<HitEvent> {
        let mut events = Vec::new();

        if let Some(event) = Self::resolve_melee(p1, p2, PlayerSide::P1) {
            events.push(event);
        }
        if let Some(event) = Self::resolve_melee(p2, p1, PlayerSide::P2) {
            events.push(event);
        }

        for projectile in projectiles.iter_mut().filter(|p| p.active) {
            let (target, target_side) = match projectile.owner {
                PlayerSide::P1 => (&mut *p2, PlayerSide::P2),
                PlayerSide::P2 => (&mut *p1, PlayerSide::P1),
            };
            let hitbox = projectile.hitbox();
            if hitbox.overlaps(&hurtbox(target)) {
                let (outcome, damage) =
                    Self::resolve_hit(&hitbox, None, target, projectile.facing);
                projectile.active = false;
                events.push(HitEvent {
                    attacker: projectile.owner,
                    target: target_side,
                    damage,
                    outcome,
                });
            }
        }
        projectiles.retain(|p| p.active);

        events.extend(Self::resolve_dashes(p1, p2));

        Self::resolve_body_overlap(p1, p2);

        events
    }

    fn resolve_melee(
        attacker: &mut Fighter,
        target: &mut Fighter,
        attacker_side: PlayerSide,
    ) -> Option<HitEvent> {
        let hitbox = attacker.hitbox?;
        if hitbox.kind == HitKind::SpecialProjectile || !hitbox.overlaps(&hurtbox(target)) {
            return None;
        }

        let facing = attacker.facing;
        let (outcome, damage) = Self::resolve_hit(&hitbox, Some(&mut *attacker), target, facing);
        // One hit per swing
        attacker.hitbox = None;

        Some(HitEvent {
            attacker: attacker_side,
            target: attacker_side.other(),
            damage,
            outcome,
        })
    }

    /// Block-aware damage application. `attacker` is absent for projectiles,
    /// whose owner is out of punish reach.
    fn resolve_hit(
        hitbox: &Hitbox,
        attacker: Option<&mut Fighter>,
        target: &mut Fighter,
        attacker_facing: i32,
    ) -> (HitOutcome, i32) {
        let knockback_x = attacker_facing as f32 * hitbox.knockback;
        let knockback_y = hitbox.kind.vertical_pop();

        if target.state == FighterState::Blocking && facing_off(attacker_facing, target.facing) {
            if target.in_perfect_block_window() {
                target.heal(PERFECT_BLOCK_REFUND);
                target.body.vx = attacker_facing as f32 * 50.0;
                if let Some(attacker) = attacker {
                    attacker.stun(PERFECT_BLOCK_PUNISH);
                }
                return (HitOutcome::PerfectBlock, 0);
            }
            let chip = chip_damage(hitbox.damage);
            target.take_chip(chip, knockback_x * 0.5);
            return (HitOutcome::Chip, chip);
        }

        target.take_damage(hitbox.damage, knockback_x, knockback_y, hitbox.kind);
        (HitOutcome::Clean, hitbox.damage)
    }

    fn resolve_dashes(p1: &mut Fighter, p2: &mut Fighter) -> Vec<HitEvent> {
        let mut events = Vec::new();

        if p1.state == FighterState::Dashing
            && p2.state == FighterState::Dashing
            && body_box(p1).overlaps(&body_box(p2))
        {
            // Clash: both bounce away and eat the clash stun
            for fighter in [&mut *p1, &mut *p2] {
                fighter.body.vx = -fighter.facing as f32 * DASH_CLASH_REBOUND;
                fighter.state = FighterState::DashClashStun;
                fighter.state_timer = DASH_CLASH_STUN;
                fighter.dash_cooldown = DASH_HIT_COOLDOWN;
            }
            return events;
        }

        if p1.state == FighterState::Dashing && body_box(p1).overlaps(&body_box(p2)) {
            if let Some(event) = Self::resolve_dash_hit(p1, p2, PlayerSide::P1) {
                events.push(event);
            }
        }
        if p2.state == FighterState::Dashing && body_box(p2).overlaps(&body_box(p1)) {
            if let Some(event) = Self::resolve_dash_hit(p2, p1, PlayerSide::P2) {
                events.push(event);
            }
        }

        events
    }

    fn resolve_dash_hit(
        attacker: &mut Fighter,
        target: &mut Fighter,
        attacker_side: PlayerSide,
    ) -> Option<HitEvent> {
        let facing = attacker.facing;

        // The dash ends on contact regardless of how the hit lands
        attacker.body.vx = -facing as f32 * 200.0;
        attacker.state = FighterState::Idle;
        attacker.state_timer = 0.0;
        attacker.dash_cooldown = DASH_HIT_COOLDOWN;

        let knockback_x = facing as f32 * DASH_HIT_KNOCKBACK;

        if target.state == FighterState::Blocking && facing_off(facing, target.facing) {
            if target.in_perfect_block_window() {
                target.heal(PERFECT_BLOCK_REFUND);
                attacker.stun(PERFECT_BLOCK_PUNISH);
                return Some(HitEvent {
                    attacker: attacker_side,
                    target: attacker_side.other(),
                    damage: 0,
                    outcome: HitOutcome::PerfectBlock,
                });
            }
            let chip = chip_damage(DASH_HIT_DAMAGE);
            target.take_chip(chip, knockback_x * 0.5);
            return Some(HitEvent {
                attacker: attacker_side,
                target: attacker_side.other(),
                damage: chip,
                outcome: HitOutcome::Chip,
            });
        }

        target.take_damage(
            DASH_HIT_DAMAGE,
            knockback_x,
            -200.0,
            HitKind::DashCollision,
        );
        Some(HitEvent {
            attacker: attacker_side,
            target: attacker_side.other(),
            damage: DASH_HIT_DAMAGE,
            outcome: HitOutcome::Clean,
        })
    }

    /// Push overlapping bodies apart symmetrically, then re-clamp to the
    /// arena. Prevents permanent overlap and corner-trapping.
    fn resolve_body_overlap(p1: &mut Fighter, p2: &mut Fighter) {
        let dx = (p1.body.x - p2.body.x).abs();
        let dy = (p1.body.y - p2.body.y).abs();
        if dx >= BODY_MIN_DISTANCE || dy >= 100.0 {
            return;
        }

        let overlap = BODY_MIN_DISTANCE - dx;
        let push_dir = if p1.body.x < p2.body.x { -1.0 } else { 1.0 };

        if !p1.dead && p1.state != FighterState::Knockdown {
            p1.body.x += push_dir * overlap * 0.5;
        }
        if !p2.dead && p2.state != FighterState::Knockdown {
            p2.body.x -= push_dir * overlap * 0.5;
        }

        let max_x = ARENA_WIDTH - ARENA_MARGIN;
        p1.body.x = p1.body.x.clamp(ARENA_MARGIN, max_x);
        p2.body.x = p2.body.x.clamp(ARENA_MARGIN, max_x);
    }
}

fn facing_off(attacker_facing: i32, target_facing: i32) -> bool {
    (attacker_facing == 1 && target_facing == -1) || (attacker_facing == -1 && target_facing == 1)
}

fn chip_damage(damage: i32) -> i32 {
    (damage as f32 * 0.1).ceil() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fighter::PERFECT_BLOCK_WINDOW;

    fn fighter_at(x: f32, facing: i32) -> Fighter {
        let mut f = Fighter::new(x, facing);
        f.body.on_ground = true;
        f
    }

    fn melee_hitbox(attacker: &Fighter, damage: i32, kind: HitKind) -> Hitbox {
        Hitbox {
            x: attacker.body.x + attacker.facing as f32 * 30.0,
            y: attacker.body.y - 50.0,
            w: 50.0,
            h: 30.0,
            damage,
            knockback: 200.0,
            kind,
        }
    }

    /// Attacker at 200 facing right, target at 250 facing left
    fn clinch() -> (Fighter, Fighter) {
        (fighter_at(200.0, 1), fighter_at(250.0, -1))
    }

    /// Close enough that the fighters' body boxes overlap
    fn body_contact() -> (Fighter, Fighter) {
        (fighter_at(200.0, 1), fighter_at(235.0, -1))
    }

    #[test]
    fn chip_is_ten_percent_rounded_up() {
        assert_eq!(chip_damage(4), 1);
        assert_eq!(chip_damage(12), 2);
        assert_eq!(chip_damage(25), 3);
    }

    #[test]
    fn overlapping_hitbox_damages_target() {
        let (mut p1, mut p2) = clinch();
        p1.hitbox = Some(melee_hitbox(&p1, 10, HitKind::Light));

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, HitOutcome::Clean);
        assert_eq!(p2.health, 90);
        assert_eq!(p2.state, FighterState::Hitstun);
        // Swing is consumed
        assert!(p1.hitbox.is_none());
    }

    #[test]
    fn out_of_reach_hitbox_misses() {
        let mut p1 = fighter_at(200.0, 1);
        let mut p2 = fighter_at(600.0, -1);
        p1.hitbox = Some(melee_hitbox(&p1, 10, HitKind::Light));

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert!(events.is_empty());
        assert_eq!(p2.health, 100);
        assert!(p1.hitbox.is_some());
    }

    #[test]
    fn perfect_block_refunds_health_and_stuns_attacker() {
        let (mut p1, mut p2) = clinch();
        p2.health = 90;
        p2.state = FighterState::Blocking;
        p2.block_timer = 0.05;
        p1.hitbox = Some(melee_hitbox(&p1, 10, HitKind::Light));

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert_eq!(events[0].outcome, HitOutcome::PerfectBlock);
        assert_eq!(events[0].damage, 0);
        assert_eq!(p2.health, 95);
        assert_eq!(p1.state, FighterState::Hitstun);
    }

    #[test]
    fn late_block_takes_chip_never_full_damage() {
        let (mut p1, mut p2) = clinch();
        p2.state = FighterState::Blocking;
        p2.block_timer = PERFECT_BLOCK_WINDOW + 0.02;
        p1.hitbox = Some(melee_hitbox(&p1, 12, HitKind::Light));

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert_eq!(events[0].outcome, HitOutcome::Chip);
        assert_eq!(p2.health, 98);
        assert_eq!(p2.state, FighterState::Blockstun);
        // Halved knockback, no vertical pop
        assert_eq!(p2.body.vx, 100.0);
        assert_eq!(p2.body.vy, 0.0);
    }

    #[test]
    fn block_facing_away_does_not_guard() {
        let (mut p1, mut p2) = clinch();
        p2.facing = 1; // Same direction as the attacker: back turned
        p2.state = FighterState::Blocking;
        p2.block_timer = 0.05;
        p1.hitbox = Some(melee_hitbox(&p1, 10, HitKind::Light));

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert_eq!(events[0].outcome, HitOutcome::Clean);
        assert_eq!(p2.health, 90);
    }

    #[test]
    fn projectile_hit_knocks_down_and_despawns() {
        let mut p1 = fighter_at(200.0, 1);
        let mut p2 = fighter_at(600.0, -1);
        let mut projectile = Projectile::spawn(590.0, p2.body.y - 45.0, 1);
        projectile.owner = PlayerSide::P1;
        let mut projectiles = vec![projectile];

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut projectiles);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].damage, 25);
        assert_eq!(p2.health, 75);
        assert_eq!(p2.state, FighterState::Knockdown);
        assert!(projectiles.is_empty());
    }

    #[test]
    fn projectile_ignores_its_owner() {
        let mut p1 = fighter_at(200.0, 1);
        let mut p2 = fighter_at(600.0, -1);
        let mut projectile = Projectile::spawn(200.0, p1.body.y - 45.0, -1);
        projectile.owner = PlayerSide::P1;
        let mut projectiles = vec![projectile];

        CombatSystem::resolve_tick(&mut p1, &mut p2, &mut projectiles);
        assert_eq!(p1.health, 100);
        assert_eq!(projectiles.len(), 1);
    }

    #[test]
    fn expired_projectile_deactivates_without_hit() {
        let mut projectile = Projectile::spawn(100.0, 400.0, 1);
        for _ in 0..130 {
            projectile.update(1.0 / 60.0);
        }
        assert!(!projectile.active);
    }

    #[test]
    fn simultaneous_dashes_clash() {
        let (mut p1, mut p2) = body_contact();
        p1.state = FighterState::Dashing;
        p2.state = FighterState::Dashing;

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert!(events.is_empty());
        assert_eq!(p1.state, FighterState::DashClashStun);
        assert_eq!(p2.state, FighterState::DashClashStun);
        // Both bounce away from their facing
        assert!(p1.body.vx < 0.0);
        assert!(p2.body.vx > 0.0);
    }

    #[test]
    fn dash_into_standing_target_knocks_down() {
        let (mut p1, mut p2) = body_contact();
        p1.state = FighterState::Dashing;

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert_eq!(events[0].outcome, HitOutcome::Clean);
        assert_eq!(p2.health, 92);
        assert_eq!(p2.state, FighterState::Knockdown);
        // Attacker rebounds out of the dash
        assert_eq!(p1.state, FighterState::Idle);
        assert!(p1.body.vx < 0.0);
    }

    #[test]
    fn dash_against_perfect_block_punishes_attacker() {
        let (mut p1, mut p2) = body_contact();
        p1.state = FighterState::Dashing;
        p2.state = FighterState::Blocking;
        p2.block_timer = 0.05;
        p2.health = 80;

        let events = CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert_eq!(events[0].outcome, HitOutcome::PerfectBlock);
        assert_eq!(p2.health, 85);
        assert_eq!(p1.state, FighterState::Hitstun);
    }

    #[test]
    fn overlapping_bodies_are_pushed_apart() {
        let mut p1 = fighter_at(500.0, 1);
        let mut p2 = fighter_at(510.0, -1);

        CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert!((p1.body.x - p2.body.x).abs() >= BODY_MIN_DISTANCE - 0.01);
        assert!(p1.body.x < p2.body.x);
    }

    #[test]
    fn corner_push_stays_inside_arena() {
        let mut p1 = fighter_at(ARENA_MARGIN, 1);
        let mut p2 = fighter_at(ARENA_MARGIN + 5.0, -1);

        CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert!(p1.body.x >= ARENA_MARGIN);
        assert!(p2.body.x >= ARENA_MARGIN);
    }

    #[test]
    fn knocked_down_body_is_not_pushed() {
        let mut p1 = fighter_at(500.0, 1);
        let mut p2 = fighter_at(510.0, -1);
        p2.state = FighterState::Knockdown;

        CombatSystem::resolve_tick(&mut p1, &mut p2, &mut Vec::new());
        assert_eq!(p2.body.x, 510.0);
    }
}
