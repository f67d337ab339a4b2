#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player attack resolution: melee strikes with a rolling combo, hitscan
//! shots, and thrown projectiles.

use std::time::Duration;

use blood_covenant_core::{
    Collider, CollisionQuery, ColliderOwner, CombatTuning, Command, Cue, CueSource, DamageSource,
    EnemyId, Event, Layers, PlayerAction, PlayerStats, RayHit, TimerToken, Timers,
};
use glam::Vec3;

/// Configuration parameters required to construct the combat resolver.
#[derive(Clone, Debug)]
pub struct Config {
    tuning: CombatTuning,
}

impl Config {
    /// Creates a new configuration from the combat tuning block.
    #[must_use]
    pub const fn new(tuning: CombatTuning) -> Self {
        Self { tuning }
    }
}

/// Rolling melee combo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComboState {
    /// Consecutive melee strikes that connected within the window.
    pub hits: u32,
    /// Time at which the combo resets unless another strike connects.
    pub reset_deadline: Option<Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ComboReset;

/// Pure system translating player actions into damage and projectile commands.
#[derive(Debug)]
pub struct CombatResolver {
    tuning: CombatTuning,
    timers: Timers<ComboReset>,
    combo: u32,
    reset: Option<TimerToken>,
    overlaps: Vec<Collider>,
    hits: Vec<RayHit>,
    struck: Vec<EnemyId>,
}

impl CombatResolver {
    /// Creates a new resolver using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
            timers: Timers::new(),
            combo: 0,
            reset: None,
            overlaps: Vec::new(),
            hits: Vec::new(),
            struck: Vec::new(),
        }
    }

    /// Advances the combo window from world events, then resolves the frame's actions.
    ///
    /// `stats` must be the player's current stats so that active buffs apply.
    pub fn handle<C>(
        &mut self,
        events: &[Event],
        actions: &[PlayerAction],
        stats: PlayerStats,
        collision: &C,
        out: &mut Vec<Command>,
    ) where
        C: CollisionQuery + ?Sized,
    {
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                self.timers.advance(*dt);
                while let Some(due) = self.timers.pop_due() {
                    if self.reset == Some(due.token) {
                        tracing::debug!(hits = self.combo, "combo window elapsed");
                        self.combo = 0;
                        self.reset = None;
                    }
                }
            }
        }

        for action in actions {
            match *action {
                PlayerAction::MeleeStrike { origin } => self.melee(origin, stats, collision, out),
                PlayerAction::Shoot { origin, direction } => {
                    self.shoot(origin, direction, stats, collision, out);
                }
                PlayerAction::Throw { origin, direction } => {
                    out.push(Command::SpawnProjectile {
                        origin,
                        direction,
                        speed: self.tuning.projectile_speed,
                        lifetime: self.tuning.projectile_lifetime,
                        damage: self.tuning.projectile_damage,
                    });
                }
            }
        }
    }

    /// Current combo counter and reset deadline.
    #[must_use]
    pub fn combo(&self) -> ComboState {
        ComboState {
            hits: self.combo,
            reset_deadline: self.reset.and_then(|token| self.timers.deadline(token)),
        }
    }

    /// Damage a melee strike deals at the current combo.
    #[must_use]
    pub fn melee_damage(&self, stats: PlayerStats) -> f32 {
        stats.melee_damage * (1.0 + self.tuning.combo_step * self.combo as f32)
    }

    fn melee<C>(&mut self, origin: Vec3, stats: PlayerStats, collision: &C, out: &mut Vec<Command>)
    where
        C: CollisionQuery + ?Sized,
    {
        self.overlaps.clear();
        let radius = self.tuning.melee_radius;
        collision.overlap_sphere(origin, radius, Layers::ENEMY, &mut self.overlaps);

        self.struck.clear();
        for collider in &self.overlaps {
            if let Some(enemy) = collider.owner.live_enemy() {
                if !self.struck.contains(&enemy) {
                    self.struck.push(enemy);
                }
            }
        }

        if self.struck.is_empty() {
            out.push(Command::PlayCue {
                source: CueSource::Player,
                cue: Cue::MeleeMiss,
                position: origin,
            });
            return;
        }

        let amount = self.melee_damage(stats);
        for enemy in &self.struck {
            out.push(Command::DamageEnemy {
                enemy: *enemy,
                amount,
                source: DamageSource::Melee,
            });
        }
        out.push(Command::PlayCue {
            source: CueSource::Player,
            cue: Cue::MeleeHit,
            position: origin,
        });

        self.combo = self.combo.saturating_add(1);
        if let Some(previous) = self.reset.take() {
            let _ = self.timers.cancel(previous);
        }
        self.reset = Some(self.timers.schedule(self.tuning.combo_window, ComboReset));
        tracing::debug!(
            targets = self.struck.len(),
            amount,
            combo = self.combo,
            "melee strike connected"
        );
    }

    fn shoot<C>(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        stats: PlayerStats,
        collision: &C,
        out: &mut Vec<Command>,
    ) where
        C: CollisionQuery + ?Sized,
    {
        out.push(Command::PlayCue {
            source: CueSource::Player,
            cue: Cue::MuzzleFlash,
            position: origin,
        });
        out.push(Command::PlayCue {
            source: CueSource::Player,
            cue: Cue::Shoot,
            position: origin,
        });

        self.hits.clear();
        collision.raycast_all(
            origin,
            direction,
            self.tuning.ranged_range,
            Layers::ENEMY | Layers::ENVIRONMENT | Layers::PLAYER,
            &mut self.hits,
        );
        let Some(hit) = self
            .hits
            .iter()
            .find(|hit| hit.owner != ColliderOwner::Player)
        else {
            return;
        };

        if let Some(enemy) = hit.owner.live_enemy() {
            out.push(Command::DamageEnemy {
                enemy,
                amount: stats.ranged_damage,
                source: DamageSource::Ranged,
            });
        }
        out.push(Command::PlayCue {
            source: CueSource::World,
            cue: Cue::HitEffect,
            position: hit.point,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Scene {
        colliders: Vec<Collider>,
        rays: Vec<RayHit>,
    }

    impl CollisionQuery for Scene {
        fn overlap_sphere(
            &self,
            _center: Vec3,
            _radius: f32,
            _layers: Layers,
            out: &mut Vec<Collider>,
        ) {
            out.extend(self.colliders.iter().copied());
        }

        fn raycast_all(
            &self,
            _origin: Vec3,
            _direction: Vec3,
            _max_distance: f32,
            _layers: Layers,
            out: &mut Vec<RayHit>,
        ) {
            out.extend(self.rays.iter().copied());
        }
    }

    fn enemy(id: u32, dead: bool) -> ColliderOwner {
        ColliderOwner::Enemy {
            id: EnemyId::new(id),
            dead,
        }
    }

    fn collider(owner: ColliderOwner) -> Collider {
        Collider {
            owner,
            center: Vec3::ZERO,
            radius: 0.5,
        }
    }

    fn ray(owner: ColliderOwner, distance: f32) -> RayHit {
        RayHit {
            owner,
            point: Vec3::new(0.0, 0.0, distance),
            distance,
            normal: Vec3::NEG_Z,
        }
    }

    fn damage_of(commands: &[Command]) -> Vec<(EnemyId, f32)> {
        commands
            .iter()
            .filter_map(|command| match command {
                Command::DamageEnemy { enemy, amount, .. } => Some((*enemy, *amount)),
                _ => None,
            })
            .collect()
    }

    fn strike() -> [PlayerAction; 1] {
        [PlayerAction::MeleeStrike { origin: Vec3::Z }]
    }

    #[test]
    fn combo_scales_damage_for_every_target() {
        let mut resolver = CombatResolver::new(Config::new(CombatTuning::default()));
        let scene = Scene {
            colliders: vec![collider(enemy(1, false)), collider(enemy(2, false))],
            ..Scene::default()
        };
        let stats = PlayerStats::default();
        let mut commands = Vec::new();
        for _ in 0..3 {
            resolver.handle(&[], &strike(), stats, &scene, &mut commands);
        }
        assert_eq!(resolver.combo().hits, 3);

        commands.clear();
        resolver.handle(&[], &strike(), stats, &scene, &mut commands);

        let damage = damage_of(&commands);
        assert_eq!(damage.len(), 2);
        for (_, amount) in damage {
            assert!((amount - 25.0 * 1.3).abs() < 1e-4);
        }
    }

    #[test]
    fn miss_leaves_combo_untouched() {
        let mut resolver = CombatResolver::new(Config::new(CombatTuning::default()));
        let hit = Scene {
            colliders: vec![collider(enemy(1, false))],
            ..Scene::default()
        };
        let empty = Scene {
            colliders: vec![collider(enemy(2, true))],
            ..Scene::default()
        };
        let mut commands = Vec::new();

        resolver.handle(&[], &strike(), PlayerStats::default(), &hit, &mut commands);
        commands.clear();
        resolver.handle(&[], &strike(), PlayerStats::default(), &empty, &mut commands);

        assert_eq!(resolver.combo().hits, 1);
        assert!(damage_of(&commands).is_empty());
        assert!(commands.contains(&Command::PlayCue {
            source: CueSource::Player,
            cue: Cue::MeleeMiss,
            position: Vec3::Z,
        }));
    }

    #[test]
    fn combo_resets_after_window_and_restarts_on_hit() {
        let mut resolver = CombatResolver::new(Config::new(CombatTuning::default()));
        let scene = Scene {
            colliders: vec![collider(enemy(1, false))],
            ..Scene::default()
        };
        let mut commands = Vec::new();
        fn tick(millis: u64) -> [Event; 1] {
            [Event::TimeAdvanced {
                dt: Duration::from_millis(millis),
            }]
        }

        resolver.handle(&[], &strike(), PlayerStats::default(), &scene, &mut commands);
        resolver.handle(&tick(800), &strike(), PlayerStats::default(), &scene, &mut commands);
        assert_eq!(resolver.combo().hits, 2);
        assert_eq!(
            resolver.combo().reset_deadline,
            Some(Duration::from_millis(1_800))
        );

        resolver.handle(&tick(900), &[], PlayerStats::default(), &scene, &mut commands);
        assert_eq!(resolver.combo().hits, 2);

        resolver.handle(&tick(100), &[], PlayerStats::default(), &scene, &mut commands);
        assert_eq!(resolver.combo(), ComboState::default());
    }

    #[test]
    fn shots_skip_the_player_and_stop_at_first_object() {
        let mut resolver = CombatResolver::new(Config::new(CombatTuning::default()));
        let scene = Scene {
            rays: vec![
                ray(ColliderOwner::Player, 0.0),
                ray(enemy(4, false), 3.0),
                ray(enemy(5, false), 6.0),
            ],
            ..Scene::default()
        };
        let mut commands = Vec::new();
        let stats = PlayerStats::default().with_damage_scaled(2.0);

        resolver.handle(
            &[],
            &[PlayerAction::Shoot {
                origin: Vec3::ZERO,
                direction: Vec3::Z,
            }],
            stats,
            &scene,
            &mut commands,
        );

        assert_eq!(damage_of(&commands), vec![(EnemyId::new(4), 40.0)]);
        assert!(commands.contains(&Command::PlayCue {
            source: CueSource::World,
            cue: Cue::HitEffect,
            position: Vec3::new(0.0, 0.0, 3.0),
        }));
    }

    #[test]
    fn shots_into_corpses_deal_no_damage() {
        let mut resolver = CombatResolver::new(Config::new(CombatTuning::default()));
        let scene = Scene {
            rays: vec![ray(enemy(4, true), 3.0), ray(enemy(5, false), 6.0)],
            ..Scene::default()
        };
        let mut commands = Vec::new();

        resolver.handle(
            &[],
            &[PlayerAction::Shoot {
                origin: Vec3::ZERO,
                direction: Vec3::Z,
            }],
            PlayerStats::default(),
            &scene,
            &mut commands,
        );

        assert!(damage_of(&commands).is_empty());
    }

    #[test]
    fn throws_launch_configured_projectiles() {
        let mut resolver = CombatResolver::new(Config::new(CombatTuning::default()));
        let mut commands = Vec::new();

        resolver.handle(
            &[],
            &[PlayerAction::Throw {
                origin: Vec3::Y,
                direction: Vec3::X,
            }],
            PlayerStats::default(),
            &Scene::default(),
            &mut commands,
        );

        assert_eq!(
            commands,
            vec![Command::SpawnProjectile {
                origin: Vec3::Y,
                direction: Vec3::X,
                speed: 20.0,
                lifetime: Duration::from_secs(5),
                damage: 20.0,
            }]
        );
    }
}
