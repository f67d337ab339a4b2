#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Blood Covenant encounter.
//!
//! The world is the single writer of gameplay state: player vitals and stats,
//! the live enemy set, projectiles, pickups, obstacles, and collected lore.
//! Every mutation enters through [`apply`] and is reported back as [`Event`]
//! values; everything else reads through [`query`].

mod collision;
mod enemy;
mod locomotion;
mod player;
mod projectiles;

use std::{collections::BTreeMap, fmt, time::Duration};

use blood_covenant_core::{
    planar_distance, Command, ConfigError, Cue, CueSource, DamageSource, EncounterConfig, EnemyId,
    EnemyKind, EnemyTable, EnemyTuning, Event, ObstacleId, PickupId, PlayerTuning, PowerUpId,
    ProjectileId, WELCOME_BANNER,
};
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use collision::CollisionView;
pub use enemy::EnemyPhase;
pub use locomotion::{steering_for, LocomotionFactory, SteeringLocomotion};

use enemy::{AgentContext, EnemyAgent, Strike};
use player::Player;
use projectiles::Projectile;

/// Static inputs the world is created from.
#[derive(Clone, Debug, Default)]
pub struct WorldSettings {
    /// Enemy stat table consulted on every spawn request.
    pub enemies: EnemyTable,
    /// Behaviour parameters shared by every enemy.
    pub enemy: EnemyTuning,
    /// Player vitals and baseline stats.
    pub player: PlayerTuning,
}

impl WorldSettings {
    /// Extracts the world's portion of an encounter configuration.
    pub fn from_config(config: &EncounterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            enemies: config.enemy_table()?,
            enemy: config.enemy.clone(),
            player: config.player.clone(),
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct Pickup {
    power_up: PowerUpId,
    position: Vec3,
}

#[derive(Clone, Copy, Debug)]
struct Obstacle {
    center: Vec3,
    radius: f32,
}

/// Represents the authoritative encounter world state.
pub struct World {
    banner: &'static str,
    settings: WorldSettings,
    locomotion: LocomotionFactory,
    rng: ChaCha8Rng,
    clock: Duration,
    player: Player,
    enemies: BTreeMap<EnemyId, EnemyAgent>,
    next_enemy_id: u32,
    projectiles: BTreeMap<ProjectileId, Projectile>,
    next_projectile_id: u32,
    pickups: BTreeMap<PickupId, Pickup>,
    next_pickup_id: u32,
    obstacles: BTreeMap<ObstacleId, Obstacle>,
    next_obstacle_id: u32,
    lore: Vec<String>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("clock", &self.clock)
            .field("player", &self.player)
            .field("enemies", &self.enemies.len())
            .field("projectiles", &self.projectiles.len())
            .field("pickups", &self.pickups.len())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Creates a world with the default steering locomotion.
    #[must_use]
    pub fn new(settings: WorldSettings, seed: u64) -> Self {
        Self {
            banner: WELCOME_BANNER,
            player: Player::new(&settings.player),
            settings,
            locomotion: Box::new(steering_for),
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock: Duration::ZERO,
            enemies: BTreeMap::new(),
            next_enemy_id: 0,
            projectiles: BTreeMap::new(),
            next_projectile_id: 0,
            pickups: BTreeMap::new(),
            next_pickup_id: 0,
            obstacles: BTreeMap::new(),
            next_obstacle_id: 0,
            lore: Vec::new(),
        }
    }

    /// Replaces the factory that builds enemy locomotion on spawn.
    #[must_use]
    pub fn with_locomotion(mut self, factory: LocomotionFactory) -> Self {
        self.locomotion = factory;
        self
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let mut strikes: Vec<Strike> = Vec::new();
        let mut context = AgentContext {
            now: self.clock,
            dt,
            player_position: self.player.position,
            tuning: &self.settings.enemy,
            rng: &mut self.rng,
        };
        for agent in self.enemies.values_mut() {
            if let Some(strike) = agent.advance(&mut context, out_events) {
                strikes.push(strike);
            }
        }
        for strike in strikes {
            self.player
                .take_damage(strike.damage, DamageSource::Enemy(strike.enemy), out_events);
        }

        self.advance_projectiles(dt, out_events);
        self.collect_pickups(out_events);

        let now = self.clock;
        let expired: Vec<EnemyId> = self
            .enemies
            .values()
            .filter(|agent| agent.despawn_due(now))
            .map(|agent| agent.id)
            .collect();
        for enemy in expired {
            let _ = self.enemies.remove(&enemy);
            out_events.push(Event::EnemyDespawned { enemy });
        }
    }

    fn spawn_enemy(&mut self, kind: EnemyKind, position: Vec3, out_events: &mut Vec<Event>) {
        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.wrapping_add(1);

        let Some(definition) = self.settings.enemies.get(kind) else {
            tracing::error!(?kind, enemy = id.get(), "no enemy definition configured");
            let despawn_at = self.clock + self.settings.enemy.despawn_delay;
            let agent = EnemyAgent::inert(id, kind, position, despawn_at);
            let _ = self.enemies.insert(id, agent);
            out_events.push(Event::EnemySpawnRejected { kind, enemy: id });
            return;
        };

        let locomotion = (self.locomotion)(definition, &self.settings.enemy);
        let agent = EnemyAgent::spawn(
            id,
            position,
            definition,
            locomotion,
            &self.settings.enemy,
            self.clock,
            &mut self.rng,
        );
        let _ = self.enemies.insert(id, agent);
        tracing::debug!(?kind, enemy = id.get(), "enemy spawned");
        out_events.push(Event::EnemySpawned {
            enemy: id,
            kind,
            position,
        });
    }

    pub(crate) fn damage_enemy(
        &mut self,
        enemy: EnemyId,
        amount: f32,
        source: DamageSource,
        out_events: &mut Vec<Event>,
    ) {
        let Some(agent) = self.enemies.get_mut(&enemy) else {
            tracing::trace!(enemy = enemy.get(), "damage addressed to a removed enemy");
            return;
        };
        let _ = agent.take_damage(amount, source, &self.settings.enemy, self.clock, out_events);
    }

    fn collect_pickups(&mut self, out_events: &mut Vec<Event>) {
        if self.player.is_dead() {
            return;
        }
        let player = self.player.position;
        let reach = self.player.pickup_radius;
        let collected: Vec<PickupId> = self
            .pickups
            .iter()
            .filter(|(_, pickup)| planar_distance(player, pickup.position) <= reach)
            .map(|(id, _)| *id)
            .collect();

        for pickup in collected {
            let Some(entry) = self.pickups.remove(&pickup) else {
                continue;
            };
            out_events.push(Event::Cue {
                source: CueSource::World,
                cue: Cue::Pickup,
                position: entry.position,
            });
            out_events.push(Event::PickupCollected {
                pickup,
                power_up: entry.power_up,
            });
        }
    }

    fn spawn_projectile(&mut self, projectile: Projectile, out_events: &mut Vec<Event>) {
        if projectile.direction == Vec3::ZERO {
            tracing::warn!("projectile launched without a direction was dropped");
            return;
        }
        let id = ProjectileId::new(self.next_projectile_id);
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        let _ = self.projectiles.insert(id, projectile);
        out_events.push(Event::ProjectileSpawned { projectile: id });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::MovePlayer { position, facing } => {
            world.player.position = position;
            if facing.length_squared() > f32::EPSILON {
                world.player.facing = facing.normalize();
            }
        }
        Command::SpawnEnemy { kind, position } => world.spawn_enemy(kind, position, out_events),
        Command::DamageEnemy {
            enemy,
            amount,
            source,
        } => world.damage_enemy(enemy, amount, source, out_events),
        Command::DamagePlayer { amount, source } => {
            world.player.take_damage(amount, source, out_events);
        }
        Command::HealPlayer { amount } => world.player.heal(amount, out_events),
        Command::SetPlayerStats { stats } => {
            world.player.stats = stats;
            out_events.push(Event::PlayerStatsChanged { stats });
        }
        Command::SetPlayerInvincible { invincible } => {
            world.player.invincible = invincible;
            out_events.push(Event::InvincibilityChanged { invincible });
        }
        Command::SpawnProjectile {
            origin,
            direction,
            speed,
            lifetime,
            damage,
        } => world.spawn_projectile(
            Projectile {
                position: origin,
                direction: direction.normalize_or_zero(),
                speed,
                remaining: lifetime,
                damage,
            },
            out_events,
        ),
        Command::SpawnPickup { power_up, position } => {
            let pickup = PickupId::new(world.next_pickup_id);
            world.next_pickup_id = world.next_pickup_id.wrapping_add(1);
            let _ = world.pickups.insert(pickup, Pickup { power_up, position });
            out_events.push(Event::PickupSpawned {
                pickup,
                power_up,
                position,
            });
        }
        Command::PlaceObstacle { center, radius } => {
            let id = ObstacleId::new(world.next_obstacle_id);
            world.next_obstacle_id = world.next_obstacle_id.wrapping_add(1);
            let _ = world.obstacles.insert(
                id,
                Obstacle {
                    center,
                    radius: radius.max(0.0),
                },
            );
        }
        Command::ShowLore { text, audio_cue } => {
            let first_time = !world.lore.contains(&text);
            if first_time {
                world.lore.push(text.clone());
            }
            tracing::info!(lore = %text, first_time, "lore displayed");
            out_events.push(Event::LoreDisplayed {
                text,
                audio_cue,
                first_time,
            });
        }
        Command::PlayCue {
            source,
            cue,
            position,
        } => out_events.push(Event::Cue {
            source,
            cue,
            position,
        }),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use blood_covenant_core::{EnemyId, EnemyKind, PickupId, PlayerStats, PowerUpId};
    use glam::Vec3;

    use super::{CollisionView, EnemyAgent, EnemyPhase, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Captures the player's vitals, stats, and placement.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        let player = &world.player;
        PlayerSnapshot {
            position: player.position,
            facing: player.facing,
            health: player.health,
            max_health: player.max_health,
            stats: player.stats,
            invincible: player.invincible,
            dead: player.is_dead(),
        }
    }

    /// Captures a read-only view of every enemy the world still tracks.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView {
            snapshots: world.enemies.values().map(snapshot).collect(),
        }
    }

    /// Captures a single enemy, if the world still tracks it.
    #[must_use]
    pub fn enemy(world: &World, id: EnemyId) -> Option<EnemySnapshot> {
        world.enemies.get(&id).map(snapshot)
    }

    /// Number of enemies that can still act and be damaged.
    #[must_use]
    pub fn live_enemy_count(world: &World) -> usize {
        world
            .enemies
            .values()
            .filter(|agent| agent.is_live())
            .count()
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn projectile_count(world: &World) -> usize {
        world.projectiles.len()
    }

    /// Pickups lying in the world in identifier order.
    #[must_use]
    pub fn pickups(world: &World) -> Vec<PickupSnapshot> {
        world
            .pickups
            .iter()
            .map(|(id, pickup)| PickupSnapshot {
                id: *id,
                power_up: pickup.power_up,
                position: pickup.position,
            })
            .collect()
    }

    /// De-duplicated lore entries in the order they were first collected.
    #[must_use]
    pub fn collected_lore(world: &World) -> &[String] {
        &world.lore
    }

    /// Collision capability over the world's current bodies.
    #[must_use]
    pub fn collision(world: &World) -> CollisionView<'_> {
        CollisionView::new(world)
    }

    fn snapshot(agent: &EnemyAgent) -> EnemySnapshot {
        let (health, max_health) = agent.health();
        EnemySnapshot {
            id: agent.id,
            kind: agent.kind,
            position: agent.position,
            heading: agent.heading,
            health,
            max_health,
            phase: agent.phase(),
            crawling: agent.is_crawling(),
            speed: agent.velocity(),
        }
    }

    /// Read-only snapshot of the player.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PlayerSnapshot {
        /// Position of the player in world space.
        pub position: Vec3,
        /// Normalised forward direction.
        pub facing: Vec3,
        /// Current health.
        pub health: f32,
        /// Maximum health.
        pub max_health: f32,
        /// Stats currently in effect.
        pub stats: PlayerStats,
        /// Whether incoming damage is ignored.
        pub invincible: bool,
        /// Whether health reached zero.
        pub dead: bool,
    }

    /// Read-only snapshot describing every tracked enemy.
    #[derive(Clone, Debug)]
    pub struct EnemyView {
        snapshots: Vec<EnemySnapshot>,
    }

    impl EnemyView {
        /// Iterator over the captured snapshots in identifier order.
        pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        pub fn into_vec(self) -> Vec<EnemySnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single enemy.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct EnemySnapshot {
        /// Identifier of the enemy.
        pub id: EnemyId,
        /// Archetype the enemy was spawned as.
        pub kind: EnemyKind,
        /// Position of the enemy.
        pub position: Vec3,
        /// Yaw in radians, measured from +Z toward +X.
        pub heading: f32,
        /// Current health.
        pub health: f32,
        /// Health at spawn.
        pub max_health: f32,
        /// Behaviour phase.
        pub phase: EnemyPhase,
        /// Whether the enemy is still crawling.
        pub crawling: bool,
        /// Velocity magnitude during the last update, for animation speed.
        pub speed: f32,
    }

    impl EnemySnapshot {
        /// Whether the enemy can still act and be damaged.
        #[must_use]
        pub fn is_live(&self) -> bool {
            !matches!(self.phase, EnemyPhase::Dead | EnemyPhase::Inert)
        }
    }

    /// Read-only snapshot of a pickup.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PickupSnapshot {
        /// Identifier of the pickup.
        pub id: PickupId,
        /// Power-up the pickup grants.
        pub power_up: PowerUpId,
        /// Location of the pickup.
        pub position: Vec3,
    }
}
