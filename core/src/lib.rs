#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Blood Covenant encounter simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! Static stat tables and tuning live in [`config`], the cancellable timer
//! queue used by every timed behaviour lives in [`timer`], and the seams to
//! excluded collaborators (movement, collision, loot, persistence) live in
//! [`capability`].

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub mod capability;
pub mod config;
pub mod timer;

pub use capability::{
    Collider, ColliderOwner, CollisionQuery, HighScoreError, HighScoreStore, Layers, Locomotion,
    LootDrop, LootDropper, RayHit,
};
pub use config::{
    BuffTuning, CombatTuning, ConfigError, EncounterConfig, EncounterTuning, EnemyCapabilities,
    EnemyDefinition, EnemyKind, EnemyTable, EnemyTuning, LootTuning, PlayerTuning,
    PowerUpDefinition, PowerUpKind, PowerUpTable, ReversionPolicy, ScoreTuning, SpawnGroup,
    WaveDefinition,
};
pub use timer::{Due, TimerToken, Timers};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "The Blood Covenant awaits.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Moves the player to a new position with a new facing direction.
    MovePlayer {
        /// Position of the player in world space.
        position: Vec3,
        /// Forward direction of the player on the ground plane.
        facing: Vec3,
    },
    /// Requests that an enemy of the provided kind enters the encounter.
    SpawnEnemy {
        /// Stat table entry the enemy is created from.
        kind: EnemyKind,
        /// Location at which the enemy appears.
        position: Vec3,
    },
    /// Applies damage to a single enemy.
    DamageEnemy {
        /// Identifier of the enemy receiving the damage.
        enemy: EnemyId,
        /// Amount of health removed before clamping.
        amount: f32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Applies damage to the player.
    DamagePlayer {
        /// Amount of health removed before clamping.
        amount: f32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Restores player health up to the configured maximum.
    HealPlayer {
        /// Amount of health restored before clamping.
        amount: f32,
    },
    /// Replaces the player's current movement and damage stats.
    SetPlayerStats {
        /// Stats that become active immediately.
        stats: PlayerStats,
    },
    /// Toggles whether the player ignores incoming damage.
    SetPlayerInvincible {
        /// Whether damage should be ignored.
        invincible: bool,
    },
    /// Launches an independently moving projectile.
    SpawnProjectile {
        /// Point the projectile starts travelling from.
        origin: Vec3,
        /// Direction of travel; normalised by the world.
        direction: Vec3,
        /// Constant travel speed in world units per second.
        speed: f32,
        /// Time after which the projectile expires.
        lifetime: Duration,
        /// Damage applied to the first live enemy the projectile touches.
        damage: f32,
    },
    /// Places a collectible power-up into the world.
    SpawnPickup {
        /// Power-up granted when the pickup is collected.
        power_up: PowerUpId,
        /// Location of the pickup.
        position: Vec3,
    },
    /// Places a static obstacle that blocks rays and projectiles.
    PlaceObstacle {
        /// Centre of the spherical obstacle.
        center: Vec3,
        /// Radius of the obstacle.
        radius: f32,
    },
    /// Hands lore text to the lore display collaborator.
    ShowLore {
        /// Text of the lore entry.
        text: String,
        /// Optional audio cue played alongside the text.
        audio_cue: Option<String>,
    },
    /// Forwards a fire-and-forget presentation cue.
    PlayCue {
        /// Entity the cue is attached to.
        source: CueSource,
        /// Symbolic cue to play.
        cue: Cue,
        /// World position of the cue.
        position: Vec3,
    },
}

/// Events broadcast by the world and systems after processing commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an enemy entered the encounter.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Stat table entry the enemy was created from.
        kind: EnemyKind,
        /// Location at which the enemy appeared.
        position: Vec3,
    },
    /// Reports that a spawn request could not produce a functioning enemy.
    EnemySpawnRejected {
        /// Kind requested by the spawn command.
        kind: EnemyKind,
        /// Identifier of the inert agent left in place of the enemy.
        enemy: EnemyId,
    },
    /// Confirms that an enemy lost health.
    EnemyDamaged {
        /// Identifier of the damaged enemy.
        enemy: EnemyId,
        /// Health removed by the hit.
        amount: f32,
        /// Health remaining after clamping.
        remaining: f32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Announces that a crawling enemy rose to its feet.
    EnemyStoodUp {
        /// Identifier of the enemy.
        enemy: EnemyId,
    },
    /// Announces that an enemy struck the player.
    EnemyAttacked {
        /// Identifier of the attacking enemy.
        enemy: EnemyId,
        /// Attack variant selected for the strike.
        variant: AttackVariant,
        /// Damage the attack carried.
        damage: f32,
    },
    /// Announces that an enemy died. Emitted exactly once per enemy.
    EnemyDied {
        /// Identifier of the enemy.
        enemy: EnemyId,
        /// Stat table entry the enemy was created from.
        kind: EnemyKind,
        /// Location of the enemy at the moment of death.
        position: Vec3,
        /// Base score awarded for the kill.
        score_value: u32,
        /// Probability that the kill drops a power-up.
        drop_chance: f32,
    },
    /// Confirms that a dead enemy was removed from the live set.
    EnemyDespawned {
        /// Identifier of the removed enemy.
        enemy: EnemyId,
    },
    /// Confirms that the player lost health.
    PlayerDamaged {
        /// Health removed by the hit.
        amount: f32,
        /// Health remaining after clamping.
        health: f32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Confirms that the player regained health.
    PlayerHealed {
        /// Health restored after clamping.
        amount: f32,
        /// Health after the heal.
        health: f32,
    },
    /// Announces that the player's health reached zero.
    PlayerDied,
    /// Confirms that the player's stats changed.
    PlayerStatsChanged {
        /// Stats now in effect.
        stats: PlayerStats,
    },
    /// Confirms that the player's invincibility toggled.
    InvincibilityChanged {
        /// Whether damage is now ignored.
        invincible: bool,
    },
    /// Confirms that a projectile was launched.
    ProjectileSpawned {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
    },
    /// Reports that a projectile touched something and was removed.
    ProjectileImpact {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// What the projectile touched.
        target: ColliderOwner,
        /// Location of the impact.
        position: Vec3,
    },
    /// Reports that a projectile outlived its lifetime without touching anything.
    ProjectileExpired {
        /// Identifier of the projectile.
        projectile: ProjectileId,
    },
    /// Confirms that a pickup was placed into the world.
    PickupSpawned {
        /// Identifier assigned to the pickup.
        pickup: PickupId,
        /// Power-up the pickup grants.
        power_up: PowerUpId,
        /// Location of the pickup.
        position: Vec3,
    },
    /// Reports that the player collected a pickup.
    PickupCollected {
        /// Identifier of the collected pickup.
        pickup: PickupId,
        /// Power-up the pickup grants.
        power_up: PowerUpId,
    },
    /// Reports that lore text should be displayed.
    LoreDisplayed {
        /// Text of the lore entry.
        text: String,
        /// Optional audio cue played alongside the text.
        audio_cue: Option<String>,
        /// Whether the entry was collected for the first time.
        first_time: bool,
    },
    /// Fire-and-forget presentation cue for animation, audio, or particles.
    Cue {
        /// Entity the cue is attached to.
        source: CueSource,
        /// Symbolic cue to play.
        cue: Cue,
        /// World position of the cue.
        position: Vec3,
    },
    /// Announces that a wave began spawning.
    WaveStarted {
        /// Wave that started.
        wave: WaveIndex,
    },
    /// Announces that every enemy of a wave died.
    WaveCompleted {
        /// Wave that completed.
        wave: WaveIndex,
    },
    /// Announces that no waves remain.
    AllWavesComplete,
    /// Announces that a power-up took effect.
    BuffApplied {
        /// Power-up type that took effect.
        kind: PowerUpKind,
        /// Time until the effect reverts; `None` for instant effects.
        duration: Option<Duration>,
    },
    /// Announces that a timed power-up reverted.
    BuffExpired {
        /// Power-up type that reverted.
        kind: PowerUpKind,
    },
    /// Announces that the cumulative score changed.
    ScoreChanged {
        /// Score after the change.
        score: u64,
        /// Points awarded by the change.
        awarded: u64,
    },
    /// Announces that the score multiplier changed.
    MultiplierChanged {
        /// Multiplier after the change.
        multiplier: u32,
    },
}

/// Player input distilled by the input adapter for the combat resolver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Melee strike landing at the provided origin.
    MeleeStrike {
        /// Centre of the strike volume.
        origin: Vec3,
    },
    /// Hitscan shot fired from the provided origin.
    Shoot {
        /// Muzzle position.
        origin: Vec3,
        /// Forward direction of the muzzle.
        direction: Vec3,
    },
    /// Thrown projectile launched from the provided origin.
    Throw {
        /// Launch position.
        origin: Vec3,
        /// Direction of travel.
        direction: Vec3,
    },
}

/// Describes where a hit originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageSource {
    /// Player melee strike.
    Melee,
    /// Player hitscan shot.
    Ranged,
    /// Player projectile.
    Projectile(ProjectileId),
    /// Enemy attack.
    Enemy(EnemyId),
    /// Self-inflicted damage from a draining buff.
    Drain,
}

/// Attack animations an enemy may play when striking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackVariant {
    /// Attack every enemy supports.
    Primary,
    /// Second attack, available when the enemy declares it.
    Secondary,
    /// Third attack, available when the enemy declares it.
    Tertiary,
}

impl AttackVariant {
    /// Presentation cue associated with the variant.
    #[must_use]
    pub const fn cue(self) -> Cue {
        match self {
            Self::Primary => Cue::Attack,
            Self::Secondary => Cue::Attack2,
            Self::Tertiary => Cue::Attack3,
        }
    }
}

/// Symbolic presentation cues; adapters map them to animations and sounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    /// Primary enemy attack.
    Attack,
    /// Secondary enemy attack.
    Attack2,
    /// Tertiary enemy attack.
    Attack3,
    /// Enemy flinch after taking damage.
    Hit,
    /// Enemy death.
    Die,
    /// Crawling enemy rising.
    StandUp,
    /// Enemy scream.
    Scream,
    /// Enemy idle vocalisation.
    Idle,
    /// Melee strike connected.
    MeleeHit,
    /// Melee strike hit nothing.
    MeleeMiss,
    /// Ranged weapon fired.
    Shoot,
    /// Muzzle flash particle.
    MuzzleFlash,
    /// Impact particle at a ray or projectile hit.
    HitEffect,
    /// Player took damage.
    PlayerHurt,
    /// Player died.
    PlayerDeath,
    /// Pickup collected.
    Pickup,
}

impl Cue {
    /// Stable symbolic name of the cue.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Attack2 => "attack2",
            Self::Attack3 => "attack3",
            Self::Hit => "hit",
            Self::Die => "die",
            Self::StandUp => "stand_up",
            Self::Scream => "scream",
            Self::Idle => "idle",
            Self::MeleeHit => "melee_hit",
            Self::MeleeMiss => "melee_miss",
            Self::Shoot => "shoot",
            Self::MuzzleFlash => "muzzle_flash",
            Self::HitEffect => "hit_effect",
            Self::PlayerHurt => "player_hurt",
            Self::PlayerDeath => "player_death",
            Self::Pickup => "pickup",
        }
    }
}

/// Entity a presentation cue is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueSource {
    /// The player character.
    Player,
    /// A specific enemy.
    Enemy(EnemyId),
    /// A specific projectile.
    Projectile(ProjectileId),
    /// A location in the world with no owning entity.
    World,
}

/// Movement and damage stats of the player that buffs may scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Walking speed in world units per second.
    pub walk_speed: f32,
    /// Running speed in world units per second.
    pub run_speed: f32,
    /// Base damage of a melee strike before combo scaling.
    pub melee_damage: f32,
    /// Damage of a hitscan shot.
    pub ranged_damage: f32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            walk_speed: 2.0,
            run_speed: 5.0,
            melee_damage: 25.0,
            ranged_damage: 20.0,
        }
    }
}

impl PlayerStats {
    /// Returns a copy with both movement speeds scaled by `factor`.
    #[must_use]
    pub fn with_speed_scaled(self, factor: f32) -> Self {
        Self {
            walk_speed: self.walk_speed * factor,
            run_speed: self.run_speed * factor,
            ..self
        }
    }

    /// Returns a copy with melee and ranged damage scaled by `factor`.
    #[must_use]
    pub fn with_damage_scaled(self, factor: f32) -> Self {
        Self {
            melee_damage: self.melee_damage * factor,
            ranged_damage: self.ranged_damage * factor,
            ..self
        }
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a pickup lying in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickupId(u32);

impl PickupId {
    /// Creates a new pickup identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a static obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u32);

impl ObstacleId {
    /// Creates a new obstacle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a power-up definition in the power-up table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PowerUpId(u32);

impl PowerUpId {
    /// Creates a new power-up identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Zero-based position of a wave within the encounter's wave list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveIndex(u32);

impl WaveIndex {
    /// Creates a new wave index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the zero-based index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// One-based wave number shown to players.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.0 + 1
    }

    /// Index of the wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Distance between two points projected onto the ground plane.
#[must_use]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let delta = b - a;
    (delta.x * delta.x + delta.z * delta.z).sqrt()
}

/// Yaw angle, in radians, of a ground-plane direction measured from +Z toward +X.
///
/// Returns `None` when the direction has no horizontal component.
#[must_use]
pub fn yaw_of(direction: Vec3) -> Option<f32> {
    if direction.x.abs() <= f32::EPSILON && direction.z.abs() <= f32::EPSILON {
        return None;
    }
    Some(direction.x.atan2(direction.z))
}
