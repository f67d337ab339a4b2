//! Read-only stat tables and tuning knobs consumed by the simulation.
//!
//! Everything here deserialises from JSON. Durations are written as
//! fractional seconds and converted to [`Duration`] at the boundary. Tuning
//! blocks default to the values the encounter shipped with, so a
//! configuration file only needs to list what it changes.

use std::collections::BTreeMap;
use std::time::Duration;

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{PlayerStats, PowerUpId};

/// Enemy archetypes that may appear in a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Shambling baseline enemy.
    Thrall,
    /// Fast, fragile shade.
    ShadowSpawn,
    /// Aggressive melee beast.
    FeralLycan,
    /// Armoured knight.
    CrimsonKnight,
    /// Durable caster.
    LichWarden,
    /// Pack hunter.
    Hellhound,
    /// Enemy that begins on the ground and may rise.
    Crawler,
    /// Wave boss.
    Boss,
}

bitflags! {
    /// Optional behaviours an enemy supports, resolved once at spawn.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EnemyCapabilities: u32 {
        /// Has a second attack variant.
        const SECOND_ATTACK = 1;
        /// Has a third attack variant.
        const THIRD_ATTACK = 1 << 1;
        /// Can play a stand-up transition out of crawling.
        const STAND_UP = 1 << 2;
        /// Screams periodically.
        const SCREAM = 1 << 3;
        /// Vocalises while idle.
        const IDLE_VOCAL = 1 << 4;
    }
}

/// Stat table entry describing one enemy archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyDefinition {
    /// Archetype the entry describes.
    pub kind: EnemyKind,
    /// Display name.
    pub name: String,
    /// Health at spawn.
    pub max_health: f32,
    /// Damage dealt to the player per successful attack.
    pub damage: f32,
    /// Travel speed in world units per second.
    pub move_speed: f32,
    /// Distance at which the enemy stops and attacks.
    pub attack_range: f32,
    /// Minimum time between two attacks.
    #[serde(with = "secs")]
    pub attack_cooldown: Duration,
    /// Whether the enemy enters the encounter crawling.
    pub starts_crawling: bool,
    /// Whether a crawling enemy may rise once damaged.
    pub can_stand_up: bool,
    /// Health fraction at or below which a crawling enemy rises.
    pub stand_up_health_threshold: f32,
    /// Base score awarded for the kill.
    pub score_value: u32,
    /// Probability that the kill drops a power-up.
    pub power_up_drop_chance: f32,
    /// Radius of the enemy's collision sphere.
    pub body_radius: f32,
    /// Optional behaviours the enemy supports.
    pub capabilities: EnemyCapabilities,
}

impl Default for EnemyDefinition {
    fn default() -> Self {
        Self {
            kind: EnemyKind::Thrall,
            name: String::from("Thrall"),
            max_health: 50.0,
            damage: 10.0,
            move_speed: 3.0,
            attack_range: 2.0,
            attack_cooldown: Duration::from_millis(1_500),
            starts_crawling: false,
            can_stand_up: false,
            stand_up_health_threshold: 0.5,
            score_value: 100,
            power_up_drop_chance: 0.1,
            body_radius: 0.5,
            capabilities: EnemyCapabilities::empty(),
        }
    }
}

/// Lookup table of enemy definitions keyed by archetype.
#[derive(Clone, Debug, Default)]
pub struct EnemyTable {
    definitions: BTreeMap<EnemyKind, EnemyDefinition>,
}

impl EnemyTable {
    /// Builds a table, rejecting archetypes defined more than once.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = EnemyDefinition>,
    ) -> Result<Self, ConfigError> {
        let mut table = BTreeMap::new();
        for definition in definitions {
            let kind = definition.kind;
            if table.insert(kind, definition).is_some() {
                return Err(ConfigError::DuplicateEnemy(kind));
            }
        }
        Ok(Self { definitions: table })
    }

    /// Definition of the provided archetype, if configured.
    #[must_use]
    pub fn get(&self, kind: EnemyKind) -> Option<&EnemyDefinition> {
        self.definitions.get(&kind)
    }

    /// Iterator over the definitions in archetype order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemyDefinition> {
        self.definitions.values()
    }
}

/// Power-up types a pickup may grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Invincibility for the duration.
    HolyWater,
    /// Damage multiplier with a health drain.
    BloodFrenzy,
    /// Lore collectible with no gameplay effect.
    LorePickup,
    /// Movement-speed multiplier.
    LunarEssence,
    /// Instant heal.
    HealthPack,
    /// Damage multiplier.
    DamageBoost,
    /// Movement-speed multiplier.
    SpeedBoost,
}

impl PowerUpKind {
    /// Whether the power-up applies once with no timed state.
    #[must_use]
    pub const fn is_instant(self) -> bool {
        matches!(self, Self::HealthPack)
    }

    /// Whether the pickup only carries lore.
    #[must_use]
    pub const fn is_lore(self) -> bool {
        matches!(self, Self::LorePickup)
    }

    /// Whether the power-up scales melee and ranged damage.
    #[must_use]
    pub const fn scales_damage(self) -> bool {
        matches!(self, Self::BloodFrenzy | Self::DamageBoost)
    }

    /// Whether the power-up scales movement speed.
    #[must_use]
    pub const fn scales_speed(self) -> bool {
        matches!(self, Self::LunarEssence | Self::SpeedBoost)
    }
}

/// Power-up table entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpDefinition {
    /// Identifier referenced by pickups.
    pub id: PowerUpId,
    /// Display name.
    pub name: String,
    /// Effect type.
    pub kind: PowerUpKind,
    /// Time the effect stays active.
    #[serde(with = "secs")]
    pub duration: Duration,
    /// Effect magnitude: a multiplier, or the heal amount for health packs.
    pub effect_value: f32,
    /// Lore text shown by lore pickups.
    pub lore_text: Option<String>,
    /// Audio cue played alongside lore text.
    pub lore_audio_cue: Option<String>,
}

impl Default for PowerUpDefinition {
    fn default() -> Self {
        Self {
            id: PowerUpId::new(0),
            name: String::new(),
            kind: PowerUpKind::HealthPack,
            duration: Duration::from_secs(10),
            effect_value: 2.0,
            lore_text: None,
            lore_audio_cue: None,
        }
    }
}

/// Lookup table of power-up definitions keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct PowerUpTable {
    definitions: BTreeMap<PowerUpId, PowerUpDefinition>,
}

impl PowerUpTable {
    /// Builds a table, rejecting identifiers defined more than once.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = PowerUpDefinition>,
    ) -> Result<Self, ConfigError> {
        let mut table = BTreeMap::new();
        for definition in definitions {
            let id = definition.id;
            if table.insert(id, definition).is_some() {
                return Err(ConfigError::DuplicatePowerUp(id));
            }
        }
        Ok(Self { definitions: table })
    }

    /// Definition with the provided identifier, if configured.
    #[must_use]
    pub fn get(&self, id: PowerUpId) -> Option<&PowerUpDefinition> {
        self.definitions.get(&id)
    }

    /// Identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = PowerUpId> + '_ {
        self.definitions.keys().copied()
    }

    /// Number of configured power-ups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Reports whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// One group of identical enemies inside a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Archetype to spawn.
    pub kind: EnemyKind,
    /// Number of enemies in the group.
    pub count: u32,
}

/// Ordered batch of spawn groups released together.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveDefinition {
    /// Display name.
    pub name: String,
    /// Groups spawned in order.
    pub groups: Vec<SpawnGroup>,
}

impl WaveDefinition {
    /// Creates a wave from its groups.
    #[must_use]
    pub fn new(name: impl Into<String>, groups: Vec<SpawnGroup>) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }

    /// Total number of enemies the wave spawns.
    #[must_use]
    pub fn total_enemies(&self) -> u32 {
        self.groups
            .iter()
            .fold(0u32, |total, group| total.saturating_add(group.count))
    }

    /// Archetypes in the exact order they spawn.
    pub fn spawn_order(&self) -> impl Iterator<Item = EnemyKind> + '_ {
        self.groups
            .iter()
            .flat_map(|group| std::iter::repeat(group.kind).take(group.count as usize))
    }
}

/// Wave scheduling and spawn placement parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterTuning {
    /// Delay between encounter start and the first wave.
    #[serde(with = "secs")]
    pub initial_delay: Duration,
    /// Delay between a wave completing and the next one starting.
    #[serde(with = "secs")]
    pub time_between_waves: Duration,
    /// Delay between two consecutive spawns of a wave.
    #[serde(with = "secs")]
    pub spawn_delay: Duration,
    /// Distance from the player used when no spawn points exist.
    pub min_spawn_distance: f32,
    /// Designated spawn points.
    pub spawn_points: Vec<Vec3>,
}

impl Default for EncounterTuning {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            time_between_waves: Duration::from_secs(5),
            spawn_delay: Duration::from_millis(500),
            min_spawn_distance: 10.0,
            spawn_points: Vec::new(),
        }
    }
}

/// Behaviour parameters shared by every enemy agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    /// Delay between death and removal from the live set.
    #[serde(with = "secs")]
    pub despawn_delay: Duration,
    /// Lower bound of the randomised scream interval.
    #[serde(with = "secs")]
    pub scream_interval_min: Duration,
    /// Upper bound of the randomised scream interval.
    #[serde(with = "secs")]
    pub scream_interval_max: Duration,
    /// Lower bound of the randomised idle vocalisation interval.
    #[serde(with = "secs")]
    pub idle_interval_min: Duration,
    /// Upper bound of the randomised idle vocalisation interval.
    #[serde(with = "secs")]
    pub idle_interval_max: Duration,
    /// Probability that an idle vocalisation plays when its timer fires.
    pub idle_chance: f32,
    /// Speed multiplier applied when a crawling enemy stands up.
    pub stand_up_speed_multiplier: f32,
    /// Rate of the facing slerp, per second.
    pub turn_rate: f32,
    /// Multiple of the attack range within which enemies face the player.
    pub facing_range_factor: f32,
    /// Multiple of the attack range at which locomotion stops short.
    pub stopping_distance_factor: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            despawn_delay: Duration::from_secs(2),
            scream_interval_min: Duration::from_secs(8),
            scream_interval_max: Duration::from_secs(15),
            idle_interval_min: Duration::from_secs(3),
            idle_interval_max: Duration::from_secs(8),
            idle_chance: 0.3,
            stand_up_speed_multiplier: 1.5,
            turn_rate: 10.0,
            facing_range_factor: 1.5,
            stopping_distance_factor: 0.8,
        }
    }
}

/// Player attack parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Radius of the melee strike volume.
    pub melee_radius: f32,
    /// Window after a hit during which the combo survives.
    #[serde(with = "secs")]
    pub combo_window: Duration,
    /// Damage bonus per combo step.
    pub combo_step: f32,
    /// Maximum distance of a hitscan shot.
    pub ranged_range: f32,
    /// Travel speed of thrown projectiles.
    pub projectile_speed: f32,
    /// Lifetime of thrown projectiles.
    #[serde(with = "secs")]
    pub projectile_lifetime: Duration,
    /// Damage of thrown projectiles.
    pub projectile_damage: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            melee_radius: 1.0,
            combo_window: Duration::from_secs(1),
            combo_step: 0.1,
            ranged_range: 50.0,
            projectile_speed: 20.0,
            projectile_lifetime: Duration::from_secs(5),
            projectile_damage: 20.0,
        }
    }
}

/// How stats are restored when a timed power-up expires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReversionPolicy {
    /// Recompute stats from baseline and every power-up still active.
    #[default]
    Rederive,
    /// Restore every stat to baseline, even ones another active power-up scales.
    ResetAll,
}

/// Power-up effect parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffTuning {
    /// Damage dealt to the player per drain pulse.
    pub drain_amount: f32,
    /// Time between two drain pulses.
    #[serde(with = "secs")]
    pub drain_interval: Duration,
    /// Stat restoration strategy on expiry.
    pub reversion: ReversionPolicy,
}

impl Default for BuffTuning {
    fn default() -> Self {
        Self {
            drain_amount: 1.0,
            drain_interval: Duration::from_millis(500),
            reversion: ReversionPolicy::Rederive,
        }
    }
}

/// Score multiplier parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTuning {
    /// Idle time after a kill before the multiplier starts decaying.
    #[serde(with = "secs")]
    pub multiplier_decay_time: Duration,
    /// Time between two multiplier decrements during decay.
    #[serde(with = "secs")]
    pub decay_step: Duration,
    /// Upper bound of the multiplier.
    pub max_multiplier: u32,
}

impl Default for ScoreTuning {
    fn default() -> Self {
        Self {
            multiplier_decay_time: Duration::from_secs(3),
            decay_step: Duration::from_millis(500),
            max_multiplier: 20,
        }
    }
}

/// Player vitals and baseline stats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Health at encounter start.
    pub max_health: f32,
    /// Baseline stats captured before any power-up applies.
    pub stats: PlayerStats,
    /// Radius of the player's collision sphere.
    pub body_radius: f32,
    /// Distance within which pickups are collected.
    pub pickup_radius: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            stats: PlayerStats::default(),
            body_radius: 0.5,
            pickup_radius: 1.0,
        }
    }
}

/// Loot placement parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootTuning {
    /// Height above the kill position at which pickups appear.
    pub spawn_height_offset: f32,
}

impl Default for LootTuning {
    fn default() -> Self {
        Self {
            spawn_height_offset: 1.0,
        }
    }
}

/// Complete configuration of an encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Global seed every random stream derives from.
    pub seed: u64,
    /// Length of one simulation tick.
    #[serde(with = "secs")]
    pub tick: Duration,
    /// Enemy stat table.
    pub enemies: Vec<EnemyDefinition>,
    /// Power-up table.
    pub power_ups: Vec<PowerUpDefinition>,
    /// Waves in the order they play.
    pub waves: Vec<WaveDefinition>,
    /// Wave scheduling parameters.
    pub encounter: EncounterTuning,
    /// Enemy behaviour parameters.
    pub enemy: EnemyTuning,
    /// Player attack parameters.
    pub combat: CombatTuning,
    /// Power-up effect parameters.
    pub buffs: BuffTuning,
    /// Score multiplier parameters.
    pub scoring: ScoreTuning,
    /// Player vitals and baseline stats.
    pub player: PlayerTuning,
    /// Loot placement parameters.
    pub loot: LootTuning,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_b100_d000_0001,
            tick: Duration::from_micros(16_667),
            enemies: Vec::new(),
            power_ups: Vec::new(),
            waves: Vec::new(),
            encounter: EncounterTuning::default(),
            enemy: EnemyTuning::default(),
            combat: CombatTuning::default(),
            buffs: BuffTuning::default(),
            scoring: ScoreTuning::default(),
            player: PlayerTuning::default(),
            loot: LootTuning::default(),
        }
    }
}

impl EncounterConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every invariant the simulation relies on.
    ///
    /// Waves may reference archetypes missing from the enemy table; such
    /// spawns are isolated at runtime rather than rejected here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.is_zero() {
            return Err(ConfigError::ZeroTick);
        }
        if self.scoring.max_multiplier == 0 {
            return Err(ConfigError::ZeroMultiplierCap);
        }

        let _ = EnemyTable::from_definitions(self.enemies.iter().cloned())?;
        let _ = PowerUpTable::from_definitions(self.power_ups.iter().cloned())?;

        for enemy in &self.enemies {
            non_negative("max_health", enemy.max_health)?;
            non_negative("damage", enemy.damage)?;
            non_negative("move_speed", enemy.move_speed)?;
            non_negative("attack_range", enemy.attack_range)?;
            non_negative("body_radius", enemy.body_radius)?;
            probability("stand_up_health_threshold", enemy.stand_up_health_threshold)?;
            probability("power_up_drop_chance", enemy.power_up_drop_chance)?;
        }
        for power_up in &self.power_ups {
            non_negative("effect_value", power_up.effect_value)?;
        }

        non_negative("min_spawn_distance", self.encounter.min_spawn_distance)?;
        probability("idle_chance", self.enemy.idle_chance)?;
        non_negative("stand_up_speed_multiplier", self.enemy.stand_up_speed_multiplier)?;
        interval(
            "scream_interval",
            self.enemy.scream_interval_min,
            self.enemy.scream_interval_max,
        )?;
        interval(
            "idle_interval",
            self.enemy.idle_interval_min,
            self.enemy.idle_interval_max,
        )?;

        non_negative("melee_radius", self.combat.melee_radius)?;
        non_negative("ranged_range", self.combat.ranged_range)?;
        non_negative("projectile_speed", self.combat.projectile_speed)?;
        non_negative("drain_amount", self.buffs.drain_amount)?;
        non_negative("player.max_health", self.player.max_health)?;
        non_negative("pickup_radius", self.player.pickup_radius)?;
        Ok(())
    }

    /// Builds the enemy lookup table.
    pub fn enemy_table(&self) -> Result<EnemyTable, ConfigError> {
        EnemyTable::from_definitions(self.enemies.iter().cloned())
    }

    /// Builds the power-up lookup table.
    pub fn power_up_table(&self) -> Result<PowerUpTable, ConfigError> {
        PowerUpTable::from_definitions(self.power_ups.iter().cloned())
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidStat { field, value })
    }
}

fn probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

fn interval(field: &'static str, min: Duration, max: Duration) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvertedRange {
            field,
            min: min.as_secs_f32(),
            max: max.as_secs_f32(),
        });
    }
    if max.is_zero() {
        return Err(ConfigError::ZeroInterval { field });
    }
    Ok(())
}

/// Reasons an encounter configuration is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON or does not match the schema.
    #[error("failed to parse encounter configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two enemy definitions share an archetype.
    #[error("enemy kind {0:?} is defined more than once")]
    DuplicateEnemy(EnemyKind),
    /// Two power-up definitions share an identifier.
    #[error("power-up {0:?} is defined more than once")]
    DuplicatePowerUp(PowerUpId),
    /// A stat is negative or not a number.
    #[error("{field} must be finite and non-negative, found {value}")]
    InvalidStat {
        /// Name of the offending field.
        field: &'static str,
        /// Value found in the configuration.
        value: f32,
    },
    /// A probability lies outside `[0, 1]`.
    #[error("{field} must lie within [0, 1], found {value}")]
    InvalidProbability {
        /// Name of the offending field.
        field: &'static str,
        /// Value found in the configuration.
        value: f32,
    },
    /// A randomised interval has its bounds swapped.
    #[error("{field} range is inverted: {min}s > {max}s")]
    InvertedRange {
        /// Name of the offending range.
        field: &'static str,
        /// Lower bound in seconds.
        min: f32,
        /// Upper bound in seconds.
        max: f32,
    },
    /// A recurring interval could only ever be zero.
    #[error("{field} must allow a non-zero interval")]
    ZeroInterval {
        /// Name of the offending range.
        field: &'static str,
    },
    /// The multiplier cap is zero.
    #[error("max_multiplier must be at least 1")]
    ZeroMultiplierCap,
    /// The tick length is zero.
    #[error("tick length must be non-zero")]
    ZeroTick,
}

/// Serde adapter storing [`Duration`] values as fractional seconds.
pub mod secs {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// Writes the duration as a floating-point number of seconds.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    /// Reads a non-negative floating-point number of seconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(D::Error::custom(format!(
                "expected a non-negative number of seconds, found {seconds}"
            )));
        }
        Duration::try_from_secs_f64(seconds).map_err(D::Error::custom)
    }
}
