//! Seams to the collaborators the encounter core never implements itself.
//!
//! Movement, collision, loot, and persistence are consumed through the traits
//! in this module. The world and systems ship straightforward default
//! implementations, but nothing in the core depends on their internals.

use std::fmt;
use std::time::Duration;

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{EnemyId, ObstacleId, PowerUpId};

/// Per-agent movement capability: "move toward a point, report velocity".
pub trait Locomotion: fmt::Debug {
    /// Requests that the agent travels toward `point`.
    fn set_destination(&mut self, point: Vec3);

    /// Magnitude of the agent's velocity during the last advance.
    fn velocity_magnitude(&self) -> f32;

    /// Replaces the agent's maximum travel speed.
    fn set_speed(&mut self, speed: f32);

    /// Current maximum travel speed.
    fn speed(&self) -> f32;

    /// Enables or disables movement entirely.
    fn set_enabled(&mut self, enabled: bool);

    /// Integrates movement for `dt`, returning the agent's new position.
    fn advance(&mut self, position: Vec3, dt: Duration) -> Vec3;
}

bitflags! {
    /// Collision categories used to filter overlap and ray queries.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Layers: u32 {
        /// The player character.
        const PLAYER = 1;
        /// Enemy agents.
        const ENEMY = 1 << 1;
        /// Static level geometry.
        const ENVIRONMENT = 1 << 2;
    }
}

/// Object that owns a collision shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderOwner {
    /// The player character.
    Player,
    /// An enemy agent, flagged when it already died but was not yet removed.
    Enemy {
        /// Identifier of the enemy.
        id: EnemyId,
        /// Whether the enemy already entered its dead state.
        dead: bool,
    },
    /// A static obstacle.
    Obstacle(ObstacleId),
}

impl ColliderOwner {
    /// Enemy identifier when the owner is a live enemy.
    #[must_use]
    pub const fn live_enemy(&self) -> Option<EnemyId> {
        match self {
            Self::Enemy { id, dead: false } => Some(*id),
            _ => None,
        }
    }
}

/// Spherical collision shape returned by overlap queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    /// Object that owns the shape.
    pub owner: ColliderOwner,
    /// Centre of the sphere.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
}

/// Intersection reported by a ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Object the ray touched.
    pub owner: ColliderOwner,
    /// Point of intersection.
    pub point: Vec3,
    /// Distance from the ray origin to the intersection.
    pub distance: f32,
    /// Surface normal at the intersection.
    pub normal: Vec3,
}

/// Physics capability: overlap and ray queries against collision shapes.
pub trait CollisionQuery {
    /// Collects every shape on `layers` that overlaps the sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: Layers, out: &mut Vec<Collider>);

    /// Collects every shape on `layers` the ray touches, nearest first.
    fn raycast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: Layers,
        out: &mut Vec<RayHit>,
    );
}

/// Pickup a loot roll decided to drop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LootDrop {
    /// Power-up the pickup grants.
    pub power_up: PowerUpId,
    /// Location of the pickup.
    pub position: Vec3,
}

/// Loot capability: probabilistic drops, at most one per call.
pub trait LootDropper {
    /// Rolls against `drop_chance` and returns the drop, if any.
    fn try_spawn_drop(&mut self, position: Vec3, drop_chance: f32) -> Option<LootDrop>;
}

/// Failure reported by a high-score store.
#[derive(Debug, thiserror::Error)]
pub enum HighScoreError {
    /// The backing storage could not be read or written.
    #[error("high score storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence capability for the high-score value.
pub trait HighScoreStore {
    /// Reads the stored high score.
    fn load(&self) -> Result<u64, HighScoreError>;

    /// Replaces the stored high score.
    fn store(&mut self, value: u64) -> Result<(), HighScoreError>;
}
