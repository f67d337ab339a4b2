//! Straight-line steering used when no navigation backend is plugged in.

use std::time::Duration;

use blood_covenant_core::{EnemyDefinition, EnemyTuning, Locomotion};
use glam::Vec3;

/// Builds the locomotion capability of a freshly spawned enemy.
pub type LocomotionFactory = Box<dyn Fn(&EnemyDefinition, &EnemyTuning) -> Box<dyn Locomotion>>;

/// Creates the default steering capability for an enemy definition.
#[must_use]
pub fn steering_for(definition: &EnemyDefinition, tuning: &EnemyTuning) -> Box<dyn Locomotion> {
    Box::new(SteeringLocomotion::new(
        definition.move_speed,
        definition.attack_range * tuning.stopping_distance_factor,
    ))
}

/// Moves on the ground plane directly toward the destination and stops short
/// of it by a fixed distance.
#[derive(Clone, Debug)]
pub struct SteeringLocomotion {
    destination: Option<Vec3>,
    speed: f32,
    stopping_distance: f32,
    enabled: bool,
    velocity: f32,
}

impl SteeringLocomotion {
    /// Creates a steering capability with the provided speed and stopping distance.
    #[must_use]
    pub fn new(speed: f32, stopping_distance: f32) -> Self {
        Self {
            destination: None,
            speed,
            stopping_distance: stopping_distance.max(0.0),
            enabled: true,
            velocity: 0.0,
        }
    }

    /// Distance from the destination at which movement stops.
    #[must_use]
    pub const fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }
}

impl Locomotion for SteeringLocomotion {
    fn set_destination(&mut self, point: Vec3) {
        self.destination = Some(point);
    }

    fn velocity_magnitude(&self) -> f32 {
        self.velocity
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.velocity = 0.0;
        }
    }

    fn advance(&mut self, position: Vec3, dt: Duration) -> Vec3 {
        self.velocity = 0.0;
        let seconds = dt.as_secs_f32();
        let Some(destination) = self.destination else {
            return position;
        };
        if !self.enabled || seconds <= 0.0 {
            return position;
        }

        let mut offset = destination - position;
        offset.y = 0.0;
        let distance = offset.length();
        if distance <= self.stopping_distance {
            return position;
        }

        let step = (self.speed * seconds).min(distance - self.stopping_distance);
        self.velocity = step / seconds;
        position + offset / distance * step
    }
}
