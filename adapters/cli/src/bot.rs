//! Scripted stand-in for player input.

use std::time::Duration;

use blood_covenant_core::{planar_distance, Command, PlayerAction};
use blood_covenant_world::{query, World};
use glam::Vec3;

/// Distance from the player within which a pickup is worth walking to.
const PICKUP_LURE: f32 = 4.0;

/// Holds position, strikes whatever is in reach, shoots everything else, and
/// steps onto nearby pickups while nothing threatens it.
#[derive(Debug)]
pub(crate) struct Bot {
    melee_radius: f32,
    attack_interval: Duration,
    cooldown: Duration,
}

/// What the bot wants to do this frame.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Intent {
    pub(crate) movement: Option<Command>,
    pub(crate) actions: Vec<PlayerAction>,
}

impl Bot {
    pub(crate) fn new(melee_radius: f32, attack_interval: Duration) -> Self {
        Self {
            melee_radius,
            attack_interval,
            cooldown: Duration::ZERO,
        }
    }

    pub(crate) fn decide(&mut self, world: &World, dt: Duration) -> Intent {
        self.cooldown = self.cooldown.saturating_sub(dt);
        let player = query::player(world);
        if player.dead {
            return Intent::default();
        }

        let nearest = query::enemy_view(world)
            .iter()
            .filter(|enemy| enemy.is_live())
            .map(|enemy| enemy.position)
            .min_by(|a, b| {
                planar_distance(*a, player.position)
                    .total_cmp(&planar_distance(*b, player.position))
            });

        let mut intent = Intent::default();
        let reach = self.melee_radius * 2.0;
        match nearest {
            Some(target) if planar_distance(target, player.position) <= reach => {
                if self.ready() {
                    let toward = (target - player.position).normalize_or_zero();
                    intent.actions.push(PlayerAction::MeleeStrike {
                        origin: player.position + toward * self.melee_radius,
                    });
                }
            }
            Some(target) => {
                if self.ready() {
                    intent.actions.push(PlayerAction::Shoot {
                        origin: player.position,
                        direction: (target - player.position).normalize_or_zero(),
                    });
                }
            }
            None => {
                intent.movement = query::pickups(world)
                    .into_iter()
                    .map(|pickup| pickup.position)
                    .filter(|position| planar_distance(*position, player.position) <= PICKUP_LURE)
                    .min_by(|a, b| {
                        planar_distance(*a, player.position)
                            .total_cmp(&planar_distance(*b, player.position))
                    })
                    .map(|position| Command::MovePlayer {
                        position: Vec3::new(position.x, player.position.y, position.z),
                        facing: player.facing,
                    });
            }
        }
        intent
    }

    fn ready(&mut self) -> bool {
        if !self.cooldown.is_zero() {
            return false;
        }
        self.cooldown = self.attack_interval;
        true
    }
}
