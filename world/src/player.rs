//! Player vitals and stats owned by the world.

use blood_covenant_core::{Cue, CueSource, DamageSource, Event, PlayerStats, PlayerTuning};
use glam::Vec3;

#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) position: Vec3,
    pub(crate) facing: Vec3,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) stats: PlayerStats,
    pub(crate) invincible: bool,
    pub(crate) body_radius: f32,
    pub(crate) pickup_radius: f32,
}

impl Player {
    pub(crate) fn new(tuning: &PlayerTuning) -> Self {
        Self {
            position: Vec3::ZERO,
            facing: Vec3::Z,
            health: tuning.max_health,
            max_health: tuning.max_health,
            stats: tuning.stats,
            invincible: false,
            body_radius: tuning.body_radius,
            pickup_radius: tuning.pickup_radius,
        }
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub(crate) fn take_damage(
        &mut self,
        amount: f32,
        source: DamageSource,
        out_events: &mut Vec<Event>,
    ) {
        if self.is_dead() {
            tracing::trace!(?source, "damage ignored by dead player");
            return;
        }
        if self.invincible {
            tracing::trace!(?source, "damage ignored by invincible player");
            return;
        }

        let before = self.health;
        self.health = (before - amount.max(0.0)).max(0.0);
        out_events.push(Event::PlayerDamaged {
            amount: before - self.health,
            health: self.health,
            source,
        });

        if self.is_dead() {
            tracing::info!("player died");
            out_events.push(Event::Cue {
                source: CueSource::Player,
                cue: Cue::PlayerDeath,
                position: self.position,
            });
            out_events.push(Event::PlayerDied);
        } else {
            out_events.push(Event::Cue {
                source: CueSource::Player,
                cue: Cue::PlayerHurt,
                position: self.position,
            });
        }
    }

    pub(crate) fn heal(&mut self, amount: f32, out_events: &mut Vec<Event>) {
        if self.is_dead() {
            return;
        }
        let before = self.health;
        self.health = (before + amount.max(0.0)).min(self.max_health);
        out_events.push(Event::PlayerHealed {
            amount: self.health - before,
            health: self.health,
        });
    }
}
