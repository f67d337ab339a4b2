//! Thrown projectiles travelling through the world.

use std::time::Duration;

use blood_covenant_core::{
    CollisionQuery, Cue, CueSource, DamageSource, Event, Layers, ProjectileId, RayHit,
};
use glam::Vec3;

use crate::{collision::CollisionView, World};

#[derive(Clone, Copy, Debug)]
pub(crate) struct Projectile {
    pub(crate) position: Vec3,
    pub(crate) direction: Vec3,
    pub(crate) speed: f32,
    pub(crate) remaining: Duration,
    pub(crate) damage: f32,
}

impl Projectile {
    /// Distance covered during `dt` and whether the lifetime runs out within it.
    fn travel(&self, dt: Duration) -> (f32, bool) {
        let span = dt.min(self.remaining);
        (self.speed * span.as_secs_f32(), dt >= self.remaining)
    }
}

impl World {
    /// Sweeps every projectile along its path for `dt`, resolving the first contact.
    pub(crate) fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let ids: Vec<ProjectileId> = self.projectiles.keys().copied().collect();
        let mut hits: Vec<RayHit> = Vec::new();

        for id in ids {
            let Some(projectile) = self.projectiles.get(&id).copied() else {
                continue;
            };
            let (distance, expires) = projectile.travel(dt);

            hits.clear();
            CollisionView::new(self).raycast_all(
                projectile.position,
                projectile.direction,
                distance,
                Layers::ENEMY | Layers::ENVIRONMENT,
                &mut hits,
            );

            if let Some(hit) = hits.first().copied() {
                let _ = self.projectiles.remove(&id);
                out_events.push(Event::Cue {
                    source: CueSource::Projectile(id),
                    cue: Cue::HitEffect,
                    position: hit.point,
                });
                out_events.push(Event::ProjectileImpact {
                    projectile: id,
                    target: hit.owner,
                    position: hit.point,
                });
                if let Some(enemy) = hit.owner.live_enemy() {
                    self.damage_enemy(
                        enemy,
                        projectile.damage,
                        DamageSource::Projectile(id),
                        out_events,
                    );
                }
                continue;
            }

            if expires {
                let _ = self.projectiles.remove(&id);
                out_events.push(Event::ProjectileExpired { projectile: id });
                continue;
            }

            if let Some(entry) = self.projectiles.get_mut(&id) {
                entry.position += entry.direction * distance;
                entry.remaining = entry.remaining.saturating_sub(dt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_is_clipped_to_remaining_lifetime() {
        let projectile = Projectile {
            position: Vec3::ZERO,
            direction: Vec3::Z,
            speed: 20.0,
            remaining: Duration::from_millis(250),
            damage: 20.0,
        };

        let (distance, expires) = projectile.travel(Duration::from_secs(1));
        assert!((distance - 5.0).abs() < 1e-5);
        assert!(expires);

        let (distance, expires) = projectile.travel(Duration::from_millis(100));
        assert!((distance - 2.0).abs() < 1e-5);
        assert!(!expires);
    }
}
