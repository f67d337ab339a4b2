//! Sphere-based collision queries over the world's bodies.

use blood_covenant_core::{
    planar_distance, Collider, ColliderOwner, CollisionQuery, Layers, RayHit,
};
use glam::Vec3;

use crate::World;

/// Read-only collision view over the player, enemies, and obstacles.
#[derive(Clone, Copy, Debug)]
pub struct CollisionView<'a> {
    world: &'a World,
}

impl<'a> CollisionView<'a> {
    pub(crate) const fn new(world: &'a World) -> Self {
        Self { world }
    }

    fn colliders(&self, layers: Layers) -> impl Iterator<Item = Collider> + 'a {
        let world = self.world;
        let player = layers.contains(Layers::PLAYER).then(|| Collider {
            owner: ColliderOwner::Player,
            center: world.player.position,
            radius: world.player.body_radius,
        });
        let enemies = world
            .enemies
            .values()
            .filter(move |_| layers.contains(Layers::ENEMY))
            .map(|agent| Collider {
                owner: ColliderOwner::Enemy {
                    id: agent.id,
                    dead: !agent.is_live(),
                },
                center: agent.position,
                radius: agent.body_radius(),
            });
        let obstacles = world
            .obstacles
            .iter()
            .filter(move |_| layers.contains(Layers::ENVIRONMENT))
            .map(|(id, obstacle)| Collider {
                owner: ColliderOwner::Obstacle(*id),
                center: obstacle.center,
                radius: obstacle.radius,
            });
        player.into_iter().chain(enemies).chain(obstacles)
    }
}

impl CollisionQuery for CollisionView<'_> {
    /// Overlap is tested on the ground plane, so bodies at any height count.
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: Layers, out: &mut Vec<Collider>) {
        out.extend(self.colliders(layers).filter(|collider| {
            planar_distance(collider.center, center) <= radius + collider.radius
        }));
    }

    fn raycast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: Layers,
        out: &mut Vec<RayHit>,
    ) {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }

        let start = out.len();
        for collider in self.colliders(layers) {
            let Some(distance) = ray_sphere(origin, direction, collider.center, collider.radius)
            else {
                continue;
            };
            if distance > max_distance {
                continue;
            }
            let point = origin + direction * distance;
            out.push(RayHit {
                owner: collider.owner,
                point,
                distance,
                normal: (point - collider.center).normalize_or_zero(),
            });
        }
        out[start..].sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }
}

/// Distance along a normalised ray to the first contact with a sphere.
///
/// A ray starting inside the sphere reports a contact at distance zero.
fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let offset = origin - center;
    let b = offset.dot(direction);
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    Some((-b - discriminant.sqrt()).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apply, query, WorldSettings};
    use blood_covenant_core::{Command, EnemyDefinition, EnemyKind, EnemyTable};

    fn world_with_thralls(positions: &[Vec3]) -> World {
        let enemies = EnemyTable::from_definitions([EnemyDefinition::default()])
            .expect("unique kinds");
        let mut world = World::new(
            WorldSettings {
                enemies,
                ..WorldSettings::default()
            },
            1,
        );
        let mut events = Vec::new();
        for position in positions {
            apply(
                &mut world,
                Command::SpawnEnemy {
                    kind: EnemyKind::Thrall,
                    position: *position,
                },
                &mut events,
            );
        }
        world
    }

    #[test]
    fn overlap_ignores_height() {
        let world = world_with_thralls(&[Vec3::new(0.0, 3.0, 1.2), Vec3::new(0.0, 0.0, 2.0)]);
        let mut hits = Vec::new();

        query::collision(&world).overlap_sphere(Vec3::ZERO, 1.0, Layers::ENEMY, &mut hits);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].center, Vec3::new(0.0, 3.0, 1.2));
    }

    #[test]
    fn ray_reports_near_surface() {
        let distance = ray_sphere(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, 5.0), 1.0)
            .expect("ray hits sphere");
        assert!((distance - 4.0).abs() < 1e-5);
    }

    #[test]
    fn ray_misses_spheres_behind_or_beside_it() {
        assert!(ray_sphere(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, -5.0), 1.0).is_none());
        assert!(ray_sphere(Vec3::ZERO, Vec3::Z, Vec3::new(3.0, 0.0, 5.0), 1.0).is_none());
    }

    #[test]
    fn ray_inside_sphere_touches_immediately() {
        assert_eq!(ray_sphere(Vec3::ZERO, Vec3::X, Vec3::ZERO, 0.5), Some(0.0));
    }
}
