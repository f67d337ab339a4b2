#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Probabilistic power-up drops from slain enemies.

use blood_covenant_core::{
    Command, Event, LootDrop, LootDropper, LootTuning, PowerUpId, PowerUpTable,
};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the dropper.
#[derive(Clone, Debug)]
pub struct Config {
    power_ups: Vec<PowerUpId>,
    tuning: LootTuning,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration drawing from every power-up in `table`.
    #[must_use]
    pub fn new(table: &PowerUpTable, tuning: LootTuning, rng_seed: u64) -> Self {
        Self {
            power_ups: table.ids().collect(),
            tuning,
            rng_seed,
        }
    }
}

/// Default loot capability: one roll per kill, uniform choice of power-up.
#[derive(Debug)]
pub struct PowerUpDropper {
    power_ups: Vec<PowerUpId>,
    tuning: LootTuning,
    rng: ChaCha8Rng,
}

impl PowerUpDropper {
    /// Creates a dropper with its own deterministic random stream.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            power_ups: config.power_ups,
            tuning: config.tuning,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Rolls for every death in the batch and requests the resulting pickups.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            let Event::EnemyDied {
                enemy,
                position,
                drop_chance,
                ..
            } = event
            else {
                continue;
            };
            if let Some(drop) = self.try_spawn_drop(*position, *drop_chance) {
                tracing::debug!(
                    enemy = enemy.get(),
                    power_up = drop.power_up.get(),
                    "loot dropped"
                );
                out.push(Command::SpawnPickup {
                    power_up: drop.power_up,
                    position: drop.position,
                });
            }
        }
    }
}

impl LootDropper for PowerUpDropper {
    fn try_spawn_drop(&mut self, position: Vec3, drop_chance: f32) -> Option<LootDrop> {
        if self.power_ups.is_empty() {
            return None;
        }
        let roll: f32 = self.rng.gen();
        if roll >= drop_chance {
            return None;
        }
        let power_up = self.power_ups[self.rng.gen_range(0..self.power_ups.len())];
        Some(LootDrop {
            power_up,
            position: position + Vec3::Y * self.tuning.spawn_height_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blood_covenant_core::{EnemyId, EnemyKind, PowerUpDefinition, PowerUpKind};
    use std::time::Duration;

    fn table(count: u32) -> PowerUpTable {
        PowerUpTable::from_definitions((0..count).map(|id| PowerUpDefinition {
            id: PowerUpId::new(id),
            name: format!("relic {id}"),
            kind: PowerUpKind::DamageBoost,
            duration: Duration::from_secs(10),
            effect_value: 2.0,
            lore_text: None,
            lore_audio_cue: None,
        }))
        .expect("unique ids")
    }

    fn dropper(count: u32, seed: u64) -> PowerUpDropper {
        PowerUpDropper::new(Config::new(&table(count), LootTuning::default(), seed))
    }

    #[test]
    fn certain_drops_float_above_the_corpse() {
        let mut dropper = dropper(3, 1);
        let drop = dropper
            .try_spawn_drop(Vec3::new(4.0, 0.0, -2.0), 1.0)
            .expect("certain drop");
        assert_eq!(drop.position, Vec3::new(4.0, 1.0, -2.0));
        assert!(drop.power_up.get() < 3);
    }

    #[test]
    fn zero_chance_never_drops() {
        let mut dropper = dropper(3, 2);
        for _ in 0..1_000 {
            assert!(dropper.try_spawn_drop(Vec3::ZERO, 0.0).is_none());
        }
    }

    #[test]
    fn empty_table_never_drops() {
        let mut dropper = dropper(0, 3);
        assert!(dropper.try_spawn_drop(Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn drop_rate_tracks_the_chance() {
        let mut dropper = dropper(4, 4);
        let drops = (0..10_000)
            .filter(|_| dropper.try_spawn_drop(Vec3::ZERO, 0.25).is_some())
            .count();
        assert!((2_200..2_800).contains(&drops), "drops: {drops}");
    }

    #[test]
    fn deaths_request_pickups() {
        let mut dropper = dropper(1, 5);
        let mut commands = Vec::new();
        dropper.handle(
            &[Event::EnemyDied {
                enemy: EnemyId::new(0),
                kind: EnemyKind::Thrall,
                position: Vec3::new(1.0, 0.0, 1.0),
                score_value: 100,
                drop_chance: 1.0,
            }],
            &mut commands,
        );
        assert_eq!(
            commands,
            vec![Command::SpawnPickup {
                power_up: PowerUpId::new(0),
                position: Vec3::new(1.0, 1.0, 1.0),
            }]
        );
    }

    #[test]
    fn same_seed_same_drops() {
        let rolls = |seed| {
            let mut dropper = dropper(5, seed);
            (0..50)
                .map(|_| dropper.try_spawn_drop(Vec3::ZERO, 0.5).map(|drop| drop.power_up))
                .collect::<Vec<_>>()
        };
        assert_eq!(rolls(9), rolls(9));
    }
}
