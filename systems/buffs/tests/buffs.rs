use std::time::Duration;

use blood_covenant_core::{
    BuffTuning, Command, DamageSource, Event, PlayerStats, PowerUpDefinition, PowerUpId,
    PowerUpKind, PowerUpTable,
};
use blood_covenant_system_buffs::{BuffEngine, Config};
use blood_covenant_world::{self as world, query, World, WorldSettings};
use glam::Vec3;

struct Harness {
    world: World,
    buffs: BuffEngine,
    log: Vec<Event>,
}

impl Harness {
    fn new(definitions: Vec<PowerUpDefinition>) -> Self {
        let power_ups = PowerUpTable::from_definitions(definitions).expect("unique ids");
        Self {
            world: World::new(WorldSettings::default(), 3),
            buffs: BuffEngine::new(Config::new(
                BuffTuning::default(),
                PlayerStats::default(),
                power_ups,
            )),
            log: Vec::new(),
        }
    }

    fn pump(&mut self, commands: Vec<Command>) {
        let mut queue = commands;
        while !queue.is_empty() {
            let mut events = Vec::new();
            for command in queue.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            let mut own_events = Vec::new();
            self.buffs.handle(&events, &mut queue, &mut own_events);
            self.log.extend(events);
            self.log.extend(own_events);
        }
    }

    fn drop_at_player(&mut self, id: u32) {
        self.pump(vec![
            Command::SpawnPickup {
                power_up: PowerUpId::new(id),
                position: Vec3::ZERO,
            },
            Command::Tick {
                dt: Duration::from_millis(1),
            },
        ]);
    }

    fn advance(&mut self, millis: u64, ticks: usize) {
        for _ in 0..ticks {
            self.pump(vec![Command::Tick {
                dt: Duration::from_millis(millis),
            }]);
        }
    }
}

fn power_up(id: u32, kind: PowerUpKind, seconds: u64, value: f32) -> PowerUpDefinition {
    PowerUpDefinition {
        id: PowerUpId::new(id),
        name: format!("{kind:?}"),
        kind,
        duration: Duration::from_secs(seconds),
        effect_value: value,
        lore_text: None,
        lore_audio_cue: None,
    }
}

#[test]
fn blood_frenzy_drains_the_player_through_the_world() {
    let mut harness = Harness::new(vec![power_up(0, PowerUpKind::BloodFrenzy, 10, 2.0)]);

    harness.drop_at_player(0);
    assert_eq!(query::player(&harness.world).stats.melee_damage, 50.0);

    harness.advance(100, 110);

    let pulses = harness
        .log
        .iter()
        .filter(|event| {
            matches!(
                event,
                Event::PlayerDamaged {
                    source: DamageSource::Drain,
                    ..
                }
            )
        })
        .count();
    assert_eq!(pulses, 20);
    let player = query::player(&harness.world);
    assert_eq!(player.health, 80.0);
    assert_eq!(player.stats, PlayerStats::default());
    assert!(harness.log.contains(&Event::BuffExpired {
        kind: PowerUpKind::BloodFrenzy
    }));
}

#[test]
fn holy_water_shields_the_player_from_the_drain() {
    let mut harness = Harness::new(vec![
        power_up(0, PowerUpKind::HolyWater, 20, 1.0),
        power_up(1, PowerUpKind::BloodFrenzy, 10, 2.0),
    ]);

    harness.drop_at_player(0);
    assert!(query::player(&harness.world).invincible);
    harness.drop_at_player(1);
    harness.advance(100, 110);

    let player = query::player(&harness.world);
    assert_eq!(player.health, 100.0);
    assert!(player.invincible);

    harness.advance(100, 100);
    assert!(!query::player(&harness.world).invincible);
}

#[test]
fn health_pack_heals_immediately() {
    let mut harness = Harness::new(vec![power_up(0, PowerUpKind::HealthPack, 0, 30.0)]);
    harness.pump(vec![Command::DamagePlayer {
        amount: 50.0,
        source: DamageSource::Melee,
    }]);

    harness.drop_at_player(0);

    assert_eq!(query::player(&harness.world).health, 80.0);
    assert!(harness.buffs.active().next().is_none());
}
