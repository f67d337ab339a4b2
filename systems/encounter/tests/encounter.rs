use std::time::Duration;

use blood_covenant_core::{
    Command, DamageSource, EncounterTuning, EnemyDefinition, EnemyId, EnemyKind, EnemyTable, Event,
    SpawnGroup, WaveDefinition, WaveIndex,
};
use blood_covenant_system_encounter::{Config, EncounterOrchestrator, EncounterPhase};
use blood_covenant_world::{self as world, query, World, WorldSettings};
use glam::Vec3;

struct Harness {
    world: World,
    orchestrator: EncounterOrchestrator,
    log: Vec<Event>,
}

impl Harness {
    fn new(waves: Vec<WaveDefinition>) -> Self {
        let enemies = EnemyTable::from_definitions([
            EnemyDefinition {
                kind: EnemyKind::Thrall,
                move_speed: 0.0,
                ..EnemyDefinition::default()
            },
            EnemyDefinition {
                kind: EnemyKind::Hellhound,
                move_speed: 0.0,
                ..EnemyDefinition::default()
            },
        ])
        .expect("unique kinds");
        let world = World::new(
            WorldSettings {
                enemies,
                ..WorldSettings::default()
            },
            11,
        );
        let mut orchestrator =
            EncounterOrchestrator::new(Config::new(waves, EncounterTuning::default(), 42));
        orchestrator.start();
        Self {
            world,
            orchestrator,
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
            let player = query::player(&self.world).position;
            let mut own_events = Vec::new();
            self.orchestrator
                .handle(&events, Some(player), &mut queue, &mut own_events);
            self.log.extend(events);
            self.log.extend(own_events);
        }
    }

    fn advance(&mut self, seconds: f32, step: Duration) {
        let ticks = (seconds / step.as_secs_f32()).round() as usize;
        for _ in 0..ticks {
            self.pump(vec![Command::Tick { dt: step }]);
        }
    }

    fn kill(&mut self, enemy: EnemyId) {
        self.pump(vec![Command::DamageEnemy {
            enemy,
            amount: 1_000.0,
            source: DamageSource::Ranged,
        }]);
    }

    fn spawned(&self) -> Vec<(EnemyId, EnemyKind)> {
        self.log
            .iter()
            .filter_map(|event| match event {
                Event::EnemySpawned { enemy, kind, .. } => Some((*enemy, *kind)),
                _ => None,
            })
            .collect()
    }
}

fn group(kind: EnemyKind, count: u32) -> SpawnGroup {
    SpawnGroup { kind, count }
}

#[test]
fn groups_spawn_in_order_with_fixed_delay() {
    let wave = WaveDefinition::new(
        "mixed",
        vec![group(EnemyKind::Thrall, 3), group(EnemyKind::Hellhound, 2)],
    );
    let mut harness = Harness::new(vec![wave]);

    harness.advance(2.0, Duration::from_millis(100));
    assert_eq!(harness.spawned().len(), 1);

    harness.advance(1.0, Duration::from_millis(100));
    assert_eq!(harness.spawned().len(), 3);

    harness.advance(1.0, Duration::from_millis(100));
    let kinds: Vec<EnemyKind> = harness.spawned().into_iter().map(|(_, kind)| kind).collect();
    assert_eq!(
        kinds,
        vec![
            EnemyKind::Thrall,
            EnemyKind::Thrall,
            EnemyKind::Thrall,
            EnemyKind::Hellhound,
            EnemyKind::Hellhound,
        ]
    );

    let started: Vec<u32> = harness
        .log
        .iter()
        .filter_map(|event| match event {
            Event::WaveStarted { wave } => Some(wave.number()),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![1]);
    assert_eq!(harness.orchestrator.enemies_alive(), 5);
    assert_eq!(harness.orchestrator.phase(), EncounterPhase::WaveInProgress);
}

#[test]
fn clearing_a_wave_schedules_the_next_one() {
    let waves = vec![
        WaveDefinition::new("first", vec![group(EnemyKind::Thrall, 2)]),
        WaveDefinition::new("second", vec![group(EnemyKind::Hellhound, 1)]),
    ];
    let mut harness = Harness::new(waves);
    harness.advance(3.0, Duration::from_millis(100));

    for (enemy, _) in harness.spawned() {
        harness.kill(enemy);
    }
    assert!(harness.log.contains(&Event::WaveCompleted {
        wave: WaveIndex::new(0)
    }));
    assert_eq!(harness.orchestrator.current_wave(), 2);
    assert!(!harness.orchestrator.is_wave_in_progress());

    harness.advance(4.9, Duration::from_millis(100));
    assert_eq!(harness.spawned().len(), 2);

    harness.advance(0.2, Duration::from_millis(100));
    assert_eq!(harness.spawned().len(), 3);
    assert!(harness.log.contains(&Event::WaveStarted {
        wave: WaveIndex::new(1)
    }));

    let (last, _) = harness.spawned()[2];
    harness.kill(last);
    assert!(harness.log.contains(&Event::AllWavesComplete));
    assert!(harness.orchestrator.is_complete());
    let completions = harness
        .log
        .iter()
        .filter(|event| matches!(event, Event::AllWavesComplete))
        .count();
    assert_eq!(completions, 1);
}

#[test]
fn wave_stays_open_while_spawns_remain() {
    let wave = WaveDefinition::new("trickle", vec![group(EnemyKind::Thrall, 3)]);
    let mut harness = Harness::new(vec![wave]);
    harness.advance(2.0, Duration::from_millis(100));

    let (first, _) = harness.spawned()[0];
    harness.kill(first);

    assert_eq!(harness.orchestrator.enemies_alive(), 0);
    assert!(harness.orchestrator.is_wave_in_progress());
    assert!(!harness
        .log
        .iter()
        .any(|event| matches!(event, Event::WaveCompleted { .. })));
}

#[test]
fn rejected_spawns_do_not_block_completion() {
    let wave = WaveDefinition::new(
        "misconfigured",
        vec![group(EnemyKind::Boss, 1), group(EnemyKind::Thrall, 1)],
    );
    let mut harness = Harness::new(vec![wave]);
    harness.advance(3.0, Duration::from_millis(100));

    assert_eq!(harness.orchestrator.enemies_alive(), 1);
    assert!(harness
        .log
        .iter()
        .any(|event| matches!(event, Event::EnemySpawnRejected { kind: EnemyKind::Boss, .. })));

    let (thrall, _) = harness.spawned()[0];
    harness.kill(thrall);
    assert!(harness.orchestrator.is_complete());
}

#[test]
fn large_ticks_release_every_due_spawn() {
    let wave = WaveDefinition::new("burst", vec![group(EnemyKind::Thrall, 4)]);
    let mut harness = Harness::new(vec![wave]);

    harness.pump(vec![Command::Tick {
        dt: Duration::from_secs(4),
    }]);

    assert_eq!(harness.spawned().len(), 4);
    let positions: Vec<Vec3> = query::enemy_view(&harness.world)
        .iter()
        .map(|enemy| enemy.position)
        .collect();
    for position in positions {
        assert!((position.length() - 10.0).abs() < 1e-3);
    }
}
