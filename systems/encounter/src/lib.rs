#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Encounter orchestration: wave sequencing, rate-limited spawning, and
//! wave-completion accounting.
//!
//! The orchestrator never touches the world directly. It requests spawns with
//! [`Command::SpawnEnemy`], counts an enemy as alive once the world confirms it
//! with [`Event::EnemySpawned`], and releases it again on [`Event::EnemyDied`].
//! Wave transitions are announced through its own notification events.

use std::{
    collections::{BTreeSet, VecDeque},
    f32::consts::TAU,
    time::Duration,
};

use blood_covenant_core::{
    Command, EncounterTuning, EnemyId, EnemyKind, Event, Timers, WaveDefinition, WaveIndex,
};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the orchestrator.
#[derive(Clone, Debug)]
pub struct Config {
    waves: Vec<WaveDefinition>,
    tuning: EncounterTuning,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration from the wave list, tuning, and seed.
    #[must_use]
    pub fn new(waves: Vec<WaveDefinition>, tuning: EncounterTuning, rng_seed: u64) -> Self {
        Self {
            waves,
            tuning,
            rng_seed,
        }
    }
}

/// Lifecycle phase of the encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncounterPhase {
    /// Waiting for the next wave to start.
    Idle,
    /// Spawns of the current wave are still being released.
    SpawningWave,
    /// Every spawn was released; waiting for the remaining enemies to die.
    WaveInProgress,
    /// No waves remain.
    AllComplete,
}

/// Bookkeeping mutated only by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncounterState {
    /// Wave currently running or next to run.
    pub wave: WaveIndex,
    /// Confirmed enemies of the encounter that have not died yet.
    pub enemies_alive: u32,
    /// Whether a wave started and has not completed yet.
    pub wave_in_progress: bool,
    /// Whether every wave completed.
    pub all_complete: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EncounterTimer {
    StartWave(WaveIndex),
    Spawn,
}

/// Pure system that sequences waves and tracks the live enemy count.
#[derive(Debug)]
pub struct EncounterOrchestrator {
    waves: Vec<WaveDefinition>,
    tuning: EncounterTuning,
    rng: ChaCha8Rng,
    timers: Timers<EncounterTimer>,
    state: EncounterState,
    phase: EncounterPhase,
    pending: VecDeque<EnemyKind>,
    awaiting_confirmation: u32,
    tracked: BTreeSet<EnemyId>,
    started: bool,
}

impl EncounterOrchestrator {
    /// Creates a new orchestrator using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            waves: config.waves,
            tuning: config.tuning,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            timers: Timers::new(),
            state: EncounterState {
                wave: WaveIndex::new(0),
                enemies_alive: 0,
                wave_in_progress: false,
                all_complete: false,
            },
            phase: EncounterPhase::Idle,
            pending: VecDeque::new(),
            awaiting_confirmation: 0,
            tracked: BTreeSet::new(),
            started: false,
        }
    }

    /// Starts the encounter clock; the first wave begins after the initial delay.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let _ = self.timers.schedule(
            self.tuning.initial_delay,
            EncounterTimer::StartWave(WaveIndex::new(0)),
        );
    }

    /// Consumes world events, emitting spawn commands and wave notifications.
    pub fn handle(
        &mut self,
        events: &[Event],
        player_position: Option<Vec3>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.timers.advance(*dt);
                    while let Some(due) = self.timers.pop_due() {
                        match due.payload {
                            EncounterTimer::StartWave(wave) => self.begin_wave(
                                wave,
                                due.deadline,
                                player_position,
                                out_commands,
                                out_events,
                            ),
                            EncounterTimer::Spawn => self.spawn_next(
                                due.deadline,
                                player_position,
                                out_commands,
                                out_events,
                            ),
                        }
                    }
                }
                Event::EnemySpawned { enemy, .. } => {
                    self.awaiting_confirmation = self.awaiting_confirmation.saturating_sub(1);
                    if self.tracked.insert(*enemy) {
                        self.state.enemies_alive = self.state.enemies_alive.saturating_add(1);
                    }
                }
                Event::EnemySpawnRejected { kind, enemy } => {
                    tracing::warn!(?kind, enemy = enemy.get(), "spawn rejected, enemy not counted");
                    self.awaiting_confirmation = self.awaiting_confirmation.saturating_sub(1);
                    self.complete_wave_if_cleared(out_events);
                }
                Event::EnemyDied { enemy, .. } => {
                    if self.tracked.remove(enemy) {
                        self.on_enemy_death(out_events);
                    }
                }
                _ => {}
            }
        }
    }

    /// Starts the wave at `index` immediately.
    ///
    /// An index past the last wave announces that every wave is complete.
    pub fn start_wave(
        &mut self,
        index: WaveIndex,
        player_position: Option<Vec3>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let now = self.timers.now();
        self.begin_wave(index, now, player_position, out_commands, out_events);
    }

    /// Releases one live enemy and completes the wave when none remain.
    pub fn on_enemy_death(&mut self, out_events: &mut Vec<Event>) {
        self.state.enemies_alive = self.state.enemies_alive.saturating_sub(1);
        self.complete_wave_if_cleared(out_events);
    }

    /// One-based number of the wave currently running or next to run.
    #[must_use]
    pub fn current_wave(&self) -> u32 {
        self.state.wave.number()
    }

    /// Number of configured waves.
    #[must_use]
    pub fn total_waves(&self) -> usize {
        self.waves.len()
    }

    /// Confirmed enemies that have not died yet.
    #[must_use]
    pub fn enemies_alive(&self) -> u32 {
        self.state.enemies_alive
    }

    /// Whether a wave started and has not completed yet.
    #[must_use]
    pub fn is_wave_in_progress(&self) -> bool {
        self.state.wave_in_progress
    }

    /// Whether every wave completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.all_complete
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> EncounterPhase {
        self.phase
    }

    /// Snapshot of the orchestrator's bookkeeping.
    #[must_use]
    pub fn state(&self) -> EncounterState {
        self.state
    }

    fn begin_wave(
        &mut self,
        index: WaveIndex,
        base: Duration,
        player_position: Option<Vec3>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        if self.state.all_complete {
            return;
        }
        let Some(wave) = self.waves.get(index.get() as usize) else {
            self.state.wave = index;
            self.finish(out_events);
            return;
        };

        self.pending = wave.spawn_order().collect();
        self.state.wave = index;
        self.state.wave_in_progress = true;
        self.phase = EncounterPhase::SpawningWave;
        tracing::info!(
            wave = index.number(),
            name = %wave.name,
            enemies = wave.total_enemies(),
            "wave started"
        );
        out_events.push(Event::WaveStarted { wave: index });

        self.spawn_next(base, player_position, out_commands, out_events);
    }

    fn spawn_next(
        &mut self,
        base: Duration,
        player_position: Option<Vec3>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(kind) = self.pending.pop_front() else {
            self.phase = EncounterPhase::WaveInProgress;
            self.complete_wave_if_cleared(out_events);
            return;
        };

        let position = self.spawn_position(player_position);
        tracing::debug!(?kind, x = position.x, z = position.z, "spawning enemy");
        out_commands.push(Command::SpawnEnemy { kind, position });
        self.awaiting_confirmation = self.awaiting_confirmation.saturating_add(1);

        if self.pending.is_empty() {
            self.phase = EncounterPhase::WaveInProgress;
        } else {
            let _ = self.timers.schedule_at(
                base.saturating_add(self.tuning.spawn_delay),
                EncounterTimer::Spawn,
            );
        }
    }

    fn spawn_position(&mut self, player_position: Option<Vec3>) -> Vec3 {
        if !self.tuning.spawn_points.is_empty() {
            let index = self.rng.gen_range(0..self.tuning.spawn_points.len());
            return self.tuning.spawn_points[index];
        }
        if let Some(player) = player_position {
            let angle = self.rng.gen_range(0.0..TAU);
            let distance = self.tuning.min_spawn_distance;
            return player + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);
        }
        Vec3::ZERO
    }

    fn complete_wave_if_cleared(&mut self, out_events: &mut Vec<Event>) {
        let cleared = self.state.wave_in_progress
            && self.pending.is_empty()
            && self.awaiting_confirmation == 0
            && self.state.enemies_alive == 0;
        if !cleared {
            return;
        }

        let completed = self.state.wave;
        self.state.wave_in_progress = false;
        tracing::info!(wave = completed.number(), "wave complete");
        out_events.push(Event::WaveCompleted { wave: completed });

        let next = completed.next();
        self.state.wave = next;
        if (next.get() as usize) < self.waves.len() {
            self.phase = EncounterPhase::Idle;
            let _ = self
                .timers
                .schedule(self.tuning.time_between_waves, EncounterTimer::StartWave(next));
        } else {
            self.finish(out_events);
        }
    }

    fn finish(&mut self, out_events: &mut Vec<Event>) {
        if self.state.all_complete {
            return;
        }
        self.state.all_complete = true;
        self.state.wave_in_progress = false;
        self.phase = EncounterPhase::AllComplete;
        tracing::info!(waves = self.waves.len(), "all waves complete");
        out_events.push(Event::AllWavesComplete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blood_covenant_core::SpawnGroup;

    fn tick(dt: Duration) -> [Event; 1] {
        [Event::TimeAdvanced { dt }]
    }

    fn orchestrator(waves: Vec<WaveDefinition>) -> EncounterOrchestrator {
        let mut orchestrator =
            EncounterOrchestrator::new(Config::new(waves, EncounterTuning::default(), 5));
        orchestrator.start();
        orchestrator
    }

    #[test]
    fn first_wave_waits_for_initial_delay() {
        let wave = WaveDefinition::new(
            "one",
            vec![SpawnGroup {
                kind: EnemyKind::Thrall,
                count: 1,
            }],
        );
        let mut orchestrator = orchestrator(vec![wave]);
        let mut commands = Vec::new();
        let mut events = Vec::new();

        orchestrator.handle(
            &tick(Duration::from_millis(1_999)),
            Some(Vec3::ZERO),
            &mut commands,
            &mut events,
        );
        assert!(commands.is_empty());
        assert_eq!(orchestrator.phase(), EncounterPhase::Idle);

        orchestrator.handle(
            &tick(Duration::from_millis(1)),
            Some(Vec3::ZERO),
            &mut commands,
            &mut events,
        );
        assert_eq!(commands.len(), 1);
        assert_eq!(
            events,
            vec![Event::WaveStarted {
                wave: WaveIndex::new(0)
            }]
        );
    }

    #[test]
    fn spawn_falls_back_to_ring_around_player() {
        let mut orchestrator = orchestrator(Vec::new());
        let player = Vec3::new(3.0, 0.0, -4.0);
        for _ in 0..16 {
            let position = orchestrator.spawn_position(Some(player));
            let offset = position - player;
            assert!((offset.length() - 10.0).abs() < 1e-3);
            assert_eq!(offset.y, 0.0);
        }
        assert_eq!(orchestrator.spawn_position(None), Vec3::ZERO);
    }

    #[test]
    fn designated_spawn_points_take_precedence() {
        let points = vec![Vec3::new(1.0, 0.0, 1.0), Vec3::new(-1.0, 0.0, 5.0)];
        let tuning = EncounterTuning {
            spawn_points: points.clone(),
            ..EncounterTuning::default()
        };
        let mut orchestrator = EncounterOrchestrator::new(Config::new(Vec::new(), tuning, 1));
        for _ in 0..16 {
            let position = orchestrator.spawn_position(Some(Vec3::ZERO));
            assert!(points.contains(&position));
        }
    }

    #[test]
    fn empty_wave_list_completes_on_first_start() {
        let mut orchestrator = orchestrator(Vec::new());
        let mut commands = Vec::new();
        let mut events = Vec::new();

        orchestrator.handle(
            &tick(Duration::from_secs(2)),
            Some(Vec3::ZERO),
            &mut commands,
            &mut events,
        );

        assert_eq!(events, vec![Event::AllWavesComplete]);
        assert!(orchestrator.is_complete());
        assert_eq!(orchestrator.phase(), EncounterPhase::AllComplete);
    }

    #[test]
    fn deaths_of_untracked_enemies_are_ignored() {
        let mut orchestrator = orchestrator(Vec::new());
        let mut commands = Vec::new();
        let mut events = Vec::new();

        orchestrator.handle(
            &[Event::EnemyDied {
                enemy: EnemyId::new(9),
                kind: EnemyKind::Thrall,
                position: Vec3::ZERO,
                score_value: 100,
                drop_chance: 0.0,
            }],
            None,
            &mut commands,
            &mut events,
        );

        assert_eq!(orchestrator.enemies_alive(), 0);
        assert!(events.is_empty());
    }
}
