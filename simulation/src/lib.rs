#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-tick driver wiring the world to every system.
//!
//! One [`Simulation::step`] applies a tick to the world, lets the combat
//! resolver turn the frame's player actions into commands, then pumps the
//! resulting events through the orchestrator, score engine, loot dropper, and
//! buff engine until none of them requests further mutations. Systems always
//! run in that order so a replay with the same seed and inputs reproduces the
//! same event stream.

use std::time::Duration;

use blood_covenant_core::{Command, ConfigError, EncounterConfig, Event, PlayerAction};
use blood_covenant_system_buffs::BuffEngine;
use blood_covenant_system_combat::CombatResolver;
use blood_covenant_system_encounter::EncounterOrchestrator;
use blood_covenant_system_loot::PowerUpDropper;
use blood_covenant_system_scoring::ScoreEngine;
use blood_covenant_world::{self as world, query, LocomotionFactory, World, WorldSettings};
use sha2::{Digest, Sha256};

const WORLD_STREAM: &str = "world";
const ENCOUNTER_STREAM: &str = "encounter";
const LOOT_STREAM: &str = "loot";

/// Upper bound on command/event rounds within one step.
const MAX_PUMP_ROUNDS: usize = 64;

/// Complete encounter: the world plus the systems reacting to it.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    tick: Duration,
    orchestrator: EncounterOrchestrator,
    combat: CombatResolver,
    buffs: BuffEngine,
    scoring: ScoreEngine,
    loot: PowerUpDropper,
    round_limit: usize,
}

impl Simulation {
    /// Validates `config` and builds every component from it.
    ///
    /// The orchestrator is started immediately, so the first wave begins once
    /// the configured initial delay has elapsed.
    pub fn new(config: &EncounterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let power_ups = config.power_up_table()?;

        let world = World::new(
            WorldSettings::from_config(config)?,
            derive_stream_seed(config.seed, WORLD_STREAM),
        );
        let mut orchestrator =
            EncounterOrchestrator::new(blood_covenant_system_encounter::Config::new(
                config.waves.clone(),
                config.encounter.clone(),
                derive_stream_seed(config.seed, ENCOUNTER_STREAM),
            ));
        orchestrator.start();
        let combat = CombatResolver::new(blood_covenant_system_combat::Config::new(
            config.combat.clone(),
        ));
        let loot = PowerUpDropper::new(blood_covenant_system_loot::Config::new(
            &power_ups,
            config.loot.clone(),
            derive_stream_seed(config.seed, LOOT_STREAM),
        ));
        let buffs = BuffEngine::new(blood_covenant_system_buffs::Config::new(
            config.buffs.clone(),
            config.player.stats,
            power_ups,
        ));
        let scoring = ScoreEngine::new(blood_covenant_system_scoring::Config::new(
            config.scoring.clone(),
        ));

        tracing::info!(
            waves = config.waves.len(),
            enemies = config.enemies.len(),
            power_ups = config.power_ups.len(),
            seed = config.seed,
            "encounter initialised"
        );

        Ok(Self {
            world,
            tick: config.tick,
            orchestrator,
            combat,
            buffs,
            scoring,
            loot,
            round_limit: MAX_PUMP_ROUNDS,
        })
    }

    /// Replaces the locomotion enemies receive on spawn.
    #[must_use]
    pub fn with_locomotion(mut self, factory: LocomotionFactory) -> Self {
        self.world = self.world.with_locomotion(factory);
        self
    }

    /// Advances the encounter by `dt` and resolves the frame's player actions.
    ///
    /// Every event produced during the step, including the systems' own
    /// notifications, is appended to `out_events` in the order it occurred.
    pub fn step(&mut self, dt: Duration, actions: &[PlayerAction], out_events: &mut Vec<Event>) {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        let mut commands = Vec::new();
        let stats = query::player(&self.world).stats;
        self.combat.handle(
            &events,
            actions,
            stats,
            &query::collision(&self.world),
            &mut commands,
        );

        self.pump(events, commands, out_events);
    }

    /// Advances the encounter by one configured tick.
    pub fn step_tick(&mut self, actions: &[PlayerAction], out_events: &mut Vec<Event>) {
        self.step(self.tick, actions, out_events);
    }

    /// Applies an external command, such as moving the player, and lets the
    /// systems react to it.
    pub fn submit(&mut self, command: Command, out_events: &mut Vec<Event>) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.pump(events, Vec::new(), out_events);
    }

    /// Configured tick length.
    #[must_use]
    pub const fn tick(&self) -> Duration {
        self.tick
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Wave orchestration state.
    #[must_use]
    pub const fn orchestrator(&self) -> &EncounterOrchestrator {
        &self.orchestrator
    }

    /// Melee combo state.
    #[must_use]
    pub const fn combat(&self) -> &CombatResolver {
        &self.combat
    }

    /// Active power-ups.
    #[must_use]
    pub const fn buffs(&self) -> &BuffEngine {
        &self.buffs
    }

    /// Score and multiplier.
    #[must_use]
    pub const fn scoring(&self) -> &ScoreEngine {
        &self.scoring
    }

    fn pump(&mut self, mut events: Vec<Event>, mut commands: Vec<Command>, out: &mut Vec<Event>) {
        for _ in 0..self.round_limit {
            self.dispatch(&mut events, &mut commands, out);
            if commands.is_empty() {
                return;
            }
            for command in commands.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
        }
        self.dispatch(&mut events, &mut commands, out);
        if !commands.is_empty() {
            tracing::warn!(
                dropped = commands.len(),
                "command pump did not settle within the round limit"
            );
        }
    }

    /// Runs every reacting system over one batch of world events and moves
    /// the batch, followed by the systems' own events, into `out`.
    fn dispatch(
        &mut self,
        events: &mut Vec<Event>,
        commands: &mut Vec<Command>,
        out: &mut Vec<Event>,
    ) {
        if events.is_empty() {
            return;
        }
        let mut own_events = Vec::new();
        let player = query::player(&self.world).position;
        self.orchestrator
            .handle(events, Some(player), commands, &mut own_events);
        self.scoring.handle(events, &mut own_events);
        self.loot.handle(events, commands);
        self.buffs.handle(events, commands, &mut own_events);
        out.append(events);
        out.append(&mut own_events);
    }
}

/// Derives an independent random stream seed from the encounter seed.
#[must_use]
pub fn derive_stream_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
